//! Timed multi-shot capture.
//!
//! `Idle → Countdown → Flash → Saving → (Countdown | Complete) → Idle`.
//! The session owns no timers: the booth loop feeds it the current instant on
//! every tick and hands it the painted frame when a snapshot is due.

use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::{debug, info};

const SECOND: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub shots: u32,
    pub countdown_seconds: u32,
    pub flash: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            shots: 4,
            countdown_seconds: 10,
            flash: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Countdown,
    Flash,
    Saving,
    Complete,
}

/// Observable progress of a session. `shot` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Started { shots: u32 },
    CountdownTick { shot: u32, remaining: u32 },
    FlashStarted { shot: u32 },
    SnapshotDue { shot: u32 },
    ShotSaved { shot: u32, taken: u32 },
    Completed { shots: u32 },
    Cancelled,
    Reset,
}

#[derive(Debug)]
pub enum SnapshotOutcome {
    /// No snapshot was expected; the image was dropped.
    Rejected,
    Saved { taken: u32 },
    /// Last shot taken; all snapshots in capture order.
    Completed(Vec<RgbaImage>),
}

pub struct CaptureSession {
    settings: CaptureSettings,
    phase: CapturePhase,
    shots_taken: u32,
    countdown_remaining: u32,
    /// Start of the current countdown second or of the flash.
    mark: Instant,
    snapshots: Vec<RgbaImage>,
}

impl CaptureSession {
    #[must_use]
    pub fn new(settings: CaptureSettings, now: Instant) -> Self {
        Self {
            settings,
            phase: CapturePhase::Idle,
            shots_taken: 0,
            countdown_remaining: 0,
            mark: now,
            snapshots: Vec::new(),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> CapturePhase {
        self.phase
    }

    #[must_use]
    pub const fn shots_taken(&self) -> u32 {
        self.shots_taken
    }

    #[must_use]
    pub const fn shots_requested(&self) -> u32 {
        self.settings.shots
    }

    #[must_use]
    pub const fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != CapturePhase::Idle
    }

    const fn current_shot(&self) -> u32 {
        self.shots_taken + 1
    }

    fn begin_countdown(&mut self, now: Instant) {
        self.phase = CapturePhase::Countdown;
        self.countdown_remaining = self.settings.countdown_seconds;
        self.mark = now;
    }

    /// Begin a session. A no-op unless idle.
    pub fn start(&mut self, now: Instant) -> Option<SessionEvent> {
        if self.phase != CapturePhase::Idle {
            debug!(phase = ?self.phase, "start ignored; session already active");
            return None;
        }
        self.shots_taken = 0;
        self.snapshots.clear();
        self.begin_countdown(now);
        info!(shots = self.settings.shots, countdown = self.settings.countdown_seconds, "capture session started");
        Some(SessionEvent::Started {
            shots: self.settings.shots,
        })
    }

    pub fn on_tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match self.phase {
            CapturePhase::Idle | CapturePhase::Saving => {}
            CapturePhase::Countdown => {
                while self.countdown_remaining > 0 && now.saturating_duration_since(self.mark) >= SECOND {
                    self.mark += SECOND;
                    self.countdown_remaining -= 1;
                    events.push(SessionEvent::CountdownTick {
                        shot: self.current_shot(),
                        remaining: self.countdown_remaining,
                    });
                }
                if self.countdown_remaining == 0 {
                    self.phase = CapturePhase::Flash;
                    events.push(SessionEvent::FlashStarted {
                        shot: self.current_shot(),
                    });
                    if self.settings.flash.is_zero() {
                        self.phase = CapturePhase::Saving;
                        events.push(SessionEvent::SnapshotDue {
                            shot: self.current_shot(),
                        });
                    }
                }
            }
            CapturePhase::Flash => {
                if now.saturating_duration_since(self.mark) >= self.settings.flash {
                    self.phase = CapturePhase::Saving;
                    events.push(SessionEvent::SnapshotDue {
                        shot: self.current_shot(),
                    });
                }
            }
            CapturePhase::Complete => {
                self.phase = CapturePhase::Idle;
                self.shots_taken = 0;
                events.push(SessionEvent::Reset);
            }
        }
        events
    }

    /// Hand over the painted frame for the shot that is due.
    pub fn submit_snapshot(&mut self, image: RgbaImage, now: Instant) -> SnapshotOutcome {
        if self.phase != CapturePhase::Saving {
            return SnapshotOutcome::Rejected;
        }
        self.snapshots.push(image);
        self.shots_taken += 1;
        debug!(taken = self.shots_taken, requested = self.settings.shots, "shot saved");
        if self.shots_taken >= self.settings.shots {
            self.phase = CapturePhase::Complete;
            info!(shots = self.shots_taken, "capture session complete");
            return SnapshotOutcome::Completed(std::mem::take(&mut self.snapshots));
        }
        self.begin_countdown(now);
        SnapshotOutcome::Saved {
            taken: self.shots_taken,
        }
    }

    /// Abort without emitting snapshots. Returns false when there was nothing
    /// left to abort (idle, or complete and only waiting for its reset).
    pub fn cancel(&mut self) -> bool {
        match self.phase {
            CapturePhase::Idle => return false,
            CapturePhase::Complete => {
                self.phase = CapturePhase::Idle;
                self.shots_taken = 0;
                return false;
            }
            _ => {}
        }
        info!(phase = ?self.phase, taken = self.shots_taken, "capture session cancelled");
        self.phase = CapturePhase::Idle;
        self.shots_taken = 0;
        self.countdown_remaining = 0;
        self.snapshots.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CaptureSettings {
        CaptureSettings {
            shots: 2,
            countdown_seconds: 3,
            flash: Duration::from_millis(200),
        }
    }

    #[test]
    fn countdown_ticks_once_per_second() {
        let t0 = Instant::now();
        let mut s = CaptureSession::new(settings(), t0);
        s.start(t0).unwrap();
        assert!(s.on_tick(t0 + Duration::from_millis(900)).is_empty());
        assert_eq!(
            s.on_tick(t0 + Duration::from_millis(1000)),
            vec![SessionEvent::CountdownTick { shot: 1, remaining: 2 }]
        );
        let late = s.on_tick(t0 + Duration::from_millis(3050));
        assert_eq!(
            late,
            vec![
                SessionEvent::CountdownTick { shot: 1, remaining: 1 },
                SessionEvent::CountdownTick { shot: 1, remaining: 0 },
                SessionEvent::FlashStarted { shot: 1 },
            ]
        );
        assert_eq!(s.phase(), CapturePhase::Flash);
    }

    #[test]
    fn flash_blocks_until_its_duration_passes() {
        let t0 = Instant::now();
        let mut s = CaptureSession::new(settings(), t0);
        s.start(t0);
        s.on_tick(t0 + Duration::from_secs(3));
        assert!(s.on_tick(t0 + Duration::from_millis(3100)).is_empty());
        assert_eq!(s.phase(), CapturePhase::Flash);
        assert!(matches!(s.submit_snapshot(RgbaImage::new(1, 1), t0), SnapshotOutcome::Rejected));
        assert_eq!(
            s.on_tick(t0 + Duration::from_millis(3200)),
            vec![SessionEvent::SnapshotDue { shot: 1 }]
        );
        assert_eq!(s.shots_taken(), 0);
    }

    #[test]
    fn cancel_resets_without_snapshots() {
        let t0 = Instant::now();
        let mut s = CaptureSession::new(settings(), t0);
        assert!(!s.cancel());
        s.start(t0);
        s.on_tick(t0 + Duration::from_secs(1));
        assert!(s.cancel());
        assert_eq!(s.phase(), CapturePhase::Idle);
        assert_eq!(s.shots_taken(), 0);
        assert!(s.on_tick(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn complete_returns_to_idle_on_next_tick() {
        let t0 = Instant::now();
        let mut s = CaptureSession::new(
            CaptureSettings {
                shots: 1,
                countdown_seconds: 1,
                flash: Duration::ZERO,
            },
            t0,
        );
        s.start(t0);
        let events = s.on_tick(t0 + Duration::from_secs(1));
        assert_eq!(events.last(), Some(&SessionEvent::SnapshotDue { shot: 1 }));
        let SnapshotOutcome::Completed(shots) = s.submit_snapshot(RgbaImage::new(2, 2), t0) else {
            panic!("expected completion");
        };
        assert_eq!(shots.len(), 1);
        assert_eq!(s.phase(), CapturePhase::Complete);
        assert!(s.start(t0).is_none());
        assert_eq!(s.on_tick(t0 + Duration::from_secs(2)), vec![SessionEvent::Reset]);
        assert!(s.start(t0 + Duration::from_secs(2)).is_some());
    }
}
