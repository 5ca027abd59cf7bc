//! The booth loop: one cooperative task that renders, counts down, captures,
//! and reacts to commands.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::camera_cache::CapabilityCache;
use crate::capture::{CapturePhase, CaptureSession, SessionEvent, SnapshotOutcome};
use crate::config::Configuration;
use crate::error::BoothError;
use crate::events::{BoothCommand, BoothEvent, CompletedSession, DeviceFaultKind};
use crate::filters::FilterKind;
use crate::pipeline::Pipeline;
use crate::render::debounce::ContainerSize;
use crate::render::overlay::{self, OverlayState};
use crate::render::presenter::Presenter;
use crate::render::surface::RenderSurface;
use crate::video::{SourceSpec, SourceSwitcher};

fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Whether the loop keeps running after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Booth<'p, P: Presenter> {
    cfg: Configuration,
    presenter: &'p mut P,
    pipeline: Pipeline,
    session: CaptureSession,
    switcher: SourceSwitcher,
    events: Sender<BoothEvent>,
    saver: Sender<CompletedSession>,
    /// Events raised during the current step, sent by `flush`.
    outbox: Vec<BoothEvent>,
    /// Finished sessions waiting for the saver.
    finished: Vec<CompletedSession>,
    fault: Option<DeviceFaultKind>,
    ready: bool,
    session_started: Option<DateTime<Local>>,
    session_filter: FilterKind,
    ticks: u64,
}

impl<'p, P: Presenter> Booth<'p, P> {
    fn new(
        cfg: Configuration,
        presenter: &'p mut P,
        events: Sender<BoothEvent>,
        saver: Sender<CompletedSession>,
        unmounted: CancellationToken,
        now: Instant,
    ) -> Result<Self> {
        let surface = RenderSurface::with_cancellation(
            cfg.target_aspect_ratio,
            cfg.resize_debounce,
            cfg.resize_tolerance_px,
            unmounted,
        );
        let pipeline = Pipeline::new(&cfg, surface, now).context("failed to build render pipeline")?;
        let session = CaptureSession::new(cfg.capture_settings(), now);
        let switcher = SourceSwitcher::new(CapabilityCache::new(), cfg.camera.clone());
        let session_filter = pipeline.active_filter();
        Ok(Self {
            cfg,
            presenter,
            pipeline,
            session,
            switcher,
            events,
            saver,
            outbox: Vec::new(),
            finished: Vec::new(),
            fault: None,
            ready: false,
            session_started: None,
            session_filter,
            ticks: 0,
        })
    }

    fn emit(&mut self, event: BoothEvent) {
        self.outbox.push(event);
    }

    /// Deliver queued events, then queued sessions. Waits on full channels.
    async fn flush(&mut self) {
        for event in std::mem::take(&mut self.outbox) {
            if self.events.send(event).await.is_err() {
                trace!("booth event receiver gone");
            }
        }
        for session in std::mem::take(&mut self.finished) {
            if let Err(err) = self.saver.send(session).await {
                warn!(shots = err.0.shots.len(), "saver gone; session not saved");
            }
        }
    }

    fn handle(&mut self, command: BoothCommand, now: Instant) -> Flow {
        debug!(?command, "booth command");
        match command {
            BoothCommand::StartCapture => {
                if self.fault.is_some() {
                    info!("capture blocked while a device fault is shown");
                } else if !self.ready {
                    info!("capture blocked until the preview is ready");
                } else if let Some(event) = self.session.start(now) {
                    self.session_started = Some(Local::now());
                    self.session_filter = self.pipeline.active_filter();
                    self.emit(BoothEvent::Session(event));
                }
            }
            BoothCommand::CancelCapture => self.cancel_session(),
            BoothCommand::SelectFilter(index) => {
                let selected = self.pipeline.select_filter(index, now);
                self.filter_selected(selected);
            }
            BoothCommand::SelectFilterNamed(name) => {
                let selected = self.pipeline.select_filter_named(&name, now);
                self.filter_selected(selected);
            }
            BoothCommand::NextFilter => {
                let kind = self.pipeline.next_filter(now);
                self.filter_selected(Ok(kind));
            }
            BoothCommand::PreviousFilter => {
                let kind = self.pipeline.previous_filter(now);
                self.filter_selected(Ok(kind));
            }
            BoothCommand::ContainerResized(width, height) => {
                self.pipeline.observe_container(ContainerSize::new(width, height), now);
            }
            BoothCommand::OpenSource(spec) => self.switcher.request(spec),
            BoothCommand::DismissError => {
                if self.fault.take().is_some() {
                    info!("device fault dismissed");
                }
            }
            BoothCommand::Shutdown => return Flow::Stop,
        }
        Flow::Continue
    }

    fn filter_selected(&mut self, selected: Result<FilterKind, BoothError>) {
        match selected {
            Ok(kind) => self.emit(BoothEvent::FilterSelected {
                index: self.pipeline.registry().active_index(),
                kind,
            }),
            Err(err) => warn!("filter selection rejected: {err}"),
        }
    }

    fn cancel_session(&mut self) {
        if self.session.cancel() {
            self.session_started = None;
            self.emit(BoothEvent::Session(SessionEvent::Cancelled));
        }
    }

    fn report_fault(&mut self, err: &BoothError) {
        let Some(kind) = err.fault_kind() else {
            warn!("video source error: {err}");
            return;
        };
        error!(?kind, "{err}");
        self.pipeline.clear_source();
        self.fault = Some(kind);
        self.emit(BoothEvent::DeviceFault {
            kind,
            message: err.to_string(),
        });
        self.cancel_session();
    }

    fn step(&mut self, now: Instant) -> Flow {
        self.ticks += 1;
        for command in self.presenter.poll_input() {
            if self.handle(command, now) == Flow::Stop {
                return Flow::Stop;
            }
        }
        if let Some(size) = self.presenter.container_size() {
            self.pipeline.observe_container(size, now);
        }

        if let Some(opened) = self.switcher.try_take() {
            match opened.result {
                Ok(source) => {
                    let label = source.label().to_owned();
                    self.pipeline.set_source(source);
                    self.fault = None;
                    self.emit(BoothEvent::SourceOpened { label });
                }
                Err(err) => self.report_fault(&err),
            }
        }

        match self.pipeline.tick(now) {
            Ok(outcome) => trace!(?outcome, "tick"),
            Err(err) => self.report_fault(&err),
        }
        let ready = self.pipeline.surface().is_ready();
        if ready != self.ready {
            self.ready = ready;
            self.emit(BoothEvent::Ready(ready));
        }

        for event in self.session.on_tick(now) {
            self.emit(BoothEvent::Session(event));
        }
        if self.session.phase() == CapturePhase::Saving {
            self.take_snapshot(now);
        }

        self.present();
        if self.presenter.is_open() {
            Flow::Continue
        } else {
            info!("presenter closed");
            Flow::Stop
        }
    }

    fn take_snapshot(&mut self, now: Instant) {
        // a rebuilding surface is not ready; the shot waits for the next paint
        let Some(image) = self.pipeline.snapshot() else {
            return;
        };
        let shot = self.session.shots_taken() + 1;
        match self.session.submit_snapshot(image, now) {
            SnapshotOutcome::Rejected => {}
            SnapshotOutcome::Saved { taken } => {
                self.emit(BoothEvent::Session(SessionEvent::ShotSaved { shot, taken }));
            }
            SnapshotOutcome::Completed(shots) => {
                let taken = shots.len() as u32;
                self.emit(BoothEvent::Session(SessionEvent::ShotSaved { shot, taken }));
                self.emit(BoothEvent::Session(SessionEvent::Completed { shots: taken }));
                let finished = CompletedSession {
                    started_at: self.session_started.take().unwrap_or_else(Local::now),
                    filter: self.session_filter,
                    shots,
                };
                self.finished.push(finished);
            }
        }
    }

    fn overlay_state(&self) -> OverlayState {
        let phase = self.session.phase();
        OverlayState {
            loading: !self.ready,
            countdown: (phase == CapturePhase::Countdown).then(|| self.session.countdown_remaining()),
            progress: self
                .session
                .is_active()
                .then(|| (self.session.shots_taken(), self.session.shots_requested())),
            flash: phase == CapturePhase::Flash,
            error: self.fault,
        }
    }

    fn present(&mut self) {
        let fallback = self
            .pipeline
            .surface()
            .container()
            .map_or((self.cfg.window.width, self.cfg.window.height), |c| {
                (c.width.max(1.0) as u32, c.height.max(1.0) as u32)
            });
        let frame = overlay::compose(
            self.pipeline.surface().image().filter(|_| self.ready),
            fallback,
            &self.overlay_state(),
            self.ticks,
        );
        if let Err(err) = self.presenter.present(&frame) {
            warn!("present failed: {err}");
        }
    }
}

/// Drive the booth until shutdown. The presenter stays on the calling task.
pub async fn run<P: Presenter>(
    cfg: Configuration,
    presenter: &mut P,
    source: SourceSpec,
    mut commands: Receiver<BoothCommand>,
    events: Sender<BoothEvent>,
    saver: Sender<CompletedSession>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut interval = tokio::time::interval(cfg.frame_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut booth = Booth::new(cfg, presenter, events, saver, cancel.child_token(), clock())?;
    booth.switcher.request(source);
    let filter = booth.pipeline.active_filter();
    booth.emit(BoothEvent::FilterSelected {
        index: booth.pipeline.registry().active_index(),
        kind: filter,
    });
    info!(%filter, "booth running");

    let mut commands_open = true;
    loop {
        let flow = select! {
            _ = cancel.cancelled() => Flow::Stop,
            _ = interval.tick() => booth.step(clock()),
            maybe = commands.recv(), if commands_open => match maybe {
                Some(command) => booth.handle(command, clock()),
                None => {
                    debug!("command channel closed");
                    commands_open = false;
                    Flow::Continue
                }
            },
        };
        booth.flush().await;
        if flow == Flow::Stop {
            break;
        }
    }

    booth.cancel_session();
    booth.pipeline.shutdown();
    booth.flush().await;
    info!("booth stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::render::presenter::HeadlessPresenter;
    use crate::video::{VideoFrame, VideoSource};

    const FRAME: Duration = Duration::from_millis(33);

    /// Serves `frames` frames, then reports the device as unplugged.
    struct Unplugged {
        frame: VideoFrame,
        frames: u32,
    }

    impl VideoSource for Unplugged {
        fn label(&self) -> &str {
            "unplugged"
        }

        fn frame(&mut self) -> Result<Option<&VideoFrame>, BoothError> {
            if self.frames == 0 {
                return Err(BoothError::DeviceLost("usb disconnect".into()));
            }
            self.frames -= 1;
            Ok(Some(&self.frame))
        }
    }

    fn config() -> Configuration {
        Configuration {
            shots_per_session: 2,
            countdown_seconds: 3,
            filters: vec![FilterKind::CameraView],
            ..Configuration::default()
        }
    }

    fn count(events: &[BoothEvent], pred: impl Fn(&BoothEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn device_lost_mid_session_reports_once_and_cancels() {
        let t0 = Instant::now();
        let (events, _event_rx) = mpsc::channel(64);
        let (saver, _save_rx) = mpsc::channel(4);
        let mut presenter = HeadlessPresenter::new(300.0, 200.0);
        let mut booth = Booth::new(config(), &mut presenter, events, saver, CancellationToken::new(), t0).unwrap();
        booth.pipeline.set_source(Box::new(Unplugged {
            frame: VideoFrame::solid(64, 48, [90, 90, 90, 255]),
            frames: 5,
        }));

        assert_eq!(booth.step(t0), Flow::Continue);
        assert!(booth.ready);
        booth.handle(BoothCommand::StartCapture, t0);
        assert_eq!(booth.session.phase(), CapturePhase::Countdown);

        for n in 1..12 {
            booth.step(t0 + FRAME * n);
        }

        let seen = &booth.outbox;
        let lost = count(seen, |e| {
            matches!(e, BoothEvent::DeviceFault { kind: DeviceFaultKind::Lost, .. })
        });
        assert_eq!(lost, 1);
        assert_eq!(count(seen, |e| *e == BoothEvent::Session(SessionEvent::Cancelled)), 1);
        let readiness: Vec<_> = seen
            .iter()
            .filter_map(|e| match e {
                BoothEvent::Ready(r) => Some(*r),
                _ => None,
            })
            .collect();
        assert_eq!(readiness, vec![true, false]);
        assert_eq!(booth.session.phase(), CapturePhase::Idle);
        assert!(booth.finished.is_empty());
    }

    #[test]
    fn dismissed_fault_does_not_capture_the_frozen_frame() {
        let t0 = Instant::now();
        let (events, _event_rx) = mpsc::channel(64);
        let (saver, _save_rx) = mpsc::channel(4);
        let mut presenter = HeadlessPresenter::new(300.0, 200.0);
        let mut booth = Booth::new(config(), &mut presenter, events, saver, CancellationToken::new(), t0).unwrap();
        booth.pipeline.set_source(Box::new(Unplugged {
            frame: VideoFrame::solid(64, 48, [200, 10, 10, 255]),
            frames: 1,
        }));
        booth.step(t0);
        booth.step(t0 + FRAME);
        assert_eq!(booth.fault, Some(DeviceFaultKind::Lost));

        booth.handle(BoothCommand::DismissError, t0 + FRAME);
        booth.handle(BoothCommand::StartCapture, t0 + FRAME);
        assert!(!booth.session.is_active());
        for n in 2..200 {
            booth.step(t0 + FRAME * n);
        }
        assert!(booth.pipeline.snapshot().is_none());
        assert!(booth.finished.is_empty());
        assert!(booth.overlay_state().loading);
    }
}
