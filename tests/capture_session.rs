use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use rust_photobooth::capture::{CapturePhase, CaptureSession, CaptureSettings, SessionEvent, SnapshotOutcome};

fn settings() -> CaptureSettings {
    CaptureSettings {
        shots: 4,
        countdown_seconds: 2,
        flash: Duration::from_millis(200),
    }
}

/// Tick every 50ms, handing over a snapshot whenever one is due, until the
/// session completes or `limit` passes.
fn run_to_completion(session: &mut CaptureSession, t0: Instant, limit: Duration) -> (Vec<SessionEvent>, Option<Vec<RgbaImage>>) {
    let mut events = Vec::new();
    let mut at = Duration::ZERO;
    while at <= limit {
        let now = t0 + at;
        events.extend(session.on_tick(now));
        if session.phase() == CapturePhase::Saving {
            let shade = session.shots_taken() as u8;
            let image = RgbaImage::from_pixel(3, 2, Rgba([shade, shade, shade, 255]));
            if let SnapshotOutcome::Completed(shots) = session.submit_snapshot(image, now) {
                return (events, Some(shots));
            }
        }
        at += Duration::from_millis(50);
    }
    (events, None)
}

#[test]
fn session_takes_exactly_the_requested_shots_in_order() {
    let t0 = Instant::now();
    let mut session = CaptureSession::new(settings(), t0);
    assert_eq!(session.start(t0), Some(SessionEvent::Started { shots: 4 }));

    let (events, shots) = run_to_completion(&mut session, t0, Duration::from_secs(30));
    let shots = shots.expect("session should complete");
    assert_eq!(shots.len(), 4);
    for (i, shot) in shots.iter().enumerate() {
        assert_eq!(shot.get_pixel(0, 0).0[0], i as u8);
    }

    let flashes = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::FlashStarted { .. }))
        .count();
    assert_eq!(flashes, 4);
    let ticks: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::CountdownTick { shot: 1, remaining } => Some(*remaining),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![1, 0]);
    assert_eq!(session.phase(), CapturePhase::Complete);
}

#[test]
fn each_shot_waits_for_its_own_countdown_and_flash() {
    let t0 = Instant::now();
    let mut session = CaptureSession::new(settings(), t0);
    session.start(t0);
    let (_, shots) = run_to_completion(&mut session, t0, Duration::from_millis(8_000));
    // 4 × (2s countdown + 200ms flash) = 8.8s
    assert!(shots.is_none());
    assert!(session.is_active());
}

#[test]
fn start_is_ignored_while_a_session_runs() {
    let t0 = Instant::now();
    let mut session = CaptureSession::new(settings(), t0);
    assert!(session.start(t0).is_some());
    session.on_tick(t0 + Duration::from_millis(1500));
    assert!(session.start(t0 + Duration::from_millis(1600)).is_none());
    assert_eq!(session.countdown_remaining(), 1);
    assert_eq!(session.shots_taken(), 0);

    let (_, shots) = run_to_completion(&mut session, t0 + Duration::from_millis(1600), Duration::from_secs(30));
    assert_eq!(shots.map(|s| s.len()), Some(4));
}

#[test]
fn cancel_midway_emits_nothing_and_allows_restart() {
    let t0 = Instant::now();
    let mut session = CaptureSession::new(settings(), t0);
    session.start(t0);
    let (_, shots) = run_to_completion(&mut session, t0, Duration::from_millis(3_000));
    assert!(shots.is_none());
    assert_eq!(session.shots_taken(), 1);
    assert!(session.cancel());
    assert_eq!(session.phase(), CapturePhase::Idle);
    assert!(matches!(
        session.submit_snapshot(RgbaImage::new(1, 1), t0),
        SnapshotOutcome::Rejected
    ));
    assert!(session.start(t0 + Duration::from_secs(4)).is_some());
    assert_eq!(session.shots_taken(), 0);
}
