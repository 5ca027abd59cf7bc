use std::time::{Duration, Instant};

use rust_photobooth::geometry::DisplayGeometry;
use rust_photobooth::render::debounce::ContainerSize;
use rust_photobooth::render::surface::{RebuildReason, RenderSurface, SurfaceState, SurfaceTransition};

const DEBOUNCE: Duration = Duration::from_millis(150);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Poll every 10ms over `[from, to]`, collecting creations and checking that
/// at most one canvas is ever attached.
fn drive(surface: &mut RenderSurface, t0: Instant, from: u64, to: u64) -> Vec<(u64, DisplayGeometry, RebuildReason)> {
    let mut created = Vec::new();
    let mut at = from;
    while at <= to {
        for transition in surface.poll(t0 + ms(at)) {
            if let SurfaceTransition::Created {
                generation,
                geometry,
                reason,
            } = transition
            {
                created.push((generation, geometry, reason));
            }
            assert!(surface.attached() <= 1);
        }
        if surface.attached() == 1 {
            surface.mark_painted();
        }
        at += 10;
    }
    created
}

#[test]
fn rapid_resizes_collapse_into_one_rebuild() {
    let t0 = Instant::now();
    let mut surface = RenderSurface::new(1.5, DEBOUNCE, 2.0);
    surface.observe_container(ContainerSize::new(900.0, 600.0), t0);
    let first = drive(&mut surface, t0, 0, 0);
    assert_eq!(first, vec![(1, DisplayGeometry::new(900, 600), RebuildReason::FirstSize)]);

    surface.observe_container(ContainerSize::new(1200.0, 800.0), t0 + ms(10));
    surface.observe_container(ContainerSize::new(1500.0, 1000.0), t0 + ms(60));
    let rebuilt = drive(&mut surface, t0, 10, 400);
    assert_eq!(rebuilt, vec![(2, DisplayGeometry::new(1500, 1000), RebuildReason::Resize)]);
    assert_eq!(surface.state(), SurfaceState::Active);
    assert_eq!(surface.attached(), 1);
}

#[test]
fn resizes_far_apart_rebuild_twice() {
    let t0 = Instant::now();
    let mut surface = RenderSurface::new(1.5, DEBOUNCE, 2.0);
    surface.observe_container(ContainerSize::new(900.0, 600.0), t0);
    drive(&mut surface, t0, 0, 0);

    surface.observe_container(ContainerSize::new(1200.0, 800.0), t0 + ms(10));
    let first = drive(&mut surface, t0, 10, 250);
    surface.observe_container(ContainerSize::new(600.0, 400.0), t0 + ms(300));
    let second = drive(&mut surface, t0, 300, 600);

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].0, 3);
    assert_eq!(second[0].1, DisplayGeometry::new(600, 400));
}

#[test]
fn jitter_never_rebuilds() {
    let t0 = Instant::now();
    let mut surface = RenderSurface::new(1.5, DEBOUNCE, 2.0);
    surface.observe_container(ContainerSize::new(900.0, 600.0), t0);
    drive(&mut surface, t0, 0, 0);
    for i in 1..20u64 {
        let wobble = if i % 2 == 0 { 1.5 } else { -1.5 };
        surface.observe_container(ContainerSize::new(900.0 + wobble, 600.0), t0 + ms(i * 10));
    }
    assert!(drive(&mut surface, t0, 10, 500).is_empty());
    assert_eq!(surface.generation(), 1);
}

#[test]
fn not_ready_until_new_surface_is_painted() {
    let t0 = Instant::now();
    let mut surface = RenderSurface::new(1.5, DEBOUNCE, 2.0);
    surface.observe_container(ContainerSize::new(900.0, 600.0), t0);
    surface.poll(t0);
    assert!(!surface.is_ready());
    surface.mark_painted();
    assert!(surface.is_ready());

    surface.request_rebuild(RebuildReason::FilterSwap);
    surface.poll(t0 + ms(5));
    assert!(!surface.is_ready());
    assert!(surface.snapshot().is_none());
    surface.mark_painted();
    assert!(surface.snapshot().is_some());
}

#[test]
fn unmount_destroys_and_ignores_later_requests() {
    let t0 = Instant::now();
    let mut surface = RenderSurface::new(1.5, DEBOUNCE, 2.0);
    surface.observe_container(ContainerSize::new(900.0, 600.0), t0);
    surface.poll(t0);
    surface.unmount();
    assert_eq!(surface.state(), SurfaceState::Destroyed);
    assert_eq!(surface.attached(), 0);
    surface.observe_container(ContainerSize::new(1200.0, 800.0), t0 + ms(10));
    assert!(surface.poll(t0 + ms(500)).is_empty());
}
