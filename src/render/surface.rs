//! Ownership of the single paint target bound to the display container.
//!
//! The surface moves through
//! `Uninitialized → Creating → Active → Recreating → Creating → Active … → Destroyed`.
//! Teardown of the previous canvas and creation of the next one happen inside
//! one `&mut self` call, so two canvases can never coexist and a creation can
//! never overlap a teardown.

use std::time::{Duration, Instant};

use image::RgbaImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::debounce::{ContainerSize, ResizeDebouncer};
use crate::geometry::{DisplayGeometry, fit_display};
use crate::processing::canvas::Canvas;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Creating,
    Active,
    Recreating,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    FirstSize,
    Resize,
    FilterSwap,
}

/// Lifecycle events produced by [`RenderSurface::poll`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTransition {
    TornDown {
        generation: u64,
    },
    Created {
        generation: u64,
        geometry: DisplayGeometry,
        reason: RebuildReason,
    },
}

pub struct RenderSurface {
    ratio: f64,
    debouncer: ResizeDebouncer,
    state: SurfaceState,
    canvas: Option<Canvas>,
    container: Option<ContainerSize>,
    pending: Option<RebuildReason>,
    generation: u64,
    ready: bool,
    unmounted: CancellationToken,
}

impl RenderSurface {
    #[must_use]
    pub fn new(ratio: f64, debounce: Duration, tolerance: f64) -> Self {
        Self::with_cancellation(ratio, debounce, tolerance, CancellationToken::new())
    }

    /// Cancelling `unmounted` aborts any creation that has not attached yet.
    #[must_use]
    pub fn with_cancellation(
        ratio: f64,
        debounce: Duration,
        tolerance: f64,
        unmounted: CancellationToken,
    ) -> Self {
        Self {
            ratio,
            debouncer: ResizeDebouncer::new(debounce, tolerance),
            state: SurfaceState::Uninitialized,
            canvas: None,
            container: None,
            pending: None,
            generation: 0,
            ready: false,
            unmounted,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SurfaceState {
        self.state
    }

    /// True only after the current canvas has been painted once.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn geometry(&self) -> Option<DisplayGeometry> {
        self.canvas
            .as_ref()
            .map(|c| DisplayGeometry::new(c.width(), c.height()))
    }

    /// Number of attached paint targets (zero or one).
    #[must_use]
    pub fn attached(&self) -> usize {
        usize::from(self.canvas.is_some())
    }

    #[must_use]
    pub fn container(&self) -> Option<ContainerSize> {
        self.container
    }

    pub fn observe_container(&mut self, size: ContainerSize, now: Instant) {
        if self.state == SurfaceState::Destroyed {
            return;
        }
        self.debouncer.observe(size, now);
    }

    /// Schedule a teardown/recreate on the next poll.
    pub fn request_rebuild(&mut self, reason: RebuildReason) {
        if self.state == SurfaceState::Destroyed {
            return;
        }
        self.pending = Some(reason);
    }

    /// Advance the lifecycle: apply settled resizes and pending rebuilds.
    pub fn poll(&mut self, now: Instant) -> Vec<SurfaceTransition> {
        let mut transitions = Vec::new();
        if self.state == SurfaceState::Destroyed {
            return transitions;
        }
        if self.unmounted.is_cancelled() {
            self.unmount();
            return transitions;
        }
        if let Some(size) = self.debouncer.poll(now) {
            self.container = Some(size);
            let reason = if self.generation == 0 {
                RebuildReason::FirstSize
            } else {
                RebuildReason::Resize
            };
            // a resize supersedes a pending filter swap; both rebuild once
            self.pending = Some(reason);
        }
        let Some(reason) = self.pending.take() else {
            return transitions;
        };
        let Some(container) = self.container else {
            // no size yet; the first size will create the surface anyway
            return transitions;
        };

        self.teardown(&mut transitions);
        let Some(geometry) = fit_display(container.width, container.height, self.ratio) else {
            debug!(
                width = container.width,
                height = container.height,
                "degenerate container; surface parked"
            );
            self.state = SurfaceState::Uninitialized;
            return transitions;
        };

        self.state = SurfaceState::Creating;
        if self.unmounted.is_cancelled() {
            debug!("creation cancelled before attach");
            self.state = SurfaceState::Destroyed;
            return transitions;
        }
        self.generation += 1;
        self.canvas = Some(Canvas::new(geometry.width, geometry.height));
        info!(
            generation = self.generation,
            width = geometry.width,
            height = geometry.height,
            ?reason,
            "render surface created"
        );
        transitions.push(SurfaceTransition::Created {
            generation: self.generation,
            geometry,
            reason,
        });
        transitions
    }

    fn teardown(&mut self, transitions: &mut Vec<SurfaceTransition>) {
        self.ready = false;
        if self.canvas.take().is_some() {
            self.state = SurfaceState::Recreating;
            debug!(generation = self.generation, "render surface torn down");
            transitions.push(SurfaceTransition::TornDown {
                generation: self.generation,
            });
        }
    }

    /// Canvas to paint this tick, if one is attached.
    pub fn canvas_mut(&mut self) -> Option<&mut Canvas> {
        match self.state {
            SurfaceState::Creating | SurfaceState::Active => self.canvas.as_mut(),
            _ => None,
        }
    }

    /// Record a successful paint. Returns true when this paint made the
    /// surface ready.
    pub fn mark_painted(&mut self) -> bool {
        if self.canvas.is_none() {
            return false;
        }
        if self.state == SurfaceState::Creating {
            self.state = SurfaceState::Active;
        }
        let flipped = !self.ready;
        self.ready = true;
        flipped
    }

    /// Drop readiness without releasing the canvas. The next paint makes the
    /// surface ready again.
    pub fn mark_stale(&mut self) -> bool {
        let was_ready = self.ready;
        self.ready = false;
        if was_ready {
            debug!(generation = self.generation, "render surface stale");
        }
        was_ready
    }

    /// Copy of the current paint, only once the surface is ready.
    #[must_use]
    pub fn snapshot(&self) -> Option<RgbaImage> {
        if !self.ready {
            return None;
        }
        self.canvas.as_ref().map(Canvas::snapshot)
    }

    #[must_use]
    pub fn image(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref().map(Canvas::image)
    }

    /// Release the canvas for good. Later polls are no-ops.
    pub fn unmount(&mut self) {
        if self.state == SurfaceState::Destroyed {
            return;
        }
        self.unmounted.cancel();
        self.ready = false;
        self.canvas = None;
        self.pending = None;
        self.state = SurfaceState::Destroyed;
        info!(generation = self.generation, "render surface destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> RenderSurface {
        RenderSurface::new(1.5, Duration::from_millis(150), 2.0)
    }

    #[test]
    fn first_size_creates_and_paint_makes_ready() {
        let t0 = Instant::now();
        let mut s = surface();
        assert_eq!(s.state(), SurfaceState::Uninitialized);
        s.observe_container(ContainerSize::new(900.0, 900.0), t0);
        let tr = s.poll(t0);
        assert_eq!(
            tr,
            vec![SurfaceTransition::Created {
                generation: 1,
                geometry: DisplayGeometry::new(900, 600),
                reason: RebuildReason::FirstSize,
            }]
        );
        assert_eq!(s.state(), SurfaceState::Creating);
        assert!(!s.is_ready());
        assert!(s.snapshot().is_none());
        assert!(s.mark_painted());
        assert!(!s.mark_painted());
        assert_eq!(s.state(), SurfaceState::Active);
        assert!(s.snapshot().is_some());
    }

    #[test]
    fn filter_swap_tears_down_before_creating() {
        let t0 = Instant::now();
        let mut s = surface();
        s.observe_container(ContainerSize::new(600.0, 400.0), t0);
        s.poll(t0);
        s.mark_painted();
        s.request_rebuild(RebuildReason::FilterSwap);
        let tr = s.poll(t0);
        assert_eq!(tr.len(), 2);
        assert_eq!(tr[0], SurfaceTransition::TornDown { generation: 1 });
        assert!(matches!(tr[1], SurfaceTransition::Created { generation: 2, .. }));
        assert!(!s.is_ready());
        assert_eq!(s.attached(), 1);
    }

    #[test]
    fn stale_surface_withholds_snapshots_until_repainted() {
        let t0 = Instant::now();
        let mut s = surface();
        s.observe_container(ContainerSize::new(600.0, 400.0), t0);
        s.poll(t0);
        s.mark_painted();
        assert!(s.mark_stale());
        assert!(!s.mark_stale());
        assert!(!s.is_ready());
        assert!(s.snapshot().is_none());
        assert_eq!(s.attached(), 1);
        assert!(s.mark_painted());
        assert!(s.snapshot().is_some());
    }

    #[test]
    fn degenerate_container_parks_surface() {
        let t0 = Instant::now();
        let mut s = surface();
        s.observe_container(ContainerSize::new(0.0, 300.0), t0);
        let tr = s.poll(t0);
        assert!(tr.is_empty());
        assert_eq!(s.attached(), 0);
        assert_eq!(s.state(), SurfaceState::Uninitialized);
    }

    #[test]
    fn cancelled_creation_never_attaches() {
        let t0 = Instant::now();
        let token = CancellationToken::new();
        let mut s = RenderSurface::with_cancellation(1.5, Duration::from_millis(150), 2.0, token.clone());
        s.observe_container(ContainerSize::new(600.0, 400.0), t0);
        token.cancel();
        assert!(s.poll(t0).is_empty());
        assert_eq!(s.attached(), 0);
        assert_eq!(s.state(), SurfaceState::Destroyed);
        s.request_rebuild(RebuildReason::FilterSwap);
        assert!(s.poll(t0).is_empty());
    }
}
