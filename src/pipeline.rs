//! One render tick: sample the source, let the active filter paint the
//! surface, mark it painted.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use image::RgbaImage;
use tracing::{debug, error, info, trace, warn};

use crate::config::Configuration;
use crate::error::BoothError;
use crate::filters::{DrawStatus, Filter, FilterKind, FilterRegistry, FrameContext};
use crate::processing::sampler::{NotReady, PixelSampler, SampleOutcome};
use crate::render::debounce::ContainerSize;
use crate::render::surface::{RebuildReason, RenderSurface, SurfaceTransition};
use crate::video::VideoSource;

/// Consecutive panics after which the active filter is parked until the next
/// selection.
const MAX_FILTER_FAILURES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The surface holds a fresh paint. `became_ready` is set on the first
    /// paint of a new surface.
    Painted { became_ready: bool },
    NoSource,
    /// Source has no usable frame yet.
    NotReady(NotReady),
    /// No surface attached (no container size yet or a degenerate one).
    SurfacePending,
    /// The filter panicked or is parked after repeated panics; this tick
    /// painted nothing.
    FilterFailed,
}

pub struct Pipeline {
    sampler: PixelSampler,
    surface: RenderSurface,
    registry: FilterRegistry,
    filter: Filter,
    /// Surface generation the filter last ran `setup` on.
    prepared: u64,
    activated: Instant,
    /// Consecutive panics of the active filter.
    failures: u32,
    source: Option<Box<dyn VideoSource>>,
    #[cfg(test)]
    panic_next_draws: u32,
}

impl Pipeline {
    pub fn new(cfg: &Configuration, surface: RenderSurface, now: Instant) -> Result<Self, BoothError> {
        let registry = FilterRegistry::new(cfg.filters.clone(), cfg.initial_filter)?;
        let filter = registry.active().instantiate();
        Ok(Self {
            sampler: PixelSampler::new(cfg.sample_width, cfg.sample_height, cfg.target_aspect_ratio, cfg.mirror),
            surface,
            registry,
            filter,
            prepared: 0,
            activated: now,
            failures: 0,
            source: None,
            #[cfg(test)]
            panic_next_draws: 0,
        })
    }

    #[must_use]
    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    #[must_use]
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    #[must_use]
    pub fn active_filter(&self) -> FilterKind {
        self.filter.kind()
    }

    pub fn set_source(&mut self, source: Box<dyn VideoSource>) {
        info!(source = source.label(), "video source attached");
        self.source = Some(source);
    }

    /// Release the source. The surface keeps its canvas but stays not-ready
    /// until a new source paints it.
    pub fn clear_source(&mut self) {
        if let Some(old) = self.source.take() {
            debug!(source = old.label(), "video source released");
        }
        self.surface.mark_stale();
    }

    #[must_use]
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn observe_container(&mut self, size: ContainerSize, now: Instant) {
        self.surface.observe_container(size, now);
    }

    pub fn select_filter(&mut self, index: usize, now: Instant) -> Result<FilterKind, BoothError> {
        let kind = self.registry.select(index)?;
        self.activate(kind, now);
        Ok(kind)
    }

    /// Select by registry name or by index written as a string.
    pub fn select_filter_named(&mut self, name: &str, now: Instant) -> Result<FilterKind, BoothError> {
        let kind = self.registry.select_named(name)?;
        self.activate(kind, now);
        Ok(kind)
    }

    pub fn next_filter(&mut self, now: Instant) -> FilterKind {
        let kind = self.registry.next();
        self.activate(kind, now);
        kind
    }

    pub fn previous_filter(&mut self, now: Instant) -> FilterKind {
        let kind = self.registry.previous();
        self.activate(kind, now);
        kind
    }

    fn activate(&mut self, kind: FilterKind, now: Instant) {
        info!(filter = %kind, index = self.registry.active_index(), "filter selected");
        self.filter = kind.instantiate();
        self.activated = now;
        self.prepared = 0;
        self.failures = 0;
        self.surface.request_rebuild(RebuildReason::FilterSwap);
    }

    /// Run one tick. Errors are device faults from the source.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome, BoothError> {
        for transition in self.surface.poll(now) {
            if let SurfaceTransition::Created { generation, .. } = transition {
                trace!(generation, "surface awaiting filter setup");
            }
        }

        let Some(source) = self.source.as_mut() else {
            return Ok(TickOutcome::NoSource);
        };
        let Some(frame) = source.frame()? else {
            return Ok(TickOutcome::NotReady(NotReady::NoDimensions));
        };
        let view = match self.sampler.sample(frame)? {
            SampleOutcome::Ready(view) => view,
            SampleOutcome::NotReady(reason) => {
                trace!(?reason, "sample not ready");
                return Ok(TickOutcome::NotReady(reason));
            }
        };

        let generation = self.surface.generation();
        let Some(canvas) = self.surface.canvas_mut() else {
            return Ok(TickOutcome::SurfacePending);
        };
        if self.failures >= MAX_FILTER_FAILURES {
            return Ok(TickOutcome::FilterFailed);
        }
        let ctx = FrameContext {
            elapsed: now.saturating_duration_since(self.activated),
        };
        let filter = &mut self.filter;
        let needs_setup = self.prepared != generation;
        #[cfg(test)]
        let injected = self.panic_next_draws > 0;
        #[cfg(test)]
        if injected {
            self.panic_next_draws -= 1;
        }
        let painted = catch_unwind(AssertUnwindSafe(|| {
            #[cfg(test)]
            if injected {
                panic!("filter failure for tests");
            }
            if needs_setup {
                filter.setup(canvas);
            }
            filter.draw(canvas, &view, &ctx)
        }));

        match painted {
            Ok(status) => {
                self.prepared = generation;
                self.failures = 0;
                if status == DrawStatus::Skipped {
                    return Ok(TickOutcome::NotReady(NotReady::Undecodable));
                }
                let became_ready = self.surface.mark_painted();
                if became_ready {
                    debug!(filter = %self.filter.kind(), generation, "surface ready");
                }
                Ok(TickOutcome::Painted { became_ready })
            }
            Err(_) => {
                self.failures += 1;
                if self.failures >= MAX_FILTER_FAILURES {
                    error!(
                        filter = %self.filter.kind(),
                        failures = self.failures,
                        "filter keeps panicking; parked until another selection"
                    );
                } else if self.failures == 1 {
                    warn!(filter = %self.filter.kind(), generation, "filter panicked; tick skipped");
                }
                Ok(TickOutcome::FilterFailed)
            }
        }
    }

    /// Copy of the painted surface, once ready and while a source is live.
    #[must_use]
    pub fn snapshot(&self) -> Option<RgbaImage> {
        self.source.as_ref()?;
        self.surface.snapshot()
    }

    pub fn shutdown(&mut self) {
        self.clear_source();
        self.surface.unmount();
    }
}
