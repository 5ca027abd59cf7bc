use std::time::{Duration, Instant};

use tracing::trace;

/// Container size in layout pixels; fractional values come from scaled windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl ContainerSize {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either side moved by more than `tolerance` pixels.
    #[must_use]
    pub fn differs_from(&self, other: &Self, tolerance: f64) -> bool {
        (self.width - other.width).abs() > tolerance || (self.height - other.height).abs() > tolerance
    }
}

/// Collapses bursts of container resizes into one applied size.
///
/// The first size is released immediately; later changes are released once no
/// further change has been observed for `delay`.
#[derive(Debug, Clone)]
pub struct ResizeDebouncer {
    delay: Duration,
    tolerance: f64,
    pending: Option<(ContainerSize, Instant)>,
    applied: Option<ContainerSize>,
}

impl ResizeDebouncer {
    #[must_use]
    pub const fn new(delay: Duration, tolerance: f64) -> Self {
        Self {
            delay,
            tolerance,
            pending: None,
            applied: None,
        }
    }

    #[must_use]
    pub const fn applied(&self) -> Option<ContainerSize> {
        self.applied
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn observe(&mut self, size: ContainerSize, now: Instant) {
        if let Some((pending, _)) = self.pending {
            if !size.differs_from(&pending, self.tolerance) {
                return;
            }
        }
        match self.applied {
            None => {
                self.pending = Some((size, now));
            }
            Some(applied) if !size.differs_from(&applied, self.tolerance) => {
                // back within tolerance of what is already applied
                if self.pending.take().is_some() {
                    trace!("resize settled back to applied size");
                }
            }
            Some(_) => {
                trace!(width = size.width, height = size.height, "resize observed; restarting debounce");
                self.pending = Some((size, now + self.delay));
            }
        }
    }

    /// Release the pending size once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<ContainerSize> {
        let (size, due) = self.pending?;
        if now < due {
            return None;
        }
        self.pending = None;
        self.applied = Some(size);
        Some(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(150);

    #[test]
    fn first_size_is_immediate() {
        let t0 = Instant::now();
        let mut d = ResizeDebouncer::new(DELAY, 2.0);
        d.observe(ContainerSize::new(800.0, 600.0), t0);
        assert_eq!(d.poll(t0), Some(ContainerSize::new(800.0, 600.0)));
        assert_eq!(d.poll(t0), None);
    }

    #[test]
    fn burst_collapses_to_last_size() {
        let t0 = Instant::now();
        let mut d = ResizeDebouncer::new(DELAY, 2.0);
        d.observe(ContainerSize::new(800.0, 600.0), t0);
        d.poll(t0);
        d.observe(ContainerSize::new(900.0, 600.0), t0);
        d.observe(ContainerSize::new(1000.0, 600.0), t0 + Duration::from_millis(100));
        assert_eq!(d.poll(t0 + Duration::from_millis(200)), None);
        assert_eq!(
            d.poll(t0 + Duration::from_millis(250)),
            Some(ContainerSize::new(1000.0, 600.0))
        );
    }

    #[test]
    fn jitter_within_tolerance_is_ignored() {
        let t0 = Instant::now();
        let mut d = ResizeDebouncer::new(DELAY, 2.0);
        d.observe(ContainerSize::new(800.0, 600.0), t0);
        d.poll(t0);
        d.observe(ContainerSize::new(801.5, 599.0), t0);
        assert!(!d.is_pending());
    }

    #[test]
    fn returning_to_applied_size_cancels_pending() {
        let t0 = Instant::now();
        let mut d = ResizeDebouncer::new(DELAY, 2.0);
        d.observe(ContainerSize::new(800.0, 600.0), t0);
        d.poll(t0);
        d.observe(ContainerSize::new(700.0, 600.0), t0);
        d.observe(ContainerSize::new(800.0, 600.0), t0 + Duration::from_millis(10));
        assert!(!d.is_pending());
        assert_eq!(d.poll(t0 + DELAY * 2), None);
    }
}
