//! Crop and fit rules shared by the sampler and the render surface.
//!
//! Three rectangles meet here: the raw camera frame, the fixed sample buffer,
//! and the variable display surface. All of them are reconciled against one
//! target aspect ratio; nothing else in the crate derives geometry on its own.

/// Source-space rectangle (in camera pixels) that matches the target ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub sx: f64,
    pub sy: f64,
    pub sw: f64,
    pub sh: f64,
}

impl CropRect {
    #[must_use]
    pub fn aspect(&self) -> f64 {
        self.sw / self.sh
    }
}

/// Pixel size of the on-screen paint target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
}

impl DisplayGeometry {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

fn usable_ratio(ratio: f64) -> bool {
    ratio.is_finite() && ratio > 0.0
}

/// Largest centred crop of a `src_w × src_h` frame with `sw / sh == ratio`.
///
/// The limiting source dimension is used in full and the other axis is
/// trimmed symmetrically. Returns `None` for zero-sized frames or an unusable
/// ratio; callers treat that as "not ready yet".
#[must_use]
pub fn crop_rect(src_w: u32, src_h: u32, ratio: f64) -> Option<CropRect> {
    if src_w == 0 || src_h == 0 || !usable_ratio(ratio) {
        return None;
    }
    let w = f64::from(src_w);
    let h = f64::from(src_h);
    let rect = if w / h > ratio {
        let sw = h * ratio;
        CropRect {
            sx: (w - sw) / 2.0,
            sy: 0.0,
            sw,
            sh: h,
        }
    } else {
        let sh = w / ratio;
        CropRect {
            sx: 0.0,
            sy: (h - sh) / 2.0,
            sw: w,
            sh,
        }
    };
    Some(rect)
}

/// Fit the target ratio inside a container, fitting to the limiting dimension.
///
/// A container wider than the ratio is height-limited (width derived), and
/// vice versa. Sizes are floored so the surface never overflows its container.
#[must_use]
pub fn fit_display(container_w: f64, container_h: f64, ratio: f64) -> Option<DisplayGeometry> {
    if !(container_w.is_finite() && container_h.is_finite()) || !usable_ratio(ratio) {
        return None;
    }
    if container_w < 1.0 || container_h < 1.0 {
        return None;
    }
    let (w, h) = if container_w / container_h > ratio {
        (container_h * ratio, container_h)
    } else {
        (container_w, container_w / ratio)
    };
    let width = w.floor() as u32;
    let height = h.floor() as u32;
    if width == 0 || height == 0 {
        return None;
    }
    Some(DisplayGeometry { width, height })
}

/// Display pixels per sample pixel on each axis.
#[must_use]
pub fn scale_factors(sample_w: u32, sample_h: u32, display: DisplayGeometry) -> (f32, f32) {
    (
        display.width as f32 / sample_w.max(1) as f32,
        display.height as f32 / sample_h.max(1) as f32,
    )
}

/// Display coordinate of the centre of the sample cell starting at `index`.
#[inline]
#[must_use]
pub fn cell_center(index: u32, scale: f32) -> f32 {
    index as f32 * scale + scale / 2.0
}

/// Linear re-mapping of `value` from `[in_lo, in_hi]` onto `[out_lo, out_hi]`.
#[must_use]
pub fn map_range(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32, clamp: bool) -> f32 {
    let span = in_hi - in_lo;
    if span.abs() <= f32::EPSILON {
        return out_lo;
    }
    let mapped = out_lo + (value - in_lo) / span * (out_hi - out_lo);
    if clamp {
        let (lo, hi) = if out_lo <= out_hi {
            (out_lo, out_hi)
        } else {
            (out_hi, out_lo)
        };
        mapped.clamp(lo, hi)
    } else {
        mapped
    }
}

/// Offset that centres an inner rectangle within an outer one.
#[must_use]
pub fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    let ox = outer_w.saturating_sub(inner_w) / 2;
    let oy = outer_h.saturating_sub(inner_h) / 2;
    (ox, oy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_container_is_width_limited() {
        let geo = fit_display(900.0, 900.0, 1.5).unwrap();
        assert_eq!(geo, DisplayGeometry::new(900, 600));
    }

    #[test]
    fn wide_container_is_height_limited() {
        let geo = fit_display(1920.0, 1080.0, 1.5).unwrap();
        assert_eq!(geo, DisplayGeometry::new(1620, 1080));
    }

    #[test]
    fn degenerate_inputs_yield_none() {
        assert!(crop_rect(0, 1080, 1.5).is_none());
        assert!(crop_rect(1920, 1080, 0.0).is_none());
        assert!(fit_display(0.0, 400.0, 1.5).is_none());
        assert!(fit_display(f64::NAN, 400.0, 1.5).is_none());
    }

    #[test]
    fn map_range_clamps_when_asked() {
        assert!((map_range(300.0, 80.0, 255.0, 50.0, 180.0, true) - 180.0).abs() < 1e-4);
        assert!((map_range(0.0, 0.0, 255.0, 2.0, 20.0, false) - 2.0).abs() < 1e-4);
        assert!((map_range(255.0, 0.0, 255.0, 2.0, 20.0, false) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn center_offset_never_underflows() {
        assert_eq!(center_offset(100, 50, 80, 40), (0, 0));
        assert_eq!(center_offset(100, 50, 200, 70), (50, 10));
    }
}
