use image::{Rgba, RgbaImage};

use super::sampler::SampleView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    #[default]
    Normal,
    Multiply,
}

/// Colour, coverage and blend mode for a paint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paint {
    pub color: [u8; 3],
    pub alpha: u8,
    pub blend: Blend,
}

impl Paint {
    #[must_use]
    pub const fn solid(color: [u8; 3]) -> Self {
        Self {
            color,
            alpha: 255,
            blend: Blend::Normal,
        }
    }

    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, alpha: u8) -> Self {
        Self {
            color: [r, g, b],
            alpha,
            blend: Blend::Normal,
        }
    }

    #[must_use]
    pub const fn multiply(mut self) -> Self {
        self.blend = Blend::Multiply;
        self
    }
}

#[inline]
fn mix(dst: u8, src: u8, alpha: u32) -> u8 {
    ((u32::from(src) * alpha + u32::from(dst) * (255 - alpha) + 127) / 255) as u8
}

#[inline]
fn blend_into(px: &mut Rgba<u8>, paint: Paint) {
    let alpha = u32::from(paint.alpha);
    if alpha == 0 {
        return;
    }
    for c in 0..3 {
        let src = match paint.blend {
            Blend::Normal => paint.color[c],
            Blend::Multiply => ((u32::from(paint.color[c]) * u32::from(px[c]) + 127) / 255) as u8,
        };
        px[c] = if alpha == 255 {
            src
        } else {
            mix(px[c], src, alpha)
        };
    }
    px[3] = 255;
}

/// Software paint target the filters draw on.
///
/// The canvas is always fully opaque; alpha only controls how paint blends with
/// what is already there.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
        }
    }

    #[must_use]
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Owned copy of the current paint.
    #[must_use]
    pub fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }

    pub fn clear(&mut self, color: [u8; 3]) {
        let fill = Rgba([color[0], color[1], color[2], 255]);
        for px in self.image.pixels_mut() {
            *px = fill;
        }
    }

    /// Translucent wash over the whole canvas.
    pub fn veil(&mut self, color: [u8; 3], alpha: u8) {
        let paint = Paint {
            color,
            alpha,
            blend: Blend::Normal,
        };
        for px in self.image.pixels_mut() {
            blend_into(px, paint);
        }
    }

    /// Integer pixel bounds of `[x, x+w) × [y, y+h)` clipped to the canvas.
    fn clip(&self, x: f32, y: f32, w: f32, h: f32) -> Option<(u32, u32, u32, u32)> {
        if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0
        {
            return None;
        }
        let x0 = x.round().max(0.0);
        let y0 = y.round().max(0.0);
        let x1 = (x + w).round().min(self.width() as f32);
        let y1 = (y + h).round().min(self.height() as f32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: Paint) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, w, h) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                blend_into(self.image.get_pixel_mut(px, py), paint);
            }
        }
    }

    /// Disc centred at `(cx, cy)`. Diameters under one pixel still touch the
    /// pixel under the centre.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, diameter: f32, paint: Paint) {
        if !(cx.is_finite() && cy.is_finite() && diameter.is_finite()) || diameter <= 0.0 {
            return;
        }
        let r = diameter / 2.0;
        if diameter < 1.0 {
            self.put(cx.floor() as i64, cy.floor() as i64, paint);
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(cx - r, cy - r, diameter, diameter) else {
            return;
        };
        let r2 = r * r;
        for py in y0..y1 {
            let dy = py as f32 + 0.5 - cy;
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    blend_into(self.image.get_pixel_mut(px, py), paint);
                }
            }
        }
    }

    #[inline]
    fn put(&mut self, x: i64, y: i64, paint: Paint) {
        if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
            return;
        }
        blend_into(self.image.get_pixel_mut(x as u32, y as u32), paint);
    }

    /// Straight line; widths above one pixel are drawn as square stamps.
    pub fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, paint: Paint) {
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }
        let (mut x, mut y) = (x0.round() as i64, y0.round() as i64);
        let (xe, ye) = (x1.round() as i64, y1.round() as i64);
        let dx = (xe - x).abs();
        let sx = if x < xe { 1 } else { -1 };
        let dy = -(ye - y).abs();
        let sy = if y < ye { 1 } else { -1 };
        let mut err = dx + dy;
        let half = ((width.max(1.0) - 1.0) / 2.0).round() as i64;
        loop {
            if half == 0 {
                self.put(x, y, paint);
            } else {
                for oy in -half..=half {
                    for ox in -half..=half {
                        self.put(x + ox, y + oy, paint);
                    }
                }
            }
            if x == xe && y == ye {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, paint: Paint) {
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            self.stroke_line(a.0, a.1, b.0, b.1, width, paint);
        }
    }

    /// Nearest-neighbour blit of a sample region into a display rectangle.
    ///
    /// `src` is `(x, y, w, h)` in sample pixels, `dst` in display pixels.
    pub fn draw_region(
        &mut self,
        view: &SampleView<'_>,
        src: (u32, u32, u32, u32),
        dst: (f32, f32, f32, f32),
        flip_vertical: bool,
        alpha: u8,
    ) {
        let (sx, sy, sw, sh) = src;
        if sw == 0 || sh == 0 || sx + sw > view.width() || sy + sh > view.height() {
            return;
        }
        let (dx, dy, dw, dh) = dst;
        let Some((x0, y0, x1, y1)) = self.clip(dx, dy, dw, dh) else {
            return;
        };
        for py in y0..y1 {
            let v = ((py as f32 + 0.5 - dy) / dh * sh as f32).floor().clamp(0.0, (sh - 1) as f32) as u32;
            let row = if flip_vertical { sy + sh - 1 - v } else { sy + v };
            for px in x0..x1 {
                let u = ((px as f32 + 0.5 - dx) / dw * sw as f32).floor().clamp(0.0, (sw - 1) as f32) as u32;
                let paint = Paint {
                    color: view.rgb(sx + u, row),
                    alpha,
                    blend: Blend::Normal,
                };
                blend_into(self.image.get_pixel_mut(px, py), paint);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(-2.0, -2.0, 4.0, 4.0, Paint::solid([255, 0, 0]));
        assert_eq!(canvas.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(2, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn multiply_darkens_paper() {
        let mut canvas = Canvas::new(1, 1);
        canvas.clear([200, 200, 200]);
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, Paint::solid([0, 255, 255]).multiply());
        assert_eq!(canvas.pixel(0, 0), [0, 200, 200, 255]);
    }

    #[test]
    fn veil_blends_toward_colour() {
        let mut canvas = Canvas::new(2, 1);
        canvas.clear([255, 255, 255]);
        canvas.veil([0, 0, 0], 128);
        let [r, g, b, a] = canvas.pixel(1, 0);
        assert!((126..=128).contains(&r));
        assert_eq!((r, r, a), (g, b, 255));
    }

    #[test]
    fn circle_stays_inside_its_box() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_circle(5.0, 5.0, 4.0, Paint::solid([255, 255, 255]));
        assert_eq!(canvas.pixel(5, 5), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(canvas.pixel(8, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn line_reaches_both_ends() {
        let mut canvas = Canvas::new(8, 8);
        canvas.stroke_line(0.0, 0.0, 7.0, 7.0, 1.0, Paint::solid([9, 9, 9]));
        assert_eq!(canvas.pixel(0, 0)[0], 9);
        assert_eq!(canvas.pixel(7, 7)[0], 9);
        assert_eq!(canvas.pixel(7, 0)[0], 0);
    }

    #[test]
    fn region_blit_flips_rows() {
        // 1x2 sample: red on top, blue below
        let pixels = [255, 0, 0, 255, 0, 0, 255, 255];
        let view = SampleView::new(1, 2, &pixels);
        let mut canvas = Canvas::new(2, 2);
        canvas.draw_region(&view, (0, 0, 1, 2), (0.0, 0.0, 2.0, 2.0), true, 255);
        assert_eq!(canvas.pixel(0, 0), [0, 0, 255, 255]);
        assert_eq!(canvas.pixel(1, 1), [255, 0, 0, 255]);
    }
}
