use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FilterProgram, FrameContext};
use crate::geometry::center_offset;
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::color::ramp;
use crate::processing::sampler::SampleView;

const STEP: u32 = 3;
const DOT: f32 = 2.0;
const THRESHOLD: f32 = 35.0;
const RGB_OFFSET: f32 = 4.0;
const JITTER: f32 = 1.0;
const RAMP: [[u8; 3]; 3] = [[20, 50, 100], [10, 50, 130], [210, 220, 240]];

/// Thresholded jittered dots with a three-way colour split.
#[derive(Debug)]
pub struct SignalDots {
    rng: StdRng,
}

impl Default for SignalDots {
    fn default() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl SignalDots {
    #[cfg(test)]
    fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FilterProgram for SignalDots {
    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        canvas.clear([0, 0, 0]);
        // contain-fit the sample grid, letterboxed and centred
        let scale = (canvas.width() as f32 / sample.width() as f32)
            .min(canvas.height() as f32 / sample.height() as f32);
        let fitted_w = (sample.width() as f32 * scale).round() as u32;
        let fitted_h = (sample.height() as f32 * scale).round() as u32;
        let (ox, oy) = center_offset(fitted_w, fitted_h, canvas.width(), canvas.height());
        let (ox, oy) = (ox as f32, oy as f32);
        let size = DOT * scale;
        let half = DOT / 2.1;
        let shadow = Paint::rgba(0, 0, 0, 200);

        for y in (0..sample.height()).step_by(STEP as usize) {
            for x in (0..sample.width()).step_by(STEP as usize) {
                let bright = sample.luma(x, y);
                if bright < THRESHOLD {
                    continue;
                }
                let jx = self.rng.random_range(-JITTER..=JITTER);
                let jy = self.rng.random_range(-JITTER..=JITTER);
                let color = ramp(&RAMP, bright / 255.0);
                let paint = Paint::solid(color);
                let bx = x as f32 - half + jx;
                let by = y as f32 - half + jy;
                let to_display = |sx: f32, sy: f32| (ox + sx * scale, oy + sy * scale);

                let (dx, dy) = to_display(bx, by);
                canvas.fill_rect(dx, dy, size, size, shadow);
                let (dx, dy) = to_display(bx - RGB_OFFSET, by);
                canvas.fill_rect(dx, dy, size, size, paint);
                let (dx, dy) = to_display(bx, by - RGB_OFFSET);
                canvas.fill_rect(dx, dy, size, size, paint);
                let (dx, dy) = to_display(bx + RGB_OFFSET, by + RGB_OFFSET);
                canvas.fill_rect(dx, dy, size, size, paint);
            }
        }
    }
}
