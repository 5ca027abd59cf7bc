use super::{FilterProgram, FrameContext};
use crate::geometry::{DisplayGeometry, cell_center, map_range, scale_factors};
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::sampler::SampleView;

const STEP: u32 = 10;
const VEIL_ALPHA: u8 = 10;
const MIN_BRIGHTNESS: f32 = 120.0;

/// Bright spots leave slowly fading coloured dots. Each tick washes the
/// existing paint with a faint black veil instead of clearing it.
#[derive(Debug, Default)]
pub struct FadeTrail;

impl FilterProgram for FadeTrail {
    fn setup(&mut self, canvas: &mut Canvas) {
        canvas.clear([0, 0, 0]);
    }

    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        canvas.veil([0, 0, 0], VEIL_ALPHA);
        let display = DisplayGeometry::new(canvas.width(), canvas.height());
        let (scale_x, scale_y) = scale_factors(sample.width(), sample.height(), display);
        let diameter = scale_x.min(scale_y) * 5.0;
        for y in (0..sample.height()).step_by(STEP as usize) {
            for x in (0..sample.width()).step_by(STEP as usize) {
                let rgb = sample.rgb(x, y);
                let bright = sample.luma(x, y);
                if bright <= MIN_BRIGHTNESS {
                    continue;
                }
                let alpha = map_range(bright, MIN_BRIGHTNESS, 255.0, 50.0, 150.0, true);
                let [r, g, b] = rgb;
                canvas.fill_circle(
                    cell_center(x / STEP, STEP as f32 * scale_x),
                    cell_center(y / STEP, STEP as f32 * scale_y),
                    diameter,
                    Paint::rgba(r, g, b, alpha.round() as u8),
                );
            }
        }
    }
}
