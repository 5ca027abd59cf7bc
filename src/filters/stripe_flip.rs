use super::{FilterProgram, FrameContext};
use crate::processing::canvas::Canvas;
use crate::processing::sampler::SampleView;

const SLICES: u32 = 20;

/// Vertical slices of the camera, every other one upside down.
#[derive(Debug, Default)]
pub struct StripeFlip;

impl FilterProgram for StripeFlip {
    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        canvas.clear([0, 0, 0]);
        let slices = SLICES.min(sample.width());
        let dst_w = canvas.width() as f32 / slices as f32;
        let height = canvas.height() as f32;
        for i in 0..slices {
            let sx = i * sample.width() / slices;
            let sx_end = (i + 1) * sample.width() / slices;
            let src = (sx, 0, (sx_end - sx).max(1), sample.height());
            let dst = (i as f32 * dst_w, 0.0, dst_w, height);
            canvas.draw_region(sample, src, dst, i % 2 == 1, 255);
        }
    }
}
