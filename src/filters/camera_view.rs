use super::{FilterProgram, FrameContext};
use crate::processing::canvas::Canvas;
use crate::processing::sampler::SampleView;

/// The sample as-is, scaled to the surface.
#[derive(Debug, Default)]
pub struct CameraView;

impl FilterProgram for CameraView {
    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        let dst = (0.0, 0.0, canvas.width() as f32, canvas.height() as f32);
        canvas.draw_region(sample, (0, 0, sample.width(), sample.height()), dst, false, 255);
    }
}
