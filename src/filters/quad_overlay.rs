use super::{FilterProgram, FrameContext};
use crate::processing::canvas::Canvas;
use crate::processing::sampler::SampleView;

/// 25% coverage per layer.
const LAYER_ALPHA: u8 = 64;

/// The four quadrants of the sample, each stretched over the whole surface
/// and stacked translucently. The surface is never cleared, so earlier frames
/// linger under the new layers.
#[derive(Debug, Default)]
pub struct QuadOverlay;

fn quadrants(w: u32, h: u32) -> [(u32, u32, u32, u32); 4] {
    let hw = w / 2;
    let hh = h / 2;
    [
        (0, 0, hw, hh),
        (hw, 0, w - hw, hh),
        (0, hh, hw, h - hh),
        (hw, hh, w - hw, h - hh),
    ]
}

impl FilterProgram for QuadOverlay {
    fn setup(&mut self, canvas: &mut Canvas) {
        canvas.clear([0, 0, 0]);
    }

    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        let dst = (0.0, 0.0, canvas.width() as f32, canvas.height() as f32);
        for quad in quadrants(sample.width(), sample.height()) {
            canvas.draw_region(sample, quad, dst, false, LAYER_ALPHA);
        }
    }
}
