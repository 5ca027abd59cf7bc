use super::{FilterProgram, FrameContext};
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::sampler::SampleView;

const LINE_DENSITY: f32 = 0.1;
const DISTORTION: f32 = 0.025;
const Y_SAMPLING: u32 = 2;
const STROKE: Paint = Paint::rgba(11, 120, 255, 220);

/// Vertical lines pushed sideways by brightness, on white.
#[derive(Debug, Default)]
pub struct WaveLines;

impl FilterProgram for WaveLines {
    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        canvas.clear([255, 255, 255]);
        let (w, h) = (canvas.width(), canvas.height());
        let lines = ((w as f32 * LINE_DENSITY).floor() as u32).max(1);
        let step = ((w as f32 / lines as f32).floor() as u32).max(1);
        let swing = w as f32 * DISTORTION * 2.0;
        let y_step = (h / (lines * Y_SAMPLING)).max(1);
        let sx = sample.width() as f32 / w as f32;
        let sy = sample.height() as f32 / h as f32;

        let offset = |x: u32, y: u32| -> Option<f32> {
            let ix = (x as f32 * sx).floor() as u32;
            let iy = (y as f32 * sy).floor() as u32;
            (ix < sample.width() && iy < sample.height())
                .then(|| (sample.luma(ix, iy) / 255.0 - 0.5) * swing)
        };

        let mut points = Vec::with_capacity((h / y_step + 2) as usize);
        for x in (0..w).step_by(step as usize) {
            points.clear();
            for y in (0..h).step_by(y_step as usize) {
                if let Some(dx) = offset(x, y) {
                    points.push((x as f32 + dx, y as f32));
                }
            }
            // always reach the bottom edge
            if y_step > 1 {
                let last = h - 1;
                if let Some(dx) = offset(x, last) {
                    points.push((x as f32 + dx, last as f32));
                }
            }
            canvas.stroke_polyline(&points, 1.0, STROKE);
        }
    }
}
