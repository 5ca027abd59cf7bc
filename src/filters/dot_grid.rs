use super::{FilterProgram, FrameContext};
use crate::geometry::{DisplayGeometry, cell_center, map_range, scale_factors};
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::sampler::SampleView;

const STEP: u32 = 10;

/// White dots on black, sized by brightness.
#[derive(Debug, Default)]
pub struct DotGrid;

impl FilterProgram for DotGrid {
    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        canvas.clear([0, 0, 0]);
        let display = DisplayGeometry::new(canvas.width(), canvas.height());
        let (scale_x, scale_y) = scale_factors(sample.width(), sample.height(), display);
        let cell_w = STEP as f32 * scale_x;
        let cell_h = STEP as f32 * scale_y;
        let max_diameter = cell_w.min(cell_h).max(1.0);
        let white = Paint::solid([255, 255, 255]);
        for y in (0..sample.height()).step_by(STEP as usize) {
            for x in (0..sample.width()).step_by(STEP as usize) {
                let diameter = map_range(sample.luma(x, y), 0.0, 255.0, 1.0, max_diameter, true);
                let cx = cell_center(x / STEP, cell_w);
                let cy = cell_center(y / STEP, cell_h);
                canvas.fill_circle(cx, cy, diameter, white);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bright_cells_get_full_dots() {
        let pixels = vec![255u8; 20 * 10 * 4];
        let view = SampleView::new(20, 10, &pixels);
        let mut canvas = Canvas::new(40, 20);
        DotGrid.draw(&mut canvas, &view, &FrameContext { elapsed: std::time::Duration::ZERO });
        // two cells of 20x20 display pixels, dots centred at (10,10) and (30,10)
        assert_eq!(canvas.pixel(10, 10), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(30, 4), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(20, 0), [0, 0, 0, 255]);
    }
}
