use super::{FilterProgram, FrameContext};
use crate::geometry::map_range;
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::sampler::SampleView;

const CELL: u32 = 4;
const LEVELS: u8 = 3;
const EDGE: Paint = Paint::solid([0, 0, 255]);
const EDGE_WIDTH: f32 = 2.0;

/// Brightness quantised to a few levels on a coarse display grid, with edges
/// drawn where neighbouring cells differ.
#[derive(Debug, Default)]
pub struct Contour {
    display: (u32, u32),
    cols: u32,
    rows: u32,
    levels: Vec<u8>,
}

impl Contour {
    fn resize_grid(&mut self, width: u32, height: u32) {
        if self.display == (width, height) && !self.levels.is_empty() {
            return;
        }
        self.display = (width, height);
        self.cols = width / CELL;
        self.rows = height / CELL;
        self.levels = vec![0; (self.cols * self.rows) as usize];
    }

    fn level(&self, col: u32, row: u32) -> u8 {
        self.levels[(row * self.cols + col) as usize]
    }
}

fn quantize(luma: f32) -> u8 {
    let level = map_range(luma, 0.0, 255.0, 0.0, f32::from(LEVELS), false).floor();
    (level.max(0.0) as u8).min(LEVELS - 1)
}

impl FilterProgram for Contour {
    fn setup(&mut self, canvas: &mut Canvas) {
        self.resize_grid(canvas.width(), canvas.height());
    }

    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        canvas.clear([255, 255, 255]);
        self.resize_grid(canvas.width(), canvas.height());
        if self.cols == 0 || self.rows == 0 {
            return;
        }
        let sx = sample.width() as f32 / self.cols as f32;
        let sy = sample.height() as f32 / self.rows as f32;
        for row in 0..self.rows {
            let vy = ((row as f32 * sy).floor() as u32).min(sample.height() - 1);
            for col in 0..self.cols {
                let vx = ((col as f32 * sx).floor() as u32).min(sample.width() - 1);
                self.levels[(row * self.cols + col) as usize] = quantize(sample.luma(vx, vy));
            }
        }

        let cell = CELL as f32;
        let half = EDGE_WIDTH / 2.0;
        for col in 0..self.cols.saturating_sub(1) {
            for row in 0..self.rows.saturating_sub(1) {
                let here = self.level(col, row);
                let x = (col * CELL) as f32;
                let y = (row * CELL) as f32;
                if here != self.level(col + 1, row) {
                    canvas.fill_rect(x + cell - half, y, EDGE_WIDTH, cell, EDGE);
                }
                if here != self.level(col, row + 1) {
                    canvas.fill_rect(x, y + cell - half, cell, EDGE_WIDTH, EDGE);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantizes_into_three_levels() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(84.0), 0);
        assert_eq!(quantize(86.0), 1);
        assert_eq!(quantize(200.0), 2);
        assert_eq!(quantize(255.0), 2);
    }

    #[test]
    fn edge_between_dark_and_bright_halves() {
        let mut pixels = Vec::new();
        for _ in 0..6 {
            for x in 0..12 {
                let v = if x < 6 { 0 } else { 255 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let view = SampleView::new(12, 6, &pixels);
        let mut canvas = Canvas::new(48, 24);
        let mut filter = Contour::default();
        filter.setup(&mut canvas);
        filter.draw(&mut canvas, &view, &FrameContext { elapsed: std::time::Duration::ZERO });
        // level boundary between columns 5 and 6 -> edge at x = 24
        assert_eq!(canvas.pixel(24, 5), [0, 0, 255, 255]);
        assert_eq!(canvas.pixel(10, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn grid_follows_display_size() {
        let mut filter = Contour::default();
        filter.resize_grid(40, 20);
        assert_eq!((filter.cols, filter.rows), (10, 5));
        filter.resize_grid(80, 40);
        assert_eq!(filter.levels.len(), 20 * 10);
    }
}
