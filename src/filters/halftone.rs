use std::collections::HashMap;

use super::{FilterProgram, FrameContext};
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::sampler::SampleView;

const PAPER: [u8; 3] = [240, 240, 235];
const CYAN: [u8; 3] = [0, 174, 239];
const MAGENTA: [u8; 3] = [236, 0, 140];
const YELLOW: [u8; 3] = [255, 242, 0];
const INK_ALPHA: u8 = 180;
const BASE_DOT: f32 = 28.0;
const MIN_DOT: f32 = 4.0;
const DOT_OFFSET: f32 = 0.6;
const LUT_CAP: usize = 500;
/// Channel values are bucketed to multiples of this before LUT lookup.
const LUT_QUANT: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cmy {
    c: f32,
    m: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DotGrid {
    display: (u32, u32),
    cols: u32,
    rows: u32,
    start_x: f32,
    start_y: f32,
    spacing: f32,
}

impl DotGrid {
    fn new(width: u32, height: u32) -> Self {
        let spacing = BASE_DOT;
        let cols = (width as f32 / spacing).floor() as u32;
        let rows = (height as f32 / spacing).floor() as u32;
        Self {
            display: (width, height),
            cols,
            rows,
            start_x: (width as f32 - cols.saturating_sub(1) as f32 * spacing) / 2.0,
            start_y: (height as f32 - rows.saturating_sub(1) as f32 * spacing) / 2.0,
            spacing,
        }
    }
}

/// CMY halftone multiplied over paper.
#[derive(Debug, Default)]
pub struct CmyHalftone {
    grid: Option<DotGrid>,
    lut: HashMap<(u8, u8, u8), Cmy>,
}

fn quantize(v: u8) -> u8 {
    ((f32::from(v) / LUT_QUANT).round() * LUT_QUANT).min(255.0) as u8
}

/// RGB to CMY with a reduced black share, channel values in percent.
fn rgb_to_cmy(rgb: [u8; 3]) -> Cmy {
    let [r, g, b] = rgb.map(|c| f32::from(c) / 255.0);
    let k = (1.0 - r.max(g).max(b)) * 0.6;
    let (c, m, y) = if k < 1.0 {
        ((1.0 - r - k) / (1.0 - k), (1.0 - g - k) / (1.0 - k), (1.0 - b - k) / (1.0 - k))
    } else {
        (0.0, 0.0, 0.0)
    };
    Cmy {
        c: (c * 1.2).clamp(0.0, 1.0) * 100.0,
        m: (m * 1.2).clamp(0.0, 1.0) * 100.0,
        y: (y * 1.1).clamp(0.0, 1.0) * 100.0,
    }
}

impl CmyHalftone {
    fn cmy(&mut self, rgb: [u8; 3]) -> Cmy {
        let key = (quantize(rgb[0]), quantize(rgb[1]), quantize(rgb[2]));
        if let Some(hit) = self.lut.get(&key) {
            return *hit;
        }
        let value = rgb_to_cmy(rgb);
        if self.lut.len() < LUT_CAP {
            self.lut.insert(key, value);
        }
        value
    }

    fn grid_for(&mut self, width: u32, height: u32) -> DotGrid {
        match self.grid {
            Some(grid) if grid.display == (width, height) => grid,
            _ => {
                let grid = DotGrid::new(width, height);
                self.grid = Some(grid);
                grid
            }
        }
    }
}

impl FilterProgram for CmyHalftone {
    fn setup(&mut self, canvas: &mut Canvas) {
        canvas.clear(PAPER);
    }

    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        canvas.clear(PAPER);
        let grid = self.grid_for(canvas.width(), canvas.height());
        let sx = sample.width() as f32 / canvas.width() as f32;
        let sy = sample.height() as f32 / canvas.height() as f32;

        let mut dots = Vec::with_capacity((grid.cols * grid.rows) as usize);
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let src_x = ((col as f32 * grid.spacing + grid.spacing / 2.0) * sx).floor() as u32;
                let src_y = ((row as f32 * grid.spacing + grid.spacing / 2.0) * sy).floor() as u32;
                if src_x >= sample.width() || src_y >= sample.height() {
                    continue;
                }
                let cmy = self.cmy(sample.rgb(src_x, src_y));
                dots.push((
                    grid.start_x + col as f32 * grid.spacing,
                    grid.start_y + row as f32 * grid.spacing,
                    cmy,
                ));
            }
        }

        let third = DOT_OFFSET / 3.0;
        let half = DOT_OFFSET / 2.0;
        let channels: [([u8; 3], (f32, f32), fn(&Cmy) -> f32); 3] = [
            (YELLOW, (half, third), |v| v.y),
            (CYAN, (0.0, -third), |v| v.c),
            (MAGENTA, (-half, third), |v| v.m),
        ];
        for (ink, (ox, oy), pick) in channels {
            let [r, g, b] = ink;
            let paint = Paint::rgba(r, g, b, INK_ALPHA).multiply();
            for (x, y, cmy) in &dots {
                let size = MIN_DOT + pick(cmy) / 100.0 * (BASE_DOT - MIN_DOT);
                if size < 2.0 {
                    continue;
                }
                canvas.fill_circle(x + ox * size, y + oy * size, size, paint);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_is_inkless_and_black_is_saturated() {
        let white = rgb_to_cmy([255, 255, 255]);
        assert!(white.c.abs() < 1e-3 && white.m.abs() < 1e-3 && white.y.abs() < 1e-3);
        let black = rgb_to_cmy([0, 0, 0]);
        assert!((black.c - 100.0).abs() < 1e-3);
        assert!((black.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn lut_is_capped() {
        let mut filter = CmyHalftone::default();
        for r in 0..=255u8 {
            for g in (0..=255u8).step_by(5) {
                filter.cmy([r, g, 0]);
            }
        }
        assert!(filter.lut.len() <= LUT_CAP);
    }

    #[test]
    fn grid_is_rebuilt_only_on_size_change() {
        let mut filter = CmyHalftone::default();
        let first = filter.grid_for(560, 280);
        assert_eq!((first.cols, first.rows), (20, 10));
        assert_eq!(filter.grid_for(560, 280), first);
        assert_ne!(filter.grid_for(280, 140), first);
    }
}
