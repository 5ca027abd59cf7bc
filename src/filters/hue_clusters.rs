use std::collections::HashMap;

use palette::{FromColor, Hsv, Srgb};

use super::{FilterProgram, FrameContext};
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::sampler::SampleView;

const CELL: u32 = 8;
const CLUSTERS: usize = 160;
const PALETTE_SAMPLES: usize = 600;
const CACHE_CAP: usize = 1000;
/// Chroma below this keeps hue at zero.
const MIN_CHROMA: u8 = 10;
const BACKGROUND: [u8; 3] = [20, 20, 20];

/// Posterised blocks snapped to a palette of hue buckets.
///
/// The palette is learned from the first frame that has usable colours and
/// kept for the rest of the activation.
#[derive(Debug, Default)]
pub struct HueClusters {
    palette: Vec<[u8; 3]>,
    nearest: HashMap<(u8, u8, u8), [u8; 3]>,
}

fn hue_degrees(rgb: [u8; 3]) -> f32 {
    let max = rgb.iter().max().copied().unwrap_or(0);
    let min = rgb.iter().min().copied().unwrap_or(0);
    if max - min <= MIN_CHROMA {
        return 0.0;
    }
    let hsv = Hsv::from_color(Srgb::new(rgb[0], rgb[1], rgb[2]).into_format::<f32>());
    hsv.hue.into_positive_degrees()
}

/// Average colour of each non-empty hue bucket, bucket order.
fn build_palette(sample: &SampleView<'_>) -> Vec<[u8; 3]> {
    let total = (sample.width() * sample.height()) as usize;
    let step = (total / PALETTE_SAMPLES).max(1);
    let mut sums = vec![([0u64; 3], 0u64); CLUSTERS];
    let bucket = 360.0 / CLUSTERS as f32;
    for i in (0..total).step_by(step) {
        let x = (i % sample.width() as usize) as u32;
        let y = (i / sample.width() as usize) as u32;
        let rgb = sample.rgb(x, y);
        let sum: u32 = rgb.iter().map(|&c| u32::from(c)).sum();
        if !(91..675).contains(&sum) {
            continue;
        }
        let idx = ((hue_degrees(rgb) / bucket).floor() as usize).min(CLUSTERS - 1);
        let (acc, count) = &mut sums[idx];
        for c in 0..3 {
            acc[c] += u64::from(rgb[c]);
        }
        *count += 1;
    }
    sums.into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(acc, count)| acc.map(|v| ((v as f64) / count as f64).round() as u8))
        .collect()
}

fn manhattan(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b)
        .map(|(&x, y)| u32::from(x.abs_diff(y)))
        .sum()
}

impl HueClusters {
    fn snap(&mut self, rgb: [u8; 3]) -> [u8; 3] {
        if self.palette.is_empty() {
            return rgb;
        }
        let key = (rgb[0] / 8, rgb[1] / 8, rgb[2] / 8);
        if let Some(hit) = self.nearest.get(&key) {
            return *hit;
        }
        let checked = self.palette.len().min((CLUSTERS / 2).max(8));
        let best = self.palette[..checked]
            .iter()
            .copied()
            .min_by_key(|candidate| manhattan(rgb, *candidate))
            .unwrap_or(rgb);
        if self.nearest.len() < CACHE_CAP {
            self.nearest.insert(key, best);
        }
        best
    }
}

impl FilterProgram for HueClusters {
    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        canvas.clear(BACKGROUND);
        if self.palette.is_empty() {
            self.palette = build_palette(sample);
            self.nearest.clear();
        }
        let sx = sample.width() as f32 / canvas.width() as f32;
        let sy = sample.height() as f32 / canvas.height() as f32;
        for y in (0..canvas.height()).step_by(CELL as usize) {
            for x in (0..canvas.width()).step_by(CELL as usize) {
                let src_x = (x as f32 * sx).floor() as u32;
                let src_y = (y as f32 * sy).floor() as u32;
                if src_x >= sample.width() || src_y >= sample.height() {
                    continue;
                }
                let color = self.snap(sample.rgb(src_x, src_y));
                canvas.fill_rect(x as f32, y as f32, CELL as f32, CELL as f32, Paint::solid(color));
            }
        }
    }
}
