use std::collections::VecDeque;

use super::{FilterProgram, FrameContext};
use crate::processing::canvas::Canvas;
use crate::processing::sampler::SampleView;

const HISTORY: usize = 6;

/// Ghosting echo: the last few samples blended, newest weighted heaviest.
#[derive(Debug, Default)]
pub struct TimeEcho {
    dims: (u32, u32),
    history: VecDeque<Vec<u8>>,
    blended: Vec<u8>,
}

impl TimeEcho {
    fn remember(&mut self, sample: &SampleView<'_>) {
        let dims = (sample.width(), sample.height());
        if dims != self.dims {
            self.dims = dims;
            self.history.clear();
        }
        let len = 4 * dims.0 as usize * dims.1 as usize;
        let mut frame = if self.history.len() == HISTORY {
            self.history.pop_front().unwrap_or_default()
        } else {
            Vec::with_capacity(len)
        };
        frame.clear();
        frame.extend_from_slice(&sample.pixels()[..len]);
        self.history.push_back(frame);
    }

    fn blend(&mut self) {
        let len = self.history.back().map_or(0, Vec::len);
        self.blended.clear();
        self.blended.resize(len, 255);
        let total: u32 = (1..=self.history.len() as u32).sum();
        for (i, px) in self.blended.chunks_exact_mut(4).enumerate() {
            let mut acc = [0u32; 3];
            for (age, frame) in self.history.iter().enumerate() {
                let weight = age as u32 + 1;
                for c in 0..3 {
                    acc[c] += u32::from(frame[i * 4 + c]) * weight;
                }
            }
            for c in 0..3 {
                px[c] = ((acc[c] + total / 2) / total.max(1)) as u8;
            }
        }
    }
}

impl FilterProgram for TimeEcho {
    fn setup(&mut self, canvas: &mut Canvas) {
        canvas.clear([0, 0, 0]);
    }

    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, _ctx: &FrameContext) {
        self.remember(sample);
        self.blend();
        let view = SampleView::new(self.dims.0, self.dims.1, &self.blended);
        let dst = (0.0, 0.0, canvas.width() as f32, canvas.height() as f32);
        canvas.draw_region(&view, (0, 0, self.dims.0, self.dims.1), dst, false, 255);
    }
}
