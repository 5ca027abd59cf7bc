//! Fixed-resolution sampling of live frames.
//!
//! Each tick the current video frame is cropped to the target ratio, scaled
//! into one reused RGBA buffer and mirrored for the selfie view. Filters only
//! ever read that buffer.

use fast_image_resize as fir;
use tracing::{debug, trace};

use crate::error::BoothError;
use crate::geometry::{CropRect, crop_rect};
use crate::processing::color::luminance;
use crate::video::VideoFrame;

/// Borrowed RGBA pixels of a sample. Invalidated by the next `sample()`.
#[derive(Debug, Clone, Copy)]
pub struct SampleView<'a> {
    width: u32,
    height: u32,
    pixels: &'a [u8],
}

impl<'a> SampleView<'a> {
    #[must_use]
    pub const fn new(width: u32, height: u32, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    /// Holds at least `4 * width * height` bytes.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() >= 4 * self.width as usize * self.height as usize
    }

    #[inline]
    #[must_use]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let i = 4 * (y as usize * self.width as usize + x as usize);
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    #[inline]
    #[must_use]
    pub fn luma(&self, x: u32, y: u32) -> f32 {
        luminance(self.rgb(x, y))
    }
}

/// Why a tick produced no sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReady {
    /// Source reported zero width or height.
    NoDimensions,
    /// Frame bytes do not cover the reported dimensions yet.
    Undecodable,
}

#[derive(Debug)]
pub enum SampleOutcome<'a> {
    Ready(SampleView<'a>),
    NotReady(NotReady),
}

impl SampleOutcome<'_> {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Backing storage for one pipeline instance. Dimensions are fixed at creation.
pub struct SampleBuffer {
    image: fir::images::Image<'static>,
    filled: bool,
}

impl SampleBuffer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            image: fir::images::Image::new(width, height, fir::PixelType::U8x4),
            filled: false,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    fn view(&self) -> SampleView<'_> {
        SampleView::new(self.width(), self.height(), self.image.buffer())
    }
}

pub struct PixelSampler {
    buffer: SampleBuffer,
    ratio: f64,
    mirror: bool,
    crop: Option<((u32, u32), CropRect)>,
    resizer: fir::Resizer,
}

impl PixelSampler {
    /// Zero dimensions are clamped to one pixel.
    #[must_use]
    pub fn new(width: u32, height: u32, ratio: f64, mirror: bool) -> Self {
        Self {
            buffer: SampleBuffer::new(width.max(1), height.max(1)),
            ratio,
            mirror,
            crop: None,
            resizer: fir::Resizer::new(),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.buffer.width(), self.buffer.height())
    }

    #[must_use]
    pub const fn mirror(&self) -> bool {
        self.mirror
    }

    /// Crop used for the last sampled frame size.
    #[must_use]
    pub fn current_crop(&self) -> Option<CropRect> {
        self.crop.map(|(_, rect)| rect)
    }

    /// Previous successful sample, if any.
    #[must_use]
    pub fn last(&self) -> Option<SampleView<'_>> {
        self.buffer.filled.then(|| self.buffer.view())
    }

    fn crop_for(&mut self, width: u32, height: u32) -> Option<CropRect> {
        match self.crop {
            Some((dims, rect)) if dims == (width, height) => Some(rect),
            _ => {
                let rect = crop_rect(width, height, self.ratio)?;
                debug!(
                    src_w = width,
                    src_h = height,
                    sx = rect.sx,
                    sy = rect.sy,
                    sw = rect.sw,
                    sh = rect.sh,
                    "recomputed sample crop"
                );
                self.crop = Some(((width, height), rect));
                Some(rect)
            }
        }
    }

    /// Crop, scale and mirror `frame` into the sample buffer.
    ///
    /// Frames that cannot be read leave the previous contents untouched and
    /// report [`SampleOutcome::NotReady`].
    pub fn sample(&mut self, frame: &VideoFrame) -> Result<SampleOutcome<'_>, BoothError> {
        if frame.width == 0 || frame.height == 0 {
            trace!("sample skipped: source has no dimensions");
            return Ok(SampleOutcome::NotReady(NotReady::NoDimensions));
        }
        if !frame.is_decodable() {
            trace!(
                len = frame.pixels.len(),
                width = frame.width,
                height = frame.height,
                "sample skipped: frame not decodable"
            );
            return Ok(SampleOutcome::NotReady(NotReady::Undecodable));
        }
        let Some(rect) = self.crop_for(frame.width, frame.height) else {
            return Ok(SampleOutcome::NotReady(NotReady::NoDimensions));
        };

        let expected = frame.width as usize * frame.height as usize * 4;
        let src = fir::images::ImageRef::new(
            frame.width,
            frame.height,
            &frame.pixels[..expected],
            fir::PixelType::U8x4,
        )
        .map_err(|e| BoothError::Resize(e.to_string()))?;
        let options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear))
            .crop(rect.sx, rect.sy, rect.sw, rect.sh);
        self.resizer
            .resize(&src, &mut self.buffer.image, Some(&options))
            .map_err(|e| BoothError::Resize(e.to_string()))?;

        if self.mirror {
            let row_bytes = self.buffer.width() as usize * 4;
            for row in self.buffer.image.buffer_mut().chunks_exact_mut(row_bytes) {
                bytemuck::cast_slice_mut::<u8, [u8; 4]>(row).reverse();
            }
        }
        self.buffer.filled = true;
        Ok(SampleOutcome::Ready(self.buffer.view()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_frame(width: u32, height: u32) -> VideoFrame {
        // left half red, right half blue
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _y in 0..height {
            for x in 0..width {
                if x < width / 2 {
                    pixels.extend_from_slice(&[255, 0, 0, 255]);
                } else {
                    pixels.extend_from_slice(&[0, 0, 255, 255]);
                }
            }
        }
        VideoFrame::new(width, height, pixels)
    }

    #[test]
    fn mirrored_sample_swaps_sides() {
        let mut sampler = PixelSampler::new(12, 8, 1.5, true);
        let SampleOutcome::Ready(view) = sampler.sample(&split_frame(120, 80)).unwrap() else {
            panic!("expected a sample");
        };
        assert_eq!(view.rgb(0, 4), [0, 0, 255]);
        assert_eq!(view.rgb(11, 4), [255, 0, 0]);
    }

    #[test]
    fn unmirrored_sample_keeps_sides() {
        let mut sampler = PixelSampler::new(12, 8, 1.5, false);
        let SampleOutcome::Ready(view) = sampler.sample(&split_frame(120, 80)).unwrap() else {
            panic!("expected a sample");
        };
        assert_eq!(view.rgb(0, 4), [255, 0, 0]);
        assert!(view.is_complete());
    }

    #[test]
    fn zero_sized_frame_keeps_previous_buffer() {
        let mut sampler = PixelSampler::new(6, 4, 1.5, false);
        assert!(sampler.last().is_none());
        let solid = VideoFrame::solid(60, 40, [10, 200, 30, 255]);
        assert!(sampler.sample(&solid).unwrap().is_ready());
        let before = sampler.last().unwrap().pixels().to_vec();

        let outcome = sampler.sample(&VideoFrame::new(0, 0, Vec::new())).unwrap();
        assert!(matches!(outcome, SampleOutcome::NotReady(NotReady::NoDimensions)));
        let short = VideoFrame::new(60, 40, vec![0; 16]);
        let outcome = sampler.sample(&short).unwrap();
        assert!(matches!(outcome, SampleOutcome::NotReady(NotReady::Undecodable)));

        assert_eq!(sampler.last().unwrap().pixels(), before.as_slice());
    }

    #[test]
    fn crop_is_cached_per_source_size() {
        let mut sampler = PixelSampler::new(6, 4, 1.5, false);
        sampler.sample(&VideoFrame::solid(1920, 1080, [0, 0, 0, 255])).unwrap();
        let wide = sampler.current_crop().unwrap();
        assert!((wide.sw - 1620.0).abs() < 1e-9);
        sampler.sample(&VideoFrame::solid(720, 1280, [0, 0, 0, 255])).unwrap();
        let tall = sampler.current_crop().unwrap();
        assert!((tall.sy - 400.0).abs() < 1e-9);
    }
}
