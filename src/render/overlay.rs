//! Status layers drawn on the presented copy of the surface.
//!
//! The surface itself is never touched, so snapshots stay clean and
//! persisting filters keep their own trails.

use image::RgbaImage;

use crate::events::DeviceFaultKind;
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::font::{draw_text, draw_text_centered, text_size};

const INK: [u8; 3] = [255, 255, 255];
const ALERT: [u8; 3] = [235, 70, 60];
const BACKDROP: [u8; 3] = [16, 16, 16];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub loading: bool,
    /// Seconds left before the next shot.
    pub countdown: Option<u32>,
    /// `(taken, requested)` while a session runs.
    pub progress: Option<(u32, u32)>,
    pub flash: bool,
    pub error: Option<DeviceFaultKind>,
}

impl OverlayState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn text_scale(height: u32, rows: u32) -> u32 {
    (height / (rows * 7)).max(1)
}

/// Build the frame to present. Without a surface image a blank frame of
/// `fallback` size carries the overlay alone.
#[must_use]
pub fn compose(base: Option<&RgbaImage>, fallback: (u32, u32), state: &OverlayState, tick: u64) -> RgbaImage {
    let mut canvas = match base {
        Some(image) => Canvas::from_image(image.clone()),
        None => {
            let mut blank = Canvas::new(fallback.0.max(1), fallback.1.max(1));
            blank.clear(BACKDROP);
            blank
        }
    };
    if state.is_empty() {
        return canvas.into_image();
    }
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);

    if state.flash {
        canvas.clear([255, 255, 255]);
    }

    if state.loading && state.error.is_none() {
        let dots = ".".repeat((tick / 8 % 4) as usize);
        let scale = text_scale(canvas.height(), 12);
        let (tw, _) = text_size("LOADING...", scale);
        let x = (w - tw as f32) / 2.0;
        draw_text(&mut canvas, x, h / 2.0, &format!("LOADING{dots}"), scale, Paint::solid(INK));
    }

    if let Some(remaining) = state.countdown.filter(|_| !state.flash) {
        let scale = text_scale(canvas.height(), 3);
        let label = remaining.to_string();
        draw_text_centered(&mut canvas, w / 2.0 + 2.0, h / 2.0 + 2.0, &label, scale, Paint::rgba(0, 0, 0, 160));
        draw_text_centered(&mut canvas, w / 2.0, h / 2.0, &label, scale, Paint::solid(INK));
    }

    if let Some((taken, requested)) = state.progress {
        let scale = text_scale(canvas.height(), 20);
        let label = format!("{taken}/{requested}");
        let (tw, th) = text_size(&label, scale);
        let pad = scale as f32 * 3.0;
        let x = w - tw as f32 - pad;
        canvas.fill_rect(x - pad / 2.0, pad / 2.0, tw as f32 + pad, th as f32 + pad, Paint::rgba(0, 0, 0, 140));
        draw_text(&mut canvas, x, pad, &label, scale, Paint::solid(INK));
    }

    if let Some(kind) = state.error {
        canvas.veil(BACKDROP, 220);
        let scale = text_scale(canvas.height(), 14);
        draw_text_centered(&mut canvas, w / 2.0, h * 0.42, kind.headline(), scale, Paint::solid(ALERT));
        draw_text_centered(
            &mut canvas,
            w / 2.0,
            h * 0.58,
            "PRESS D TO DISMISS",
            (scale / 2).max(1),
            Paint::solid(INK),
        );
    }

    canvas.into_image()
}
