//! Printable strip built from the snapshots of one session.
//!
//! Shots are stacked in a single column with the session date underneath.
//! The column is repeated `copies` times across the sheet so one print can be
//! cut into identical strips.

use chrono::NaiveDate;
use image::{Rgba, RgbaImage, imageops};

use crate::config::StripConfig;
use crate::geometry::center_offset;
use crate::processing::canvas::{Canvas, Paint};
use crate::processing::font;

/// Pixel geometry of one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub shots: u32,
    pub copies: u32,
    pub slot_w: u32,
    pub slot_h: u32,
    pub margin: u32,
    pub gap: u32,
    pub footer: u32,
}

impl StripLayout {
    #[must_use]
    pub fn new(cfg: &StripConfig, shots: u32, ratio: f64) -> Self {
        let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.5 };
        let slot_h = (f64::from(cfg.slot_width) / ratio).round().max(1.0) as u32;
        Self {
            shots,
            copies: cfg.copies.max(1),
            slot_w: cfg.slot_width,
            slot_h,
            margin: cfg.margin_px,
            gap: cfg.gap_px,
            footer: cfg.footer_px,
        }
    }

    #[must_use]
    pub const fn strip_width(&self) -> u32 {
        self.slot_w + 2 * self.margin
    }

    #[must_use]
    pub fn strip_height(&self) -> u32 {
        let gaps = self.shots.saturating_sub(1) * self.gap;
        self.margin + self.shots * self.slot_h + gaps + self.footer
    }

    #[must_use]
    pub fn sheet_size(&self) -> (u32, u32) {
        (self.copies * self.strip_width(), self.strip_height())
    }

    /// Top-left corner of shot `index` in strip `copy`.
    #[must_use]
    pub const fn slot_origin(&self, copy: u32, index: u32) -> (u32, u32) {
        (
            copy * self.strip_width() + self.margin,
            self.margin + index * (self.slot_h + self.gap),
        )
    }

    /// Centre of the footer band of strip `copy`.
    #[must_use]
    pub fn footer_center(&self, copy: u32) -> (u32, u32) {
        (
            copy * self.strip_width() + self.strip_width() / 2,
            self.strip_height() - self.footer / 2,
        )
    }
}

/// `YYYY.MM.DD`
#[must_use]
pub fn footer_date(date: NaiveDate) -> String {
    date.format("%Y.%m.%d").to_string()
}

/// Fit `shot` into the slot without distortion, letterboxing on the background.
fn fit_to_slot(shot: &RgbaImage, layout: &StripLayout, background: Rgba<u8>) -> RgbaImage {
    let (sw, sh) = (shot.width().max(1), shot.height().max(1));
    let scale = (f64::from(layout.slot_w) / f64::from(sw)).min(f64::from(layout.slot_h) / f64::from(sh));
    let w = ((f64::from(sw) * scale).round() as u32).clamp(1, layout.slot_w);
    let h = ((f64::from(sh) * scale).round() as u32).clamp(1, layout.slot_h);
    let resized = imageops::resize(shot, w, h, imageops::FilterType::Triangle);
    if (w, h) == (layout.slot_w, layout.slot_h) {
        return resized;
    }
    let mut slot = RgbaImage::from_pixel(layout.slot_w, layout.slot_h, background);
    let (ox, oy) = center_offset(w, h, layout.slot_w, layout.slot_h);
    imageops::overlay(&mut slot, &resized, i64::from(ox), i64::from(oy));
    slot
}

/// Compose `shots` (in capture order) onto one sheet.
#[must_use]
pub fn compose_strip(shots: &[RgbaImage], cfg: &StripConfig, ratio: f64, date: NaiveDate) -> RgbaImage {
    let layout = StripLayout::new(cfg, shots.len() as u32, ratio);
    let (w, h) = layout.sheet_size();
    let [r, g, b] = cfg.background;
    let background = Rgba([r, g, b, 255]);
    let mut sheet = RgbaImage::from_pixel(w.max(1), h.max(1), background);

    let slots: Vec<RgbaImage> = shots
        .iter()
        .map(|shot| fit_to_slot(shot, &layout, background))
        .collect();
    for copy in 0..layout.copies {
        for (index, slot) in slots.iter().enumerate() {
            let (x, y) = layout.slot_origin(copy, index as u32);
            imageops::overlay(&mut sheet, slot, i64::from(x), i64::from(y));
        }
    }

    let text = footer_date(date);
    let scale = (layout.footer / 4 / font::GLYPH_H).max(1);
    let mut canvas = Canvas::from_image(sheet);
    if layout.footer > 0 {
        for copy in 0..layout.copies {
            let (cx, cy) = layout.footer_center(copy);
            font::draw_text_centered(
                &mut canvas,
                cx as f32,
                cy as f32,
                &text,
                scale,
                Paint::solid(cfg.ink),
            );
        }
    }
    canvas.into_image()
}
