use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::camera_cache::ResolutionPolicy;
use crate::capture::CaptureSettings;
use crate::filters::FilterKind;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Fixed sampling resolution every filter reads.
    pub sample_width: u32,
    pub sample_height: u32,
    /// Ratio all captured and displayed imagery conforms to (width / height).
    pub target_aspect_ratio: f64,
    /// Shots taken per capture session.
    pub shots_per_session: u32,
    /// Countdown before each shot, in whole seconds.
    pub countdown_seconds: u32,
    /// White pulse shown before each snapshot.
    #[serde(with = "humantime_serde")]
    pub flash_duration: Duration,
    /// Container resizes settle for this long before the surface is rebuilt.
    #[serde(with = "humantime_serde")]
    pub resize_debounce: Duration,
    /// Size changes at or below this many pixels are ignored.
    pub resize_tolerance_px: f64,
    /// Render tick period.
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
    /// Mirror the sample horizontally (selfie view).
    pub mirror: bool,
    /// Ordered filter registry.
    pub filters: Vec<FilterKind>,
    /// Registry index active at startup.
    pub initial_filter: usize,
    /// Where finished sessions are written.
    pub output_dir: PathBuf,
    pub camera: CameraConfig,
    pub window: WindowConfig,
    pub strip: StripConfig,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.sample_width > 0 && self.sample_height > 0,
            "sample-width and sample-height must be greater than zero"
        );
        ensure!(
            self.target_aspect_ratio.is_finite() && self.target_aspect_ratio > 0.0,
            "target-aspect-ratio must be a positive number"
        );
        let sample_ratio = f64::from(self.sample_width) / f64::from(self.sample_height);
        ensure!(
            (sample_ratio / self.target_aspect_ratio - 1.0).abs() <= 0.01,
            "sample size {}x{} does not match target-aspect-ratio {}",
            self.sample_width,
            self.sample_height,
            self.target_aspect_ratio
        );
        ensure!(
            self.shots_per_session > 0,
            "shots-per-session must be greater than zero"
        );
        ensure!(
            self.countdown_seconds > 0,
            "countdown-seconds must be greater than zero"
        );
        ensure!(
            self.frame_interval > Duration::ZERO,
            "frame-interval must be positive"
        );
        ensure!(
            self.resize_tolerance_px.is_finite() && self.resize_tolerance_px >= 0.0,
            "resize-tolerance-px must be zero or positive"
        );
        ensure!(!self.filters.is_empty(), "filters must list at least one filter");
        ensure!(
            self.initial_filter < self.filters.len(),
            "initial-filter {} is out of range for {} filters",
            self.initial_filter,
            self.filters.len()
        );
        self.strip.validate().context("invalid strip configuration")?;
        self.window.validate().context("invalid window configuration")?;
        Ok(self)
    }

    #[must_use]
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            shots: self.shots_per_session,
            countdown_seconds: self.countdown_seconds,
            flash: self.flash_duration,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            sample_width: 360,
            sample_height: 240,
            target_aspect_ratio: 1.5,
            shots_per_session: 4,
            countdown_seconds: 10,
            flash_duration: Duration::from_millis(200),
            resize_debounce: Duration::from_millis(150),
            resize_tolerance_px: 2.0,
            frame_interval: Duration::from_millis(33),
            mirror: true,
            filters: FilterKind::ALL.to_vec(),
            initial_filter: 0,
            output_dir: PathBuf::from("captures"),
            camera: CameraConfig::default(),
            window: WindowConfig::default(),
            strip: StripConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Device index or name; `None` picks the system default.
    pub device: Option<String>,
    /// `preview` streams at 60% of the device maximum, `full-screen` at the maximum.
    pub resolution: ResolutionPolicy,
    /// Requested resolution when the device cannot be probed.
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            resolution: ResolutionPolicy::FullScreen,
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl WindowConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "window.width and window.height must be greater than zero"
        );
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "photobooth".into(),
            width: 1280,
            height: 800,
        }
    }
}

/// Printable strip layout.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct StripConfig {
    /// Identical strips placed side by side on one sheet.
    pub copies: u32,
    /// Width of one shot slot; slot height follows the target ratio.
    pub slot_width: u32,
    pub margin_px: u32,
    pub gap_px: u32,
    /// Band under the shots carrying the session date.
    pub footer_px: u32,
    pub background: [u8; 3],
    pub ink: [u8; 3],
}

impl StripConfig {
    const fn default_background() -> [u8; 3] {
        [255, 255, 255]
    }

    const fn default_ink() -> [u8; 3] {
        [30, 30, 30]
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.copies >= 1, "strip.copies must be at least 1");
        ensure!(self.slot_width > 0, "strip.slot-width must be greater than zero");
        Ok(())
    }
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            copies: 2,
            slot_width: 360,
            margin_px: 20,
            gap_px: 12,
            footer_px: 120,
            background: Self::default_background(),
            ink: Self::default_ink(),
        }
    }
}
