//! Video sources feeding the sampler.
//!
//! The booth only ever holds a `Box<dyn VideoSource>`; how the frames are
//! produced (synthetic pattern, still image, live camera) is opaque to the
//! pipeline. Opening a source may block on device negotiation, so it happens
//! on a worker thread through [`SourceSwitcher`].

#[cfg(feature = "camera")]
pub mod camera;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::camera_cache::CapabilityCache;
use crate::config::CameraConfig;
use crate::error::BoothError;

/// One decoded RGBA frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, pixels)
    }

    /// Nonzero dimensions and enough bytes to read every pixel.
    #[must_use]
    pub fn is_decodable(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() >= self.width as usize * self.height as usize * 4
    }
}

/// Read-only handle to a stream of frames.
pub trait VideoSource: Send {
    fn label(&self) -> &str;

    /// Latest frame, `Ok(None)` while the source is still warming up.
    ///
    /// Returning the same frame twice is allowed; the pipeline simply
    /// redraws it.
    fn frame(&mut self) -> Result<Option<&VideoFrame>, BoothError>;
}

/// Animated synthetic source used when no camera is available.
pub struct TestPattern {
    label: String,
    frame: VideoFrame,
    counter: u32,
    warmup: u32,
}

impl TestPattern {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            label: format!("pattern {width}x{height}"),
            frame: VideoFrame::new(width, height, vec![0; width as usize * height as usize * 4]),
            counter: 0,
            warmup: 0,
        }
    }

    /// Report not-ready for the first `frames` requests, like a camera whose
    /// metadata has not loaded yet.
    #[must_use]
    pub fn with_warmup(mut self, frames: u32) -> Self {
        self.warmup = frames;
        self
    }

    fn paint(&mut self) {
        let VideoFrame {
            width,
            height,
            pixels,
        } = &mut self.frame;
        let (w, h) = (*width as usize, *height as usize);
        let t = self.counter;
        let orbit_x = (w as f32 / 2.0) * (1.0 + 0.6 * (t as f32 * 0.05).cos());
        let orbit_y = (h as f32 / 2.0) * (1.0 + 0.6 * (t as f32 * 0.05).sin());
        let radius = (w.min(h) as f32 / 6.0).max(1.0);
        for (i, px) in pixels.chunks_exact_mut(4).enumerate() {
            let x = i % w;
            let y = i / w;
            let dx = x as f32 - orbit_x;
            let dy = y as f32 - orbit_y;
            let in_disc = dx * dx + dy * dy <= radius * radius;
            if in_disc {
                px.copy_from_slice(&[250, 240, 220, 255]);
            } else {
                let r = ((x * 255 / w.max(1)) as u32 + t) % 256;
                let g = (y * 255 / h.max(1)) as u32;
                px.copy_from_slice(&[r as u8, g as u8, 128, 255]);
            }
        }
    }
}

impl VideoSource for TestPattern {
    fn label(&self) -> &str {
        &self.label
    }

    fn frame(&mut self) -> Result<Option<&VideoFrame>, BoothError> {
        if self.warmup > 0 {
            self.warmup -= 1;
            return Ok(None);
        }
        self.paint();
        self.counter = self.counter.wrapping_add(1);
        Ok(Some(&self.frame))
    }
}

/// A single decoded image served as a never-changing stream.
pub struct StillImage {
    label: String,
    frame: VideoFrame,
}

impl StillImage {
    pub fn open(path: &Path) -> Result<Self, BoothError> {
        let decoded = image::open(path)
            .map_err(|err| BoothError::DeviceUnavailable(format!("{}: {err}", path.display())))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self {
            label: path.display().to_string(),
            frame: VideoFrame::new(width, height, decoded.into_raw()),
        })
    }

    #[must_use]
    pub fn from_frame(label: impl Into<String>, frame: VideoFrame) -> Self {
        Self {
            label: label.into(),
            frame,
        }
    }
}

impl VideoSource for StillImage {
    fn label(&self) -> &str {
        &self.label
    }

    fn frame(&mut self) -> Result<Option<&VideoFrame>, BoothError> {
        Ok(Some(&self.frame))
    }
}

/// Which source to open, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Pattern { width: u32, height: u32 },
    Image(PathBuf),
    Camera { device: Option<String> },
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self::Pattern {
            width: 1280,
            height: 720,
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern { width, height } => write!(f, "pattern:{width}x{height}"),
            Self::Image(path) => write!(f, "image:{}", path.display()),
            Self::Camera { device: None } => f.write_str("camera"),
            Self::Camera {
                device: Some(device),
            } => write!(f, "camera:{device}"),
        }
    }
}

impl FromStr for SourceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = match s.split_once(':') {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (s, None),
        };
        match (kind.trim().to_ascii_lowercase().as_str(), rest) {
            ("pattern", None) => Ok(Self::default()),
            ("pattern", Some(size)) => {
                let (w, h) = size
                    .split_once('x')
                    .ok_or_else(|| format!("expected pattern:WxH, got {s:?}"))?;
                let width = w.trim().parse().map_err(|_| format!("bad width in {s:?}"))?;
                let height = h.trim().parse().map_err(|_| format!("bad height in {s:?}"))?;
                if width == 0 || height == 0 {
                    return Err(format!("pattern size must be nonzero: {s:?}"));
                }
                Ok(Self::Pattern { width, height })
            }
            ("image", Some(path)) if !path.is_empty() => Ok(Self::Image(PathBuf::from(path))),
            ("camera", None) => Ok(Self::Camera { device: None }),
            ("camera", Some(device)) if !device.is_empty() => Ok(Self::Camera {
                device: Some(device.to_owned()),
            }),
            _ => Err(format!(
                "unrecognized source {s:?} (expected pattern, image:PATH or camera[:DEVICE])"
            )),
        }
    }
}

/// Open a source synchronously. Blocks during camera negotiation.
pub fn open_source(
    spec: &SourceSpec,
    cache: &CapabilityCache,
    camera: &CameraConfig,
) -> Result<Box<dyn VideoSource>, BoothError> {
    match spec {
        SourceSpec::Pattern { width, height } => Ok(Box::new(TestPattern::new(*width, *height))),
        SourceSpec::Image(path) => Ok(Box::new(StillImage::open(path)?)),
        #[cfg(feature = "camera")]
        SourceSpec::Camera { device } => {
            let source = camera::CameraSource::open(device.as_deref(), cache, camera)?;
            Ok(Box::new(source))
        }
        #[cfg(not(feature = "camera"))]
        SourceSpec::Camera { .. } => {
            let _ = (cache, camera);
            Err(BoothError::DeviceUnavailable(
                "this build has no camera support (enable the `camera` feature)".into(),
            ))
        }
    }
}

/// A finished open request.
pub struct SourceReady {
    pub spec: SourceSpec,
    pub result: Result<Box<dyn VideoSource>, BoothError>,
}

/// Opens sources off the render loop and hands them back without blocking.
///
/// Only the most recent request is delivered; results of superseded requests
/// are dropped when they arrive.
pub struct SourceSwitcher {
    cache: CapabilityCache,
    camera: CameraConfig,
    tx: Sender<(u64, SourceReady)>,
    rx: Receiver<(u64, SourceReady)>,
    latest: u64,
    in_flight: bool,
}

impl SourceSwitcher {
    #[must_use]
    pub fn new(cache: CapabilityCache, camera: CameraConfig) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            cache,
            camera,
            tx,
            rx,
            latest: 0,
            in_flight: false,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.in_flight
    }

    pub fn request(&mut self, spec: SourceSpec) {
        self.latest += 1;
        self.in_flight = true;
        let ticket = self.latest;
        let tx = self.tx.clone();
        let cache = self.cache.clone();
        let camera = self.camera.clone();
        info!(source = %spec, "opening video source");
        let spawned = std::thread::Builder::new()
            .name("source-open".into())
            .spawn(move || {
                let result = open_source(&spec, &cache, &camera);
                // receiver gone means the booth already shut down
                let _ = tx.send((ticket, SourceReady { spec, result }));
            });
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn source-open thread");
            self.in_flight = false;
        }
    }

    /// Non-blocking poll for the latest completed request.
    pub fn try_take(&mut self) -> Option<SourceReady> {
        let mut newest = None;
        loop {
            match self.rx.try_recv() {
                Ok((ticket, ready)) if ticket == self.latest => newest = Some(ready),
                Ok((ticket, ready)) => {
                    debug!(ticket, source = %ready.spec, "dropping superseded source");
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if newest.is_some() {
            self.in_flight = false;
        }
        newest
    }
}
