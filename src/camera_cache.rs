//! Device capability cache.
//!
//! One instance is created at startup and handed to whoever opens sources.
//! Clones share the same entries, so the cache can travel to the thread that
//! negotiates a device and still be cleared from the booth loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use tracing::{debug, info, warn};

/// Resolution bounds reported by a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraCapabilities {
    pub max_width: u32,
    pub max_height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub current_width: u32,
    pub current_height: u32,
}

impl Default for CameraCapabilities {
    /// Used when probing a device fails.
    fn default() -> Self {
        Self {
            max_width: 1280,
            max_height: 720,
            min_width: 320,
            min_height: 240,
            current_width: 640,
            current_height: 480,
        }
    }
}

/// Preview streams use 60% of the device maximum.
#[must_use]
pub fn preview_resolution(caps: &CameraCapabilities) -> (u32, u32) {
    let w = (f64::from(caps.max_width) * 0.6).floor() as u32;
    let h = (f64::from(caps.max_height) * 0.6).floor() as u32;
    (w.min(caps.max_width).max(1), h.min(caps.max_height).max(1))
}

/// Full-screen capture asks for the device maximum.
#[must_use]
pub const fn full_screen_resolution(caps: &CameraCapabilities) -> (u32, u32) {
    (caps.max_width, caps.max_height)
}

/// Which stream size to request from a probed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPolicy {
    Preview,
    #[default]
    FullScreen,
}

impl ResolutionPolicy {
    #[must_use]
    pub fn resolve(self, caps: &CameraCapabilities) -> (u32, u32) {
        match self {
            Self::Preview => preview_resolution(caps),
            Self::FullScreen => full_screen_resolution(caps),
        }
    }
}

const DEFAULT_DEVICE_KEY: &str = "<default>";

#[derive(Debug, Clone, Default)]
pub struct CapabilityCache {
    entries: Arc<Mutex<HashMap<String, CameraCapabilities>>>,
}

impl CapabilityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(device: Option<&str>) -> String {
        device.unwrap_or(DEFAULT_DEVICE_KEY).to_owned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CameraCapabilities>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn get(&self, device: Option<&str>) -> Option<CameraCapabilities> {
        self.lock().get(&Self::key(device)).copied()
    }

    pub fn insert(&self, device: Option<&str>, caps: CameraCapabilities) {
        self.lock().insert(Self::key(device), caps);
    }

    /// Return cached capabilities or run `probe` once and remember the result.
    ///
    /// A failing probe yields [`CameraCapabilities::default`], which is not cached
    /// so the next request probes again.
    pub fn get_or_probe<F, E>(&self, device: Option<&str>, probe: F) -> CameraCapabilities
    where
        F: FnOnce() -> Result<CameraCapabilities, E>,
        E: std::fmt::Display,
    {
        if let Some(caps) = self.get(device) {
            debug!(device = %Self::key(device), "using cached camera capabilities");
            return caps;
        }
        match probe() {
            Ok(caps) => {
                info!(
                    device = %Self::key(device),
                    max = %format_args!("{}x{}", caps.max_width, caps.max_height),
                    current = %format_args!("{}x{}", caps.current_width, caps.current_height),
                    "camera capabilities cached"
                );
                self.insert(device, caps);
                caps
            }
            Err(err) => {
                warn!(device = %Self::key(device), error = %err, "capability probe failed; using fallback");
                CameraCapabilities::default()
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
        info!("camera capability cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(w: u32, h: u32) -> CameraCapabilities {
        CameraCapabilities {
            max_width: w,
            max_height: h,
            current_width: w,
            current_height: h,
            ..CameraCapabilities::default()
        }
    }

    #[test]
    fn probes_once_per_device() {
        let cache = CapabilityCache::new();
        let mut calls = 0;
        let first = cache.get_or_probe(Some("cam0"), || {
            calls += 1;
            Ok::<_, String>(caps(1920, 1080))
        });
        let second = cache.get_or_probe(Some("cam0"), || {
            calls += 1;
            Ok::<_, String>(caps(640, 480))
        });
        assert_eq!(calls, 1);
        assert_eq!(first, second);
        assert_eq!(full_screen_resolution(&second), (1920, 1080));
    }

    #[test]
    fn failed_probe_falls_back_without_caching() {
        let cache = CapabilityCache::new();
        let got = cache.get_or_probe(None, || Err::<CameraCapabilities, _>("denied"));
        assert_eq!(got, CameraCapabilities::default());
        assert!(cache.is_empty());
    }

    #[test]
    fn clones_share_entries_and_clear() {
        let cache = CapabilityCache::new();
        let handle = cache.clone();
        handle.insert(None, caps(1280, 720));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(handle.get(None).is_none());
    }

    #[test]
    fn policy_picks_preview_or_maximum() {
        let hd = caps(1920, 1080);
        assert_eq!(ResolutionPolicy::Preview.resolve(&hd), (1152, 648));
        assert_eq!(ResolutionPolicy::FullScreen.resolve(&hd), (1920, 1080));
        assert_eq!(ResolutionPolicy::default(), ResolutionPolicy::FullScreen);
    }
}
