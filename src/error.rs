use thiserror::Error;

use crate::events::DeviceFaultKind;

/// Library error type for photobooth operations.
#[derive(Debug, Error)]
pub enum BoothError {
    /// Camera permission denied, device missing, or the stream could not be opened.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The stream stopped delivering frames after it had started.
    #[error("camera stream lost: {0}")]
    DeviceLost(String),

    /// A filter name that is not part of the built-in set.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    /// A registry index past the end of the configured filter list.
    #[error("filter index {index} out of range (registry holds {len})")]
    FilterIndex { index: usize, len: usize },

    /// The presenter (window or headless sink) failed to show a frame.
    #[error("presenter error: {0}")]
    Presenter(String),

    /// Crop/scale into the sample buffer failed.
    #[error("resize failed: {0}")]
    Resize(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Image decode/encode error.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl BoothError {
    /// Device-level failures are surfaced to the user once and never retried
    /// automatically. Everything else is logged and the tick goes on.
    #[must_use]
    pub const fn fault_kind(&self) -> Option<DeviceFaultKind> {
        match self {
            Self::DeviceUnavailable(_) => Some(DeviceFaultKind::Unavailable),
            Self::DeviceLost(_) => Some(DeviceFaultKind::Lost),
            _ => None,
        }
    }
}
