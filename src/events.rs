use chrono::{DateTime, Local};
use image::RgbaImage;

use crate::capture::SessionEvent;
use crate::filters::FilterKind;
use crate::video::SourceSpec;

/// Requests into the booth loop (keyboard, CLI automation, tests).
#[derive(Debug, Clone, PartialEq)]
pub enum BoothCommand {
    StartCapture,
    CancelCapture,
    SelectFilter(usize),
    SelectFilterNamed(String),
    NextFilter,
    PreviousFilter,
    /// Container size changed to `(width, height)` layout pixels.
    ContainerResized(f64, f64),
    OpenSource(SourceSpec),
    DismissError,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFaultKind {
    Unavailable,
    Lost,
}

impl DeviceFaultKind {
    #[must_use]
    pub const fn headline(self) -> &'static str {
        match self {
            Self::Unavailable => "CAMERA UNAVAILABLE",
            Self::Lost => "CAMERA LOST",
        }
    }
}

/// Notifications out of the booth loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoothEvent {
    /// Surface readiness flipped.
    Ready(bool),
    FilterSelected { index: usize, kind: FilterKind },
    SourceOpened { label: String },
    Session(SessionEvent),
    DeviceFault { kind: DeviceFaultKind, message: String },
}

/// Ordered snapshots of a finished session, handed to persistence.
#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub started_at: DateTime<Local>,
    pub filter: FilterKind,
    pub shots: Vec<RgbaImage>,
}
