//! Built-in visual filters.
//!
//! Every filter reads the fixed-size sample and paints a display-sized
//! [`Canvas`]. Filters are a closed set: [`FilterKind`] names them and
//! [`Filter`] owns one activation's private state. State is never carried
//! from one activation to the next; selecting a filter always instantiates a
//! fresh value.

mod camera_view;
mod contour;
mod dot_grid;
mod fade_trail;
mod halftone;
mod hue_clusters;
mod quad_overlay;
mod signal_dots;
mod stripe_flip;
mod time_echo;
mod wave_lines;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::BoothError;
use crate::processing::canvas::Canvas;
use crate::processing::sampler::SampleView;

pub use camera_view::CameraView;
pub use contour::Contour;
pub use dot_grid::DotGrid;
pub use fade_trail::FadeTrail;
pub use halftone::CmyHalftone;
pub use hue_clusters::HueClusters;
pub use quad_overlay::QuadOverlay;
pub use signal_dots::SignalDots;
pub use stripe_flip::StripeFlip;
pub use time_echo::TimeEcho;
pub use wave_lines::WaveLines;

/// Per-tick inputs besides the pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Time since the filter was activated.
    pub elapsed: Duration,
}

/// Common shape of every filter implementation.
pub trait FilterProgram {
    /// Prepare a freshly created surface. Must not assume a sample size.
    fn setup(&mut self, _canvas: &mut Canvas) {}

    /// Paint the whole canvas from `sample`. Only called with complete samples.
    fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, ctx: &FrameContext);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    CmyHalftone,
    SignalDots,
    StripeFlip,
    HueClusters,
    QuadOverlay,
    WaveLines,
    Contour,
    DotGrid,
    FadeTrail,
    CameraView,
    TimeEcho,
}

impl FilterKind {
    pub const ALL: [Self; 11] = [
        Self::CmyHalftone,
        Self::SignalDots,
        Self::StripeFlip,
        Self::HueClusters,
        Self::QuadOverlay,
        Self::WaveLines,
        Self::Contour,
        Self::DotGrid,
        Self::FadeTrail,
        Self::CameraView,
        Self::TimeEcho,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CmyHalftone => "cmy-halftone",
            Self::SignalDots => "signal-dots",
            Self::StripeFlip => "stripe-flip",
            Self::HueClusters => "hue-clusters",
            Self::QuadOverlay => "quad-overlay",
            Self::WaveLines => "wave-lines",
            Self::Contour => "contour",
            Self::DotGrid => "dot-grid",
            Self::FadeTrail => "fade-trail",
            Self::CameraView => "camera-view",
            Self::TimeEcho => "time-echo",
        }
    }

    /// Fresh state for one activation.
    #[must_use]
    pub fn instantiate(self) -> Filter {
        match self {
            Self::CmyHalftone => Filter::CmyHalftone(CmyHalftone::default()),
            Self::SignalDots => Filter::SignalDots(SignalDots::default()),
            Self::StripeFlip => Filter::StripeFlip(StripeFlip),
            Self::HueClusters => Filter::HueClusters(HueClusters::default()),
            Self::QuadOverlay => Filter::QuadOverlay(QuadOverlay),
            Self::WaveLines => Filter::WaveLines(WaveLines),
            Self::Contour => Filter::Contour(Contour::default()),
            Self::DotGrid => Filter::DotGrid(DotGrid),
            Self::FadeTrail => Filter::FadeTrail(FadeTrail),
            Self::CameraView => Filter::CameraView(CameraView),
            Self::TimeEcho => Filter::TimeEcho(TimeEcho::default()),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| BoothError::UnknownFilter(s.to_owned()))
    }
}

/// Whether a draw call painted anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStatus {
    Drawn,
    /// Sample shorter than `4 * w * h`; nothing was read or painted.
    Skipped,
}

/// One active filter and its private state.
#[derive(Debug)]
pub enum Filter {
    CmyHalftone(CmyHalftone),
    SignalDots(SignalDots),
    StripeFlip(StripeFlip),
    HueClusters(HueClusters),
    QuadOverlay(QuadOverlay),
    WaveLines(WaveLines),
    Contour(Contour),
    DotGrid(DotGrid),
    FadeTrail(FadeTrail),
    CameraView(CameraView),
    TimeEcho(TimeEcho),
}

impl Filter {
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::CmyHalftone(_) => FilterKind::CmyHalftone,
            Self::SignalDots(_) => FilterKind::SignalDots,
            Self::StripeFlip(_) => FilterKind::StripeFlip,
            Self::HueClusters(_) => FilterKind::HueClusters,
            Self::QuadOverlay(_) => FilterKind::QuadOverlay,
            Self::WaveLines(_) => FilterKind::WaveLines,
            Self::Contour(_) => FilterKind::Contour,
            Self::DotGrid(_) => FilterKind::DotGrid,
            Self::FadeTrail(_) => FilterKind::FadeTrail,
            Self::CameraView(_) => FilterKind::CameraView,
            Self::TimeEcho(_) => FilterKind::TimeEcho,
        }
    }

    fn program(&mut self) -> &mut dyn FilterProgram {
        match self {
            Self::CmyHalftone(f) => f,
            Self::SignalDots(f) => f,
            Self::StripeFlip(f) => f,
            Self::HueClusters(f) => f,
            Self::QuadOverlay(f) => f,
            Self::WaveLines(f) => f,
            Self::Contour(f) => f,
            Self::DotGrid(f) => f,
            Self::FadeTrail(f) => f,
            Self::CameraView(f) => f,
            Self::TimeEcho(f) => f,
        }
    }

    pub fn setup(&mut self, canvas: &mut Canvas) {
        debug!(filter = %self.kind(), width = canvas.width(), height = canvas.height(), "filter setup");
        self.program().setup(canvas);
    }

    pub fn draw(&mut self, canvas: &mut Canvas, sample: &SampleView<'_>, ctx: &FrameContext) -> DrawStatus {
        if !sample.is_complete() || canvas.width() == 0 || canvas.height() == 0 {
            return DrawStatus::Skipped;
        }
        self.program().draw(canvas, sample, ctx);
        DrawStatus::Drawn
    }
}

/// Ordered, index-addressable list of filters with one active entry.
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    kinds: Vec<FilterKind>,
    active: usize,
}

impl FilterRegistry {
    pub fn new(kinds: Vec<FilterKind>, initial: usize) -> Result<Self, BoothError> {
        if initial >= kinds.len() {
            return Err(BoothError::FilterIndex {
                index: initial,
                len: kinds.len(),
            });
        }
        Ok(Self {
            kinds,
            active: initial,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    #[must_use]
    pub const fn active_index(&self) -> usize {
        self.active
    }

    #[must_use]
    pub fn active(&self) -> FilterKind {
        self.kinds[self.active]
    }

    pub fn select(&mut self, index: usize) -> Result<FilterKind, BoothError> {
        let kind = *self.kinds.get(index).ok_or(BoothError::FilterIndex {
            index,
            len: self.kinds.len(),
        })?;
        self.active = index;
        Ok(kind)
    }

    /// Select by registry index (`"3"`) or kebab-case name.
    pub fn select_named(&mut self, name: &str) -> Result<FilterKind, BoothError> {
        if let Ok(index) = name.trim().parse::<usize>() {
            return self.select(index);
        }
        let kind: FilterKind = name.parse()?;
        let index = self
            .kinds
            .iter()
            .position(|k| *k == kind)
            .ok_or_else(|| BoothError::UnknownFilter(name.to_owned()))?;
        self.select(index)
    }

    pub fn next(&mut self) -> FilterKind {
        self.active = (self.active + 1) % self.kinds.len();
        self.active()
    }

    pub fn previous(&mut self) -> FilterKind {
        self.active = (self.active + self.kinds.len() - 1) % self.kinds.len();
        self.active()
    }
}
