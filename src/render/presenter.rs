//! Where composed frames end up and where user input comes from.

use std::collections::VecDeque;

use image::RgbaImage;

use super::debounce::ContainerSize;
use crate::error::BoothError;
use crate::events::BoothCommand;

pub trait Presenter {
    /// Current size of the display container, if known.
    fn container_size(&self) -> Option<ContainerSize>;

    /// Input gathered since the last call.
    fn poll_input(&mut self) -> Vec<BoothCommand>;

    fn present(&mut self, frame: &RgbaImage) -> Result<(), BoothError>;

    fn is_open(&self) -> bool;
}

/// Presenter without a display: keeps the last frame and a scripted input queue.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    size: Option<ContainerSize>,
    input: VecDeque<BoothCommand>,
    last: Option<RgbaImage>,
    presented: u64,
    closed: bool,
}

impl HeadlessPresenter {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Some(ContainerSize::new(width, height)),
            ..Self::default()
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = Some(ContainerSize::new(width, height));
    }

    pub fn push_input(&mut self, command: BoothCommand) {
        self.input.push_back(command);
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<&RgbaImage> {
        self.last.as_ref()
    }

    #[must_use]
    pub const fn presented(&self) -> u64 {
        self.presented
    }
}

impl Presenter for HeadlessPresenter {
    fn container_size(&self) -> Option<ContainerSize> {
        self.size
    }

    fn poll_input(&mut self) -> Vec<BoothCommand> {
        self.input.drain(..).collect()
    }

    fn present(&mut self, frame: &RgbaImage) -> Result<(), BoothError> {
        self.presented += 1;
        match &mut self.last {
            Some(last) if last.dimensions() == frame.dimensions() => last.copy_from_slice(frame),
            slot => *slot = Some(frame.clone()),
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed
    }
}

/// Pack RGBA into a `0x00RRGGBB` buffer of `out_w × out_h`, centring the frame
/// and letterboxing the rest in black.
#[must_use]
pub fn letterbox(frame: &RgbaImage, out_w: usize, out_h: usize) -> Vec<u32> {
    let mut buf = vec![0u32; out_w * out_h];
    let (fw, fh) = (frame.width() as usize, frame.height() as usize);
    let ox = out_w.saturating_sub(fw) / 2;
    let oy = out_h.saturating_sub(fh) / 2;
    for (y, row) in frame.rows().enumerate().take(out_h.saturating_sub(oy)) {
        let line = &mut buf[(oy + y) * out_w..(oy + y + 1) * out_w];
        for (x, px) in row.enumerate().take(out_w.saturating_sub(ox)) {
            let [r, g, b, _] = px.0;
            line[ox + x] = (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
        }
    }
    buf
}

#[cfg(feature = "window")]
pub use window::WindowPresenter;

#[cfg(feature = "window")]
mod window {
    use image::RgbaImage;
    use minifb::{Key, KeyRepeat, Window, WindowOptions};
    use tracing::debug;

    use super::{Presenter, letterbox};
    use crate::config::WindowConfig;
    use crate::error::BoothError;
    use crate::events::BoothCommand;
    use crate::render::debounce::ContainerSize;

    pub struct WindowPresenter {
        window: Window,
        quit: bool,
    }

    impl WindowPresenter {
        pub fn open(cfg: &WindowConfig) -> Result<Self, BoothError> {
            let options = WindowOptions {
                resize: true,
                ..WindowOptions::default()
            };
            let window = Window::new(&cfg.title, cfg.width as usize, cfg.height as usize, options)
                .map_err(|e| BoothError::Presenter(e.to_string()))?;
            debug!(width = cfg.width, height = cfg.height, "window opened");
            Ok(Self { window, quit: false })
        }
    }

    impl Presenter for WindowPresenter {
        fn container_size(&self) -> Option<ContainerSize> {
            let (w, h) = self.window.get_size();
            Some(ContainerSize::new(w as f64, h as f64))
        }

        fn poll_input(&mut self) -> Vec<BoothCommand> {
            let mut commands = Vec::new();
            for key in self.window.get_keys_pressed(KeyRepeat::No) {
                let command = match key {
                    Key::Space | Key::Enter => BoothCommand::StartCapture,
                    Key::Escape => BoothCommand::CancelCapture,
                    Key::Right => BoothCommand::NextFilter,
                    Key::Left => BoothCommand::PreviousFilter,
                    Key::D => BoothCommand::DismissError,
                    Key::Q => {
                        self.quit = true;
                        BoothCommand::Shutdown
                    }
                    _ => continue,
                };
                commands.push(command);
            }
            commands
        }

        fn present(&mut self, frame: &RgbaImage) -> Result<(), BoothError> {
            let (w, h) = self.window.get_size();
            let (w, h) = (w.max(1), h.max(1));
            let buf = letterbox(frame, w, h);
            self.window
                .update_with_buffer(&buf, w, h)
                .map_err(|e| BoothError::Presenter(e.to_string()))
        }

        fn is_open(&self) -> bool {
            !self.quit && self.window.is_open()
        }
    }
}
