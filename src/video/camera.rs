//! Live webcam source through nokhwa.
//!
//! The nokhwa handle stays on a dedicated capture thread; decoded frames come
//! back over a one-slot channel so the render loop always sees the newest one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, TryRecvError, TrySendError};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};
use tracing::{debug, info, warn};

use super::{VideoFrame, VideoSource};
use crate::camera_cache::{CameraCapabilities, CapabilityCache};
use crate::config::CameraConfig;
use crate::error::BoothError;

/// Consecutive undecodable buffers tolerated before the stream counts as lost.
const MAX_DECODE_FAILURES: u32 = 15;

fn camera_index(device: Option<&str>) -> CameraIndex {
    match device {
        None => CameraIndex::Index(0),
        Some(id) => id
            .parse::<u32>()
            .map_or_else(|_| CameraIndex::String(id.to_owned()), CameraIndex::Index),
    }
}

/// Ask the device for its largest format without starting a stream.
pub fn probe(device: Option<&str>) -> Result<CameraCapabilities, BoothError> {
    let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
    let cam = Camera::new(camera_index(device), req)
        .map_err(|e| BoothError::DeviceUnavailable(format!("probe camera: {e}")))?;
    let max = cam.resolution();
    let fallback = CameraCapabilities::default();
    Ok(CameraCapabilities {
        max_width: max.width(),
        max_height: max.height(),
        min_width: fallback.min_width.min(max.width()),
        min_height: fallback.min_height.min(max.height()),
        current_width: max.width(),
        current_height: max.height(),
    })
}

fn open_stream(device: Option<&str>, width: u32, height: u32) -> Result<Camera, BoothError> {
    let fmt = CameraFormat::new(Resolution::new(width, height), FrameFormat::YUYV, 30);
    let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));
    let mut cam = Camera::new(camera_index(device), req)
        .map_err(|e| BoothError::DeviceUnavailable(format!("create camera: {e}")))?;
    cam.open_stream()
        .map_err(|e| BoothError::DeviceUnavailable(format!("open stream: {e}")))?;
    Ok(cam)
}

#[derive(Debug)]
enum GrabError {
    /// The device stopped delivering buffers.
    Stream(String),
    /// One buffer was corrupt; the stream itself is still alive.
    Decode(String),
}

fn grab(cam: &mut Camera) -> Result<VideoFrame, GrabError> {
    let frame = cam
        .frame()
        .map_err(|e| GrabError::Stream(format!("fetch frame: {e}")))?;
    let rgb = frame
        .decode_image::<RgbFormat>()
        .map_err(|e| GrabError::Decode(format!("decode frame: {e}")))?;
    let (width, height) = rgb.dimensions();
    let raw = rgb.into_raw();
    let mut pixels = Vec::with_capacity(raw.len() / 3 * 4);
    for px in raw.chunks_exact(3) {
        pixels.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    Ok(VideoFrame::new(width, height, pixels))
}

/// Counts undecodable buffers in a row.
#[derive(Debug, Default)]
struct DecodeStreak(u32);

impl DecodeStreak {
    /// What the render loop should see for one grab; `None` skips the buffer.
    fn settle(&mut self, grabbed: Result<VideoFrame, GrabError>) -> Option<Result<VideoFrame, BoothError>> {
        match grabbed {
            Ok(frame) => {
                self.0 = 0;
                Some(Ok(frame))
            }
            Err(GrabError::Stream(msg)) => Some(Err(BoothError::DeviceLost(msg))),
            Err(GrabError::Decode(msg)) => {
                self.0 += 1;
                if self.0 >= MAX_DECODE_FAILURES {
                    return Some(Err(BoothError::DeviceLost(format!(
                        "{} undecodable frames in a row, last: {msg}",
                        self.0
                    ))));
                }
                debug!(streak = self.0, "skipping undecodable frame: {msg}");
                None
            }
        }
    }
}

pub struct CameraSource {
    label: String,
    size: (u32, u32),
    latest: Option<VideoFrame>,
    frames: Receiver<Result<VideoFrame, BoothError>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CameraSource {
    /// Negotiate the device and start streaming. Resolves once the actual
    /// stream resolution is known.
    pub fn open(
        device: Option<&str>,
        cache: &CapabilityCache,
        camera: &CameraConfig,
    ) -> Result<Self, BoothError> {
        let caps = cache.get_or_probe(device, || probe(device));
        let (width, height) = match camera.resolution.resolve(&caps) {
            (0, _) | (_, 0) => (camera.width, camera.height),
            size => size,
        };

        let (meta_tx, meta_rx) = crossbeam_channel::bounded::<Result<(u32, u32), BoothError>>(1);
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let device_owned = device.map(str::to_owned);
        let stop_flag = Arc::clone(&stop);

        let worker = std::thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || {
                let mut cam = match open_stream(device_owned.as_deref(), width, height) {
                    Ok(cam) => cam,
                    Err(err) => {
                        let _ = meta_tx.send(Err(err));
                        return;
                    }
                };
                let actual = cam.resolution();
                if meta_tx.send(Ok((actual.width(), actual.height()))).is_err() {
                    return;
                }
                let mut streak = DecodeStreak::default();
                while !stop_flag.load(Ordering::Relaxed) {
                    let Some(settled) = streak.settle(grab(&mut cam)) else {
                        continue;
                    };
                    let failed = settled.is_err();
                    match frame_tx.try_send(settled) {
                        Ok(()) | Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                    if failed {
                        break;
                    }
                }
                if let Err(err) = cam.stop_stream() {
                    debug!(error = %err, "stop_stream failed");
                }
            })
            .map_err(BoothError::Io)?;

        let (actual_w, actual_h) = meta_rx
            .recv()
            .map_err(|_| BoothError::DeviceUnavailable("capture thread exited early".into()))??;
        let label = device.map_or_else(|| "camera".to_owned(), |d| format!("camera {d}"));
        info!(%label, width = actual_w, height = actual_h, "camera stream open");

        Ok(Self {
            label,
            size: (actual_w, actual_h),
            latest: None,
            frames: frame_rx,
            stop,
            worker: Some(worker),
        })
    }
}

impl VideoSource for CameraSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn frame(&mut self) -> Result<Option<&VideoFrame>, BoothError> {
        match self.frames.try_recv() {
            Ok(Ok(frame)) => {
                if (frame.width, frame.height) != self.size {
                    debug!(
                        width = frame.width,
                        height = frame.height,
                        "camera renegotiated resolution"
                    );
                    self.size = (frame.width, frame.height);
                }
                self.latest = Some(frame);
            }
            Ok(Err(err)) => return Err(err),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                return Err(BoothError::DeviceLost("capture thread stopped".into()));
            }
        }
        Ok(self.latest.as_ref())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(label = %self.label, "camera capture thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> VideoFrame {
        VideoFrame::solid(2, 2, [1, 2, 3, 255])
    }

    #[test]
    fn isolated_decode_failures_are_skipped() {
        let mut streak = DecodeStreak::default();
        assert!(streak.settle(Err(GrabError::Decode("bad jpeg".into()))).is_none());
        assert!(matches!(streak.settle(Ok(frame())), Some(Ok(_))));
        for _ in 0..MAX_DECODE_FAILURES - 1 {
            assert!(streak.settle(Err(GrabError::Decode("bad jpeg".into()))).is_none());
        }
        assert!(matches!(streak.settle(Ok(frame())), Some(Ok(_))));
    }

    #[test]
    fn repeated_decode_failures_lose_the_device() {
        let mut streak = DecodeStreak::default();
        let mut settled = None;
        for _ in 0..MAX_DECODE_FAILURES {
            settled = streak.settle(Err(GrabError::Decode("bad jpeg".into())));
        }
        assert!(matches!(settled, Some(Err(BoothError::DeviceLost(_)))));
    }

    #[test]
    fn stream_errors_escalate_at_once() {
        let mut streak = DecodeStreak::default();
        let settled = streak.settle(Err(GrabError::Stream("unplugged".into())));
        assert!(matches!(settled, Some(Err(BoothError::DeviceLost(_)))));
    }
}
