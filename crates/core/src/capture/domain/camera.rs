use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("cannot open camera {index}: {reason}")]
    OpenFailed { index: u32, reason: String },
    #[error("camera {index} reports invalid resolution {width}x{height}")]
    InvalidResolution { index: u32, width: u32, height: u32 },
    #[error("no camera backend compiled in; enable the camera-v4l2 feature or use a synthetic camera")]
    NoBackend,
}

/// An opened camera device, exclusively owned by one worker.
pub trait CameraGrabber: Send {
    fn dimensions(&self) -> (u32, u32);

    /// Human-readable identity, e.g. `Camera 0 (v4l2)`.
    fn describe(&self) -> String;

    /// Grabs the next frame. `Ok(None)` means no frame was ready yet; the
    /// caller retries after a short wait.
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;
}

/// Factory for camera handles, pluggable per platform/backend.
pub trait CameraOpener: Send {
    fn open(&self, index: u32) -> Result<Box<dyn CameraGrabber>, CameraError>;

    /// Indices in `0..=max_index` that currently open successfully. Handles
    /// are released immediately after the probe.
    fn probe(&self, max_index: u32) -> Vec<u32> {
        (0..=max_index)
            .filter(|&i| self.open(i).is_ok())
            .collect()
    }
}
