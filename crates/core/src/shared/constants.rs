use std::time::Duration;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Bounded wait for a worker thread to acknowledge a stop request,
/// roughly two detection-cycle periods at batch latency.
pub const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause between live grab retries when the camera has no frame ready.
pub const FRAME_RETRY_WAIT: Duration = Duration::from_millis(100);

/// Highest camera index probed when enumerating devices.
pub const MAX_CAMERA_PROBE_INDEX: u32 = 3;
