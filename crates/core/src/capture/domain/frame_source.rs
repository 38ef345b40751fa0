use std::time::{SystemTime, UNIX_EPOCH};

use crate::shared::frame::Frame;

/// Where a frame came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provenance {
    Live {
        camera_index: u32,
    },
    File {
        filename: String,
        width: u32,
        height: u32,
    },
}

/// One frame plus its provenance and acquisition timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedFrame {
    pub frame: Frame,
    pub provenance: Provenance,
    pub unix_secs: u64,
}

/// Static description of an opened source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub descriptor: String,
    /// Fixed frame dimensions for live sources; `None` for batch sources
    /// whose files vary per frame.
    pub dimensions: Option<(u32, u32)>,
    /// Known frame count for batch sources; `None` for unbounded ones.
    pub total_frames: Option<usize>,
}

/// A sequence of timed frames driven by exactly one worker at a time.
///
/// `next_frame` follows iterator semantics: `None` means the source is
/// exhausted (a batch ran out of files; live sources never return it while
/// open), and `Some(Err(_))` is a recoverable per-frame failure the worker
/// logs and moves past. Implementations wait briefly inside `next_frame`
/// on transient conditions instead of letting callers busy-spin.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>>;

    fn next_frame(&mut self) -> Option<Result<TimedFrame, Box<dyn std::error::Error>>>;

    /// Live sources get save-throttling, ROI restriction and the overlay
    /// info block; batch sources do not.
    fn is_live(&self) -> bool;

    fn close(&mut self);
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
