use std::path::{Path, PathBuf};

use crate::capture::event::CaptureEvent;
use crate::shared::frame::Frame;

/// Persists one capture event: the normalized crop plus its sibling
/// metadata record.
pub trait EventWriter: Send {
    /// Writes both artifact files under `dir`, returning the image path.
    fn write(
        &self,
        event: &CaptureEvent,
        crop: &Frame,
        dir: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error>>;
}
