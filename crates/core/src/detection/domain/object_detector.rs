use crate::shared::frame::GrayRegion;

use super::detection::RawDetection;

/// Tuning parameters handed to the detector capability for one class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorParams {
    /// Pyramid step between detection scales; must be greater than 1.0.
    pub scale_factor: f64,
    /// Neighboring-hit count required to keep a candidate.
    pub min_neighbors: u32,
    /// Smallest object size `(width, height)` the detector will report.
    pub min_size: (u32, u32),
}

/// Domain interface for the external detection capability.
///
/// Implementations may be stateful, hence `&mut self`. The returned list
/// keeps the backend's native ordering; the pipeline never re-sorts it.
pub trait ObjectDetector: Send {
    fn detect(
        &mut self,
        region: &GrayRegion,
        params: &DetectorParams,
    ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>>;
}
