use crate::detection::domain::detection::RawDetection;
use crate::detection::domain::object_detector::{DetectorParams, ObjectDetector};
use crate::shared::frame::GrayRegion;
use crate::shared::geometry::PixelBox;

/// Stub detection backend for wiring and demos.
///
/// Stands in for a real cascade/model backend where none is compiled in.
/// `Fixed` replays a preset list of detections (dropping boxes that do not
/// fit the searched region); `Centered` reports one hit covering the given
/// fraction of whatever region it is shown.
pub enum StubDetector {
    Fixed(Vec<RawDetection>),
    Centered { fraction: f64, confidence: f64 },
}

impl StubDetector {
    pub fn fixed(detections: Vec<RawDetection>) -> Self {
        StubDetector::Fixed(detections)
    }

    pub fn centered(fraction: f64, confidence: f64) -> Self {
        StubDetector::Centered {
            fraction: fraction.clamp(0.05, 1.0),
            confidence,
        }
    }
}

impl ObjectDetector for StubDetector {
    fn detect(
        &mut self,
        region: &GrayRegion,
        _params: &DetectorParams,
    ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        match self {
            StubDetector::Fixed(detections) => Ok(detections
                .iter()
                .filter(|d| {
                    d.bounds.x + d.bounds.width <= region.width
                        && d.bounds.y + d.bounds.height <= region.height
                })
                .copied()
                .collect()),
            StubDetector::Centered {
                fraction,
                confidence,
            } => {
                let w = (f64::from(region.width) * *fraction).floor() as u32;
                let h = (f64::from(region.height) * *fraction).floor() as u32;
                if w == 0 || h == 0 {
                    return Ok(Vec::new());
                }
                Ok(vec![RawDetection {
                    bounds: PixelBox::new((region.width - w) / 2, (region.height - h) / 2, w, h),
                    confidence: *confidence,
                }])
            }
        }
    }
}
