use crate::shared::frame::GrayRegion;

use super::domain::detection::{Detection, DetectionClass};
use super::domain::object_detector::{DetectorParams, ObjectDetector};

/// Runs the detection capability for a single class over one region.
///
/// Owns the minimum-input-size precondition and backend error isolation:
/// an undersized region or a failing backend both degrade to "no detections
/// this cycle" and never abort the pipeline cycle.
pub struct DetectionInvoker {
    class: DetectionClass,
    backend: Box<dyn ObjectDetector>,
}

impl DetectionInvoker {
    pub fn new(class: DetectionClass, backend: Box<dyn ObjectDetector>) -> Self {
        Self { class, backend }
    }

    pub fn class(&self) -> DetectionClass {
        self.class
    }

    /// Detections in backend-native order, tagged with this invoker's class.
    pub fn run(&mut self, region: &GrayRegion, params: &DetectorParams) -> Vec<Detection> {
        if region.width < params.min_size.0 || region.height < params.min_size.1 {
            log::debug!(
                "{} region {}x{} below minimum {}x{}, skipping detection",
                self.class,
                region.width,
                region.height,
                params.min_size.0,
                params.min_size.1
            );
            return Vec::new();
        }

        match self.backend.detect(region, params) {
            Ok(raw) => raw
                .into_iter()
                .map(|r| Detection {
                    class: self.class,
                    bounds: r.bounds,
                    confidence: r.confidence,
                })
                .collect(),
            Err(e) => {
                log::warn!("{} detector failed: {e}", self.class);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::RawDetection;
    use crate::shared::geometry::PixelBox;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingDetector {
        calls: Arc<AtomicUsize>,
        result: Result<Vec<RawDetection>, String>,
    }

    impl ObjectDetector for RecordingDetector {
        fn detect(
            &mut self,
            _region: &GrayRegion,
            _params: &DetectorParams,
        ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(dets) => Ok(dets.clone()),
                Err(msg) => Err(msg.clone().into()),
            }
        }
    }

    fn region(width: u32, height: u32) -> GrayRegion {
        GrayRegion {
            data: vec![0; (width * height) as usize],
            width,
            height,
        }
    }

    fn params(min_w: u32, min_h: u32) -> DetectorParams {
        DetectorParams {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: (min_w, min_h),
        }
    }

    fn raw(x: u32, confidence: f64) -> RawDetection {
        RawDetection {
            bounds: PixelBox::new(x, 0, 10, 10),
            confidence,
        }
    }

    #[test]
    fn test_tags_detections_with_class() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut invoker = DetectionInvoker::new(
            DetectionClass::Plate,
            Box::new(RecordingDetector {
                calls: calls.clone(),
                result: Ok(vec![raw(0, 2.0), raw(20, 1.5)]),
            }),
        );

        let out = invoker.run(&region(100, 100), &params(10, 10));
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|d| d.class == DetectionClass::Plate));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_preserves_backend_order() {
        let mut invoker = DetectionInvoker::new(
            DetectionClass::Face,
            Box::new(RecordingDetector {
                calls: Arc::new(AtomicUsize::new(0)),
                result: Ok(vec![raw(5, 1.0), raw(1, 9.0), raw(3, 4.0)]),
            }),
        );

        let out = invoker.run(&region(100, 100), &params(10, 10));
        let xs: Vec<u32> = out.iter().map(|d| d.bounds.x).collect();
        assert_eq!(xs, vec![5, 1, 3]);
    }

    #[test]
    fn test_undersized_region_skips_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut invoker = DetectionInvoker::new(
            DetectionClass::Face,
            Box::new(RecordingDetector {
                calls: calls.clone(),
                result: Ok(vec![raw(0, 5.0)]),
            }),
        );

        // Width below minimum.
        assert!(invoker.run(&region(9, 100), &params(10, 10)).is_empty());
        // Height below minimum.
        assert!(invoker.run(&region(100, 9), &params(10, 10)).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_backend_error_degrades_to_empty() {
        let mut invoker = DetectionInvoker::new(
            DetectionClass::Face,
            Box::new(RecordingDetector {
                calls: Arc::new(AtomicUsize::new(0)),
                result: Err("backend exploded".to_string()),
            }),
        );

        assert!(invoker.run(&region(100, 100), &params(10, 10)).is_empty());
    }

    #[test]
    fn test_region_exactly_at_minimum_is_accepted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut invoker = DetectionInvoker::new(
            DetectionClass::Plate,
            Box::new(RecordingDetector {
                calls: calls.clone(),
                result: Ok(vec![]),
            }),
        );

        invoker.run(&region(50, 20), &params(50, 20));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
