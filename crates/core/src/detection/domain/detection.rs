use serde::{Deserialize, Serialize};

use crate::shared::geometry::PixelBox;

/// Category of object being searched for. Each class carries independent
/// thresholds, paddings and throttle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionClass {
    Face,
    Plate,
}

impl DetectionClass {
    pub const ALL: [DetectionClass; 2] = [DetectionClass::Face, DetectionClass::Plate];

    /// Stable lowercase label used in filenames and metadata records.
    pub fn label(self) -> &'static str {
        match self {
            DetectionClass::Face => "face",
            DetectionClass::Plate => "plate",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            DetectionClass::Face => 0,
            DetectionClass::Plate => 1,
        }
    }
}

impl std::fmt::Display for DetectionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One ranked hit from a detector backend, in the coordinate space of the
/// region it was searched in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub bounds: PixelBox,
    pub confidence: f64,
}

/// A classified detection. Confidence is detector-defined and unbounded;
/// only comparison against the class threshold is meaningful.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub class: DetectionClass,
    pub bounds: PixelBox,
    pub confidence: f64,
}
