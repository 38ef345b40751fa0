use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detection::DetectionClass;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{class} scale factor must be greater than 1.0, got {value}")]
    ScaleFactor { class: &'static str, value: f64 },
    #[error("{class} minimum size must have positive dimensions, got {width}x{height}")]
    MinSize {
        class: &'static str,
        width: u32,
        height: u32,
    },
    #[error("{class} target width must be positive")]
    TargetWidth { class: &'static str },
    #[error("ROI percentage must be in (0, 1], got {0}")]
    RoiPercentage(f64),
    #[error("save interval must be non-negative, got {0}")]
    SaveInterval(f64),
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where face detection is restricted to the centered ROI.
///
/// Live framings tend to center their subject, so the default restricts
/// only live capture; arbitrary batch photos are scanned whole.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiPolicy {
    #[default]
    LiveOnly,
    Always,
    Never,
}

impl RoiPolicy {
    /// Whether the face pass of a cycle from the given source kind should
    /// restrict itself to the configured ROI.
    pub fn applies(self, is_live: bool) -> bool {
        match self {
            RoiPolicy::LiveOnly => is_live,
            RoiPolicy::Always => true,
            RoiPolicy::Never => false,
        }
    }
}

/// Closed set of overlay color schemes, resolved to concrete drawing values
/// once per cycle instead of looking style names up at draw time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayTheme {
    #[default]
    Standard,
    HighContrast,
}

/// Per-class detection and save settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassSettings {
    pub enabled: bool,
    pub confidence_threshold: f64,
    pub save_padding: u32,
    pub target_width: u32,
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub min_size: (u32, u32),
}

impl Default for ClassSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: 1.0,
            save_padding: 1,
            target_width: 720,
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: (50, 20),
        }
    }
}

/// Immutable configuration snapshot consumed by the pipeline.
///
/// Workers read one snapshot per cycle; edits produce a whole new snapshot
/// swapped in through [`ConfigHandle`] between cycles, so a running cycle
/// never observes a half-updated configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub face: ClassSettings,
    pub plate: ClassSettings,
    pub save_interval_secs: f64,
    pub roi_percentage: f64,
    pub face_roi: RoiPolicy,
    pub overlay_theme: OverlayTheme,
    pub faces_dir: String,
    pub plates_dir: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            face: ClassSettings {
                enabled: true,
                confidence_threshold: 5.0,
                save_padding: 50,
                target_width: 800,
                scale_factor: 1.1,
                min_neighbors: 5,
                min_size: (100, 100),
            },
            plate: ClassSettings::default(),
            save_interval_secs: 1.0,
            roi_percentage: 0.9,
            face_roi: RoiPolicy::default(),
            overlay_theme: OverlayTheme::default(),
            faces_dir: "faces".to_string(),
            plates_dir: "plates".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn settings(&self, class: DetectionClass) -> &ClassSettings {
        match class {
            DetectionClass::Face => &self.face,
            DetectionClass::Plate => &self.plate,
        }
    }

    pub fn output_dir(&self, class: DetectionClass) -> &str {
        match class {
            DetectionClass::Face => &self.faces_dir,
            DetectionClass::Plate => &self.plates_dir,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, s) in [("face", &self.face), ("plate", &self.plate)] {
            if s.scale_factor <= 1.0 {
                return Err(ConfigError::ScaleFactor {
                    class: name,
                    value: s.scale_factor,
                });
            }
            if s.min_size.0 == 0 || s.min_size.1 == 0 {
                return Err(ConfigError::MinSize {
                    class: name,
                    width: s.min_size.0,
                    height: s.min_size.1,
                });
            }
            if s.target_width == 0 {
                return Err(ConfigError::TargetWidth { class: name });
            }
        }
        if !(self.roi_percentage > 0.0 && self.roi_percentage <= 1.0) {
            return Err(ConfigError::RoiPercentage(self.roi_percentage));
        }
        if self.save_interval_secs < 0.0 {
            return Err(ConfigError::SaveInterval(self.save_interval_secs));
        }
        Ok(())
    }

    /// Loads a snapshot from a JSON file. Unknown keys are ignored so older
    /// config files keep working; missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Shared handle to the current configuration snapshot.
///
/// Single writer (the controller), any number of readers; readers clone the
/// `Arc` under a short lock and keep using that snapshot for the whole
/// cycle.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<Mutex<Arc<CaptureConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Arc::new(config))),
        }
    }

    pub fn snapshot(&self) -> Arc<CaptureConfig> {
        self.inner.lock().expect("config lock poisoned").clone()
    }

    pub fn replace(&self, config: CaptureConfig) {
        *self.inner.lock().expect("config lock poisoned") = Arc::new(config);
    }
}
