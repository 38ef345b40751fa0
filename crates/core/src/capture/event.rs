use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::detection::domain::detection::{Detection, DetectionClass};
use crate::shared::config::ClassSettings;
use crate::shared::frame::Frame;
use crate::shared::geometry::resize_target;

use super::domain::frame_source::Provenance;

/// Process-wide event sequence. Folded into every filename so that two
/// events produced in the same wall-clock second can never overwrite each
/// other's files.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedImageDetails {
    pub png_filename: String,
    pub saved_width: u32,
    pub saved_height: u32,
    pub padding_applied: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    LiveCamera,
    ImageFile,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source_type: SourceType,
    pub timestamp: u64,
    /// `-1` for file-sourced events.
    pub camera_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image_height: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub target_width: u32,
}

/// The metadata half of one persisted detection artifact. Created once per
/// accepted detection and never mutated afterwards; its `png_filename`
/// names the sibling image file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub detection_type: DetectionClass,
    pub confidence_score: f64,
    pub original_detected_object: ObjectSize,
    pub saved_image_details: SavedImageDetails,
    pub source_info: SourceRecord,
    pub normalization: Normalization,
}

/// Assembles the persisted artifact for one accepted detection: the padded,
/// clamped, aspect-normalized crop plus its metadata record.
///
/// Returns `None` when the padded box collapses to zero area or the resize
/// target degenerates; both cases skip the save without failing the cycle.
pub fn build_event(
    detection: &Detection,
    frame_for_saving: &Frame,
    provenance: &Provenance,
    settings: &ClassSettings,
    unix_secs: u64,
    sequence: u64,
) -> Option<(CaptureEvent, Frame)> {
    let padded = detection.bounds.pad_and_clamp(
        settings.save_padding,
        frame_for_saving.width(),
        frame_for_saving.height(),
    );
    if padded.area() == 0 {
        log::debug!(
            "{} crop collapsed to zero area after clamping, skipping save",
            detection.class
        );
        return None;
    }

    let crop = frame_for_saving.crop(&padded);
    let Some((new_w, new_h)) = resize_target(crop.width(), crop.height(), settings.target_width)
    else {
        log::debug!(
            "{} crop {}x{} cannot be normalized to width {}, skipping save",
            detection.class,
            crop.width(),
            crop.height(),
            settings.target_width
        );
        return None;
    };

    let normalized = resize_crop(&crop, new_w, new_h)?;

    let png_filename = event_filename(detection.class, provenance, unix_secs, sequence);
    let event = CaptureEvent {
        detection_type: detection.class,
        confidence_score: round2(detection.confidence),
        original_detected_object: ObjectSize {
            width: detection.bounds.width,
            height: detection.bounds.height,
        },
        saved_image_details: SavedImageDetails {
            png_filename,
            saved_width: normalized.width(),
            saved_height: normalized.height(),
            padding_applied: settings.save_padding,
        },
        source_info: source_record(provenance, unix_secs),
        normalization: Normalization {
            target_width: settings.target_width,
        },
    };

    Some((event, normalized))
}

/// Downscaling averages source pixels, upscaling interpolates linearly.
fn resize_crop(crop: &Frame, new_w: u32, new_h: u32) -> Option<Frame> {
    if new_w == crop.width() && new_h == crop.height() {
        return Some(crop.clone());
    }
    let img = crop.to_rgb_image()?;
    let resized = if new_w < crop.width() {
        image::imageops::thumbnail(&img, new_w, new_h)
    } else {
        image::imageops::resize(&img, new_w, new_h, image::imageops::FilterType::Triangle)
    };
    Some(Frame::from_rgb_image(resized, crop.index()))
}

fn event_filename(
    class: DetectionClass,
    provenance: &Provenance,
    unix_secs: u64,
    sequence: u64,
) -> String {
    match provenance {
        Provenance::File { filename, .. } => {
            let stem = Path::new(filename)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");
            format!("{stem}_{class}_{sequence}_{unix_secs}.png")
        }
        Provenance::Live { camera_index } => {
            format!("{class}_{unix_secs}_{camera_index}_{sequence}.png")
        }
    }
}

fn source_record(provenance: &Provenance, unix_secs: u64) -> SourceRecord {
    match provenance {
        Provenance::Live { camera_index } => SourceRecord {
            source_type: SourceType::LiveCamera,
            timestamp: unix_secs,
            camera_index: i64::from(*camera_index),
            original_image_filename: None,
            original_image_width: None,
            original_image_height: None,
        },
        Provenance::File {
            filename,
            width,
            height,
        } => SourceRecord {
            source_type: SourceType::ImageFile,
            timestamp: unix_secs,
            camera_index: -1,
            original_image_filename: Some(filename.clone()),
            original_image_width: Some(*width),
            original_image_height: Some(*height),
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
