use std::path::{Path, PathBuf};

use crate::capture::domain::event_writer::EventWriter;
use crate::capture::domain::frame_source::Provenance;
use crate::capture::event::{build_event, next_sequence, CaptureEvent};
use crate::capture::throttle::SaveThrottle;
use crate::detection::domain::detection::{Detection, DetectionClass};
use crate::detection::domain::object_detector::{DetectorParams, ObjectDetector};
use crate::detection::invoker::DetectionInvoker;
use crate::shared::config::{CaptureConfig, ClassSettings};
use crate::shared::frame::Frame;
use crate::shared::geometry::Roi;
use crate::shared::status::DetectionFlags;

use super::overlay::{draw_box, draw_roi, OverlayLabel, OverlayStyle};

/// One persisted artifact emitted by a cycle.
#[derive(Clone, Debug)]
pub struct SavedArtifact {
    pub event: CaptureEvent,
    pub image_path: PathBuf,
}

/// Result of one pipeline cycle: the annotated draw copy, whatever was
/// persisted, per-class found flags, and label annotations for the shell
/// to render.
#[derive(Debug)]
pub struct CycleOutput {
    pub annotated: Frame,
    pub saved: Vec<SavedArtifact>,
    pub flags: DetectionFlags,
    pub labels: Vec<OverlayLabel>,
}

/// Drives one frame through detection, acceptance, throttling, capture and
/// overlay composition.
///
/// A runner belongs to exactly one frame source for its lifetime; its
/// throttle state starts fresh with every new source. Cycles are strictly
/// sequential. Events within a cycle are emitted face first, then plate.
pub struct PipelineRunner {
    face: DetectionInvoker,
    plate: DetectionInvoker,
    writer: Box<dyn EventWriter>,
    throttle: SaveThrottle,
}

impl PipelineRunner {
    pub fn new(
        face_backend: Box<dyn ObjectDetector>,
        plate_backend: Box<dyn ObjectDetector>,
        writer: Box<dyn EventWriter>,
        is_live: bool,
    ) -> Self {
        Self {
            face: DetectionInvoker::new(DetectionClass::Face, face_backend),
            plate: DetectionInvoker::new(DetectionClass::Plate, plate_backend),
            writer,
            throttle: SaveThrottle::new(is_live),
        }
    }

    pub fn is_live(&self) -> bool {
        self.throttle.is_live()
    }

    /// Runs one cycle. `now` is monotonic seconds for throttling;
    /// `unix_secs` is the frame's wall-clock acquisition time used in
    /// filenames and metadata.
    pub fn run_cycle(
        &mut self,
        frame: Frame,
        provenance: &Provenance,
        now: f64,
        unix_secs: u64,
        config: &CaptureConfig,
    ) -> CycleOutput {
        let save_frame = frame.clone();
        let mut out = CycleOutput {
            annotated: frame,
            saved: Vec::new(),
            flags: DetectionFlags::default(),
            labels: Vec::new(),
        };

        let style = OverlayStyle::resolve(config.overlay_theme);
        let frame_w = save_frame.width();
        let frame_h = save_frame.height();
        let is_live = self.throttle.is_live();

        if config.face.enabled {
            let restricted = config.face_roi.applies(is_live);
            let roi = if restricted {
                Roi::compute(frame_w, frame_h, config.roi_percentage)
            } else {
                Some(Roi::full_frame(frame_w, frame_h))
            };

            match roi {
                None => log::debug!(
                    "ROI of {:.2} degenerates on a {}x{} frame, skipping face pass",
                    config.roi_percentage,
                    frame_w,
                    frame_h
                ),
                Some(roi) => {
                    let gray = save_frame.crop(&roi.as_box()).to_gray();
                    let detections: Vec<Detection> = self
                        .face
                        .run(&gray, &detector_params(&config.face))
                        .into_iter()
                        .map(|d| Detection {
                            bounds: d.bounds.translated(roi.x1, roi.y1),
                            ..d
                        })
                        .collect();

                    out.flags.face_in_roi = !detections.is_empty();
                    self.process_class(
                        &detections,
                        &save_frame,
                        provenance,
                        now,
                        unix_secs,
                        config,
                        style.face_box,
                        &style,
                        &mut out,
                    );

                    if restricted {
                        let color = if out.flags.face_in_roi {
                            style.roi_alert
                        } else {
                            style.roi_idle
                        };
                        draw_roi(&mut out.annotated, &roi, color, style.thickness);
                    }
                }
            }
        }

        if config.plate.enabled {
            let gray = save_frame.to_gray();
            let detections = self.plate.run(&gray, &detector_params(&config.plate));

            out.flags.plate_found = !detections.is_empty();
            self.process_class(
                &detections,
                &save_frame,
                provenance,
                now,
                unix_secs,
                config,
                style.plate_box,
                &style,
                &mut out,
            );
        }

        out
    }

    /// Draws every detection of one class and persists at most one: the
    /// first detection that clears the confidence threshold while the
    /// throttle permits. A detection whose crop degenerates or whose write
    /// fails does not consume the slot; the next candidate still gets its
    /// chance.
    #[allow(clippy::too_many_arguments)]
    fn process_class(
        &mut self,
        detections: &[Detection],
        save_frame: &Frame,
        provenance: &Provenance,
        now: f64,
        unix_secs: u64,
        config: &CaptureConfig,
        box_color: [u8; 3],
        style: &OverlayStyle,
        out: &mut CycleOutput,
    ) {
        let mut persisted_this_cycle = false;

        for detection in detections {
            draw_box(&mut out.annotated, &detection.bounds, box_color, style.thickness);
            out.labels.push(OverlayLabel {
                text: format!("{:.2}", detection.confidence),
                x: detection.bounds.x,
                y: detection.bounds.y.saturating_sub(10),
            });

            if persisted_this_cycle {
                continue;
            }
            let settings = config.settings(detection.class);
            if detection.confidence < settings.confidence_threshold {
                continue;
            }
            if !self
                .throttle
                .allow(detection.class, now, config.save_interval_secs)
            {
                continue;
            }

            let Some((event, crop)) = build_event(
                detection,
                save_frame,
                provenance,
                settings,
                unix_secs,
                next_sequence(),
            ) else {
                continue;
            };

            let dir = Path::new(config.output_dir(detection.class));
            match self.writer.write(&event, &crop, dir) {
                Ok(image_path) => {
                    log::info!(
                        "saved {} (confidence {:.2}) to {}",
                        detection.class,
                        detection.confidence,
                        image_path.display()
                    );
                    self.throttle.record(detection.class, now);
                    persisted_this_cycle = true;
                    out.saved.push(SavedArtifact { event, image_path });
                }
                Err(e) => {
                    log::warn!("failed to persist {} event: {e}", detection.class);
                }
            }
        }
    }
}

fn detector_params(settings: &ClassSettings) -> DetectorParams {
    DetectorParams {
        scale_factor: settings.scale_factor,
        min_neighbors: settings.min_neighbors,
        min_size: settings.min_size,
    }
}
