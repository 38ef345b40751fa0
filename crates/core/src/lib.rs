//! Detection-and-capture pipeline for live cameras and image folders.
//!
//! Frames from exactly one active source flow through region-restricted
//! object detection (faces, license plates); qualifying detections are
//! persisted as normalized crops with structured metadata, save-debounced
//! per class in live mode, while every cycle yields an annotated preview
//! frame and a status snapshot for the embedding shell.

pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod session;
pub mod shared;
