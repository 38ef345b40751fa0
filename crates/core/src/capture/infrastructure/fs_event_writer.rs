use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::domain::event_writer::EventWriter;
use crate::capture::event::CaptureEvent;
use crate::shared::frame::Frame;

/// Writes capture artifacts to the local filesystem: a lossless PNG crop
/// plus a sibling `.json` metadata record sharing the same stem.
pub struct FsEventWriter;

impl FsEventWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FsEventWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventWriter for FsEventWriter {
    fn write(
        &self,
        event: &CaptureEvent,
        crop: &Frame,
        dir: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        fs::create_dir_all(dir)?;

        let image_path = dir.join(&event.saved_image_details.png_filename);
        let json_path = image_path.with_extension("json");

        let img = crop
            .to_rgb_image()
            .ok_or("Failed to build image from crop data")?;
        img.save_with_format(&image_path, image::ImageFormat::Png)?;

        let json = serde_json::to_string_pretty(event)?;
        fs::write(&json_path, json)?;

        Ok(image_path)
    }
}
