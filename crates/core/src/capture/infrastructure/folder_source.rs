use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::{
    unix_now, FrameSource, Provenance, SourceInfo, TimedFrame,
};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Batch frame source over the image files of one folder.
///
/// Files are processed in name order for a deterministic run. A file that
/// fails to decode surfaces as a per-frame error and the next call moves on
/// to the following file.
pub struct FolderSource {
    folder: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl FolderSource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            files: Vec::new(),
            next: 0,
        }
    }

    pub fn total_files(&self) -> usize {
        self.files.len()
    }

    fn list_image_files(folder: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for FolderSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        if !self.folder.is_dir() {
            return Err(format!("folder not found: {}", self.folder.display()).into());
        }
        self.files = Self::list_image_files(&self.folder)?;
        self.next = 0;
        if self.files.is_empty() {
            return Err(format!("no image files in {}", self.folder.display()).into());
        }
        Ok(SourceInfo {
            descriptor: format!("Folder {}", self.folder.display()),
            dimensions: None,
            total_frames: Some(self.files.len()),
        })
    }

    fn next_frame(&mut self) -> Option<Result<TimedFrame, Box<dyn std::error::Error>>> {
        let path = self.files.get(self.next)?.clone();
        let index = self.next;
        self.next += 1;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let img = match image::open(&path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                return Some(Err(
                    format!("cannot decode {}: {e}", path.display()).into()
                ))
            }
        };

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Some(Err(format!("empty image: {}", path.display()).into()));
        }

        Some(Ok(TimedFrame {
            frame: Frame::from_rgb_image(img, index),
            provenance: Provenance::File {
                filename,
                width,
                height,
            },
            unix_secs: unix_now(),
        }))
    }

    fn is_live(&self) -> bool {
        false
    }

    fn close(&mut self) {
        self.files.clear();
        self.next = 0;
    }
}
