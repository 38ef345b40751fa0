use imageproc::rect::Rect;

use crate::shared::config::OverlayTheme;
use crate::shared::frame::Frame;
use crate::shared::geometry::{PixelBox, Roi};

/// Concrete drawing values for one cycle, resolved from the configured
/// theme up front so the draw path never consults the theme by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayStyle {
    pub roi_idle: [u8; 3],
    pub roi_alert: [u8; 3],
    pub face_box: [u8; 3],
    pub plate_box: [u8; 3],
    pub thickness: u32,
}

impl OverlayStyle {
    pub fn resolve(theme: OverlayTheme) -> Self {
        match theme {
            OverlayTheme::Standard => Self {
                roi_idle: [0, 255, 0],
                roi_alert: [0, 0, 255],
                face_box: [255, 0, 0],
                plate_box: [255, 255, 0],
                thickness: 2,
            },
            OverlayTheme::HighContrast => Self {
                roi_idle: [255, 255, 255],
                roi_alert: [255, 0, 255],
                face_box: [255, 128, 0],
                plate_box: [0, 255, 255],
                thickness: 3,
            },
        }
    }
}

/// A text annotation anchored in frame coordinates. Rasterizing text is a
/// presentation concern; the pipeline only decides what to say and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayLabel {
    pub text: String,
    pub x: u32,
    pub y: u32,
}

/// Draws a hollow rectangle of the given thickness, growing inward from
/// the box outline.
pub fn draw_box(frame: &mut Frame, bounds: &PixelBox, color: [u8; 3], thickness: u32) {
    if bounds.width == 0 || bounds.height == 0 {
        return;
    }
    let Some(mut img) = frame.to_rgb_image() else {
        return;
    };
    for t in 0..thickness {
        let w = bounds.width.saturating_sub(2 * t);
        let h = bounds.height.saturating_sub(2 * t);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((bounds.x + t) as i32, (bounds.y + t) as i32).of_size(w, h);
        imageproc::drawing::draw_hollow_rect_mut(&mut img, rect, image::Rgb(color));
    }
    frame.data_mut().copy_from_slice(img.as_raw());
}

pub fn draw_roi(frame: &mut Frame, roi: &Roi, color: [u8; 3], thickness: u32) {
    draw_box(frame, &roi.as_box(), color, thickness);
}
