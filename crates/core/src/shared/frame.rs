use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::geometry::PixelBox;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Decode/encode happens at I/O boundaries only; the pipeline treats pixel
/// data as opaque. Each cycle works on two copies of the same frame: an
/// untouched save copy used for cropping and a draw copy that receives
/// annotations. Annotations never reach the save copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

pub const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A uniformly-colored frame, mostly useful as a test canvas.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize * CHANNELS);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies out the sub-rectangle described by `bounds`, clamped to the
    /// frame. A fully out-of-bounds or zero-area box yields an empty frame
    /// (`width == 0 || height == 0`); callers check before using the crop.
    pub fn crop(&self, bounds: &PixelBox) -> Frame {
        let x1 = bounds.x.min(self.width) as usize;
        let y1 = bounds.y.min(self.height) as usize;
        let x2 = (bounds.x.saturating_add(bounds.width)).min(self.width) as usize;
        let y2 = (bounds.y.saturating_add(bounds.height)).min(self.height) as usize;

        let crop_w = x2.saturating_sub(x1);
        let crop_h = y2.saturating_sub(y1);
        let row_stride = self.width as usize * CHANNELS;

        let mut data = Vec::with_capacity(crop_w * crop_h * CHANNELS);
        for row in y1..y2 {
            let start = row * row_stride + x1 * CHANNELS;
            data.extend_from_slice(&self.data[start..start + crop_w * CHANNELS]);
        }

        Frame::new(data, crop_w as u32, crop_h as u32, self.index)
    }

    /// Single-channel view of the frame for detector input.
    pub fn to_gray(&self) -> GrayRegion {
        let mut data = Vec::with_capacity((self.width * self.height) as usize);
        for px in self.data.chunks_exact(CHANNELS) {
            // Rec. 601 luma, same weighting the image crate uses.
            let luma =
                0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2]);
            data.push(luma.round().min(255.0) as u8);
        }
        GrayRegion {
            data,
            width: self.width,
            height: self.height,
        }
    }

    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn from_rgb_image(img: image::RgbImage, index: usize) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}

/// A grayscale pixel region handed to a detector backend.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayRegion {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}
