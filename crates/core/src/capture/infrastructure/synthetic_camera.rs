use std::time::Duration;

use crate::capture::domain::camera::{CameraError, CameraGrabber, CameraOpener};
use crate::shared::frame::Frame;

/// Camera backend that synthesizes frames instead of touching hardware.
///
/// Produces a slowly shifting gradient at a fixed resolution and frame
/// period. Used for demos on machines without a camera and for exercising
/// the live path in tests.
pub struct SyntheticCameraOpener {
    width: u32,
    height: u32,
    /// Indices that pretend to exist; everything else fails to open.
    available: Vec<u32>,
    frame_period: Duration,
}

impl SyntheticCameraOpener {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            available: vec![0],
            frame_period: Duration::from_millis(33),
        }
    }

    pub fn with_available(mut self, indices: Vec<u32>) -> Self {
        self.available = indices;
        self
    }

    pub fn with_frame_period(mut self, period: Duration) -> Self {
        self.frame_period = period;
        self
    }
}

impl CameraOpener for SyntheticCameraOpener {
    fn open(&self, index: u32) -> Result<Box<dyn CameraGrabber>, CameraError> {
        if !self.available.contains(&index) {
            return Err(CameraError::OpenFailed {
                index,
                reason: "no such synthetic device".to_string(),
            });
        }
        Ok(Box::new(SyntheticGrabber {
            width: self.width,
            height: self.height,
            index,
            tick: 0,
            frame_period: self.frame_period,
        }))
    }
}

struct SyntheticGrabber {
    width: u32,
    height: u32,
    index: u32,
    tick: u64,
    frame_period: Duration,
}

impl CameraGrabber for SyntheticGrabber {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn describe(&self) -> String {
        format!("Camera {} (synthetic)", self.index)
    }

    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        std::thread::sleep(self.frame_period);
        let phase = (self.tick % 256) as u32;
        self.tick += 1;

        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x + phase) % 256) as u8);
                data.push(((y + phase) % 256) as u8);
                data.push((phase % 256) as u8);
            }
        }
        Ok(Some(Frame::new(
            data,
            self.width,
            self.height,
            self.tick as usize,
        )))
    }
}
