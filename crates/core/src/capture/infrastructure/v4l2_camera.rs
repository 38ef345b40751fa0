use ouroboros::self_referencing;

use crate::capture::domain::camera::{CameraError, CameraGrabber, CameraOpener};
use crate::shared::frame::Frame;

/// Camera backend over local V4L2 device nodes (`/dev/video{index}`).
///
/// Requests packed RGB frames from the driver; devices that cannot deliver
/// `RGB3` are rejected at open time rather than handing the pipeline pixels
/// in an unexpected layout.
pub struct V4l2CameraOpener;

impl V4l2CameraOpener {
    pub fn new() -> Self {
        Self
    }
}

impl Default for V4l2CameraOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraOpener for V4l2CameraOpener {
    fn open(&self, index: u32) -> Result<Box<dyn CameraGrabber>, CameraError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let open_failed = |reason: String| CameraError::OpenFailed { index, reason };

        let device = v4l::Device::new(index as usize)
            .map_err(|e| open_failed(format!("device node unavailable: {e}")))?;

        let mut format = device
            .format()
            .map_err(|e| open_failed(format!("cannot read format: {e}")))?;
        format.fourcc = v4l::FourCC::new(b"RGB3");
        let format = device
            .set_format(&format)
            .map_err(|e| open_failed(format!("cannot set format: {e}")))?;

        if &format.fourcc.repr != b"RGB3" {
            return Err(open_failed(format!(
                "device does not support packed RGB (got {})",
                format.fourcc
            )));
        }
        if format.width == 0 || format.height == 0 {
            return Err(CameraError::InvalidResolution {
                index,
                width: format.width,
                height: format.height,
            });
        }

        let state = DeviceState::try_new(device, |device| {
            v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
        })
        .map_err(|e| open_failed(format!("cannot map capture buffers: {e}")))?;

        Ok(Box::new(V4l2Grabber {
            state,
            index,
            width: format.width,
            height: format.height,
            frame_count: 0,
        }))
    }
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

struct V4l2Grabber {
    state: DeviceState,
    index: u32,
    width: u32,
    height: u32,
    frame_count: usize,
}

impl CameraGrabber for V4l2Grabber {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn describe(&self) -> String {
        format!("Camera {} (v4l2)", self.index)
    }

    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        use v4l::io::traits::CaptureStream;

        let expected = (self.width * self.height * 3) as usize;
        let (buf, _meta) = self.state.with_stream_mut(|stream| stream.next())?;
        if buf.len() < expected {
            // Short read; the driver will deliver a full buffer next time.
            return Ok(None);
        }

        self.frame_count += 1;
        Ok(Some(Frame::new(
            buf[..expected].to_vec(),
            self.width,
            self.height,
            self.frame_count,
        )))
    }
}
