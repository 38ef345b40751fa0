use std::time::Duration;

use crate::capture::domain::camera::CameraGrabber;
use crate::capture::domain::frame_source::{
    unix_now, FrameSource, Provenance, SourceInfo, TimedFrame,
};
use crate::shared::constants::FRAME_RETRY_WAIT;

/// Live frame source over an exclusively-owned camera handle.
///
/// When the device has no frame ready the source waits briefly before
/// reporting a recoverable error, so the driving worker re-checks its stop
/// flag between attempts instead of busy-spinning.
pub struct CameraSource {
    grabber: Box<dyn CameraGrabber>,
    camera_index: u32,
    retry_wait: Duration,
}

impl CameraSource {
    pub fn new(grabber: Box<dyn CameraGrabber>, camera_index: u32) -> Self {
        Self {
            grabber,
            camera_index,
            retry_wait: FRAME_RETRY_WAIT,
        }
    }

    #[cfg(test)]
    fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        let (width, height) = self.grabber.dimensions();
        Ok(SourceInfo {
            descriptor: self.grabber.describe(),
            dimensions: Some((width, height)),
            total_frames: None,
        })
    }

    fn next_frame(&mut self) -> Option<Result<TimedFrame, Box<dyn std::error::Error>>> {
        match self.grabber.grab() {
            Ok(Some(frame)) => Some(Ok(TimedFrame {
                frame,
                provenance: Provenance::Live {
                    camera_index: self.camera_index,
                },
                unix_secs: unix_now(),
            })),
            Ok(None) => {
                std::thread::sleep(self.retry_wait);
                Some(Err(
                    format!("camera {} has no frame ready", self.camera_index).into()
                ))
            }
            Err(e) => {
                std::thread::sleep(self.retry_wait);
                Some(Err(
                    format!("camera {} read failed: {e}", self.camera_index).into(),
                ))
            }
        }
    }

    fn is_live(&self) -> bool {
        true
    }

    fn close(&mut self) {
        // Dropping the grabber releases the device; nothing else to do.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use std::collections::VecDeque;

    struct ScriptedGrabber {
        steps: VecDeque<Result<Option<Frame>, String>>,
    }

    impl CameraGrabber for ScriptedGrabber {
        fn dimensions(&self) -> (u32, u32) {
            (8, 6)
        }

        fn describe(&self) -> String {
            "Camera 3 (scripted)".to_string()
        }

        fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            match self.steps.pop_front() {
                Some(Ok(frame)) => Ok(frame),
                Some(Err(e)) => Err(e.into()),
                None => Ok(None),
            }
        }
    }

    fn source(steps: Vec<Result<Option<Frame>, String>>) -> CameraSource {
        CameraSource::new(
            Box::new(ScriptedGrabber {
                steps: steps.into_iter().collect(),
            }),
            3,
        )
        .with_retry_wait(Duration::from_millis(0))
    }

    #[test]
    fn test_open_reports_camera_identity() {
        let mut src = source(vec![]);
        let info = src.open().unwrap();
        assert_eq!(info.descriptor, "Camera 3 (scripted)");
        assert_eq!(info.dimensions, Some((8, 6)));
        assert_eq!(info.total_frames, None);
        assert!(src.is_live());
    }

    #[test]
    fn test_frames_carry_live_provenance() {
        let mut src = source(vec![Ok(Some(Frame::filled(8, 6, [1, 2, 3])))]);
        let timed = src.next_frame().unwrap().unwrap();
        assert_eq!(timed.provenance, Provenance::Live { camera_index: 3 });
        assert_eq!(timed.frame.width(), 8);
        assert!(timed.unix_secs > 0);
    }

    #[test]
    fn test_no_frame_ready_is_recoverable() {
        let mut src = source(vec![Ok(None), Ok(Some(Frame::filled(8, 6, [0, 0, 0])))]);
        assert!(src.next_frame().unwrap().is_err());
        assert!(src.next_frame().unwrap().is_ok());
    }

    #[test]
    fn test_grab_error_is_recoverable() {
        let mut src = source(vec![
            Err("device momentarily unavailable".to_string()),
            Ok(Some(Frame::filled(8, 6, [0, 0, 0]))),
        ]);
        let err = src.next_frame().unwrap().unwrap_err();
        assert!(err.to_string().contains("camera 3"));
        assert!(src.next_frame().unwrap().is_ok());
    }
}
