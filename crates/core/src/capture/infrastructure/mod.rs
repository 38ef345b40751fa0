pub mod camera_source;
pub mod folder_source;
pub mod fs_event_writer;
pub mod synthetic_camera;
#[cfg(feature = "camera-v4l2")]
pub mod v4l2_camera;
