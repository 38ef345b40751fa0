use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::capture::domain::camera::{CameraError, CameraOpener};
use crate::capture::domain::event_writer::EventWriter;
use crate::capture::domain::frame_source::FrameSource;
use crate::capture::infrastructure::camera_source::CameraSource;
use crate::capture::infrastructure::folder_source::FolderSource;
use crate::detection::domain::detection::DetectionClass;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::pipeline::runner::PipelineRunner;
use crate::shared::config::{CaptureConfig, ConfigError, ConfigHandle};
use crate::shared::constants::WORKER_JOIN_TIMEOUT;
use crate::shared::status::StatusCell;

use super::worker::{spawn_worker, JoinOutcome, SessionUpdate, WorkerHandle};

/// Creates the per-class detector backends for a new worker.
///
/// A fresh pair is built for every source so detector state never leaks
/// across source switches.
pub trait DetectorFactory: Send {
    fn create(&self, class: DetectionClass) -> Box<dyn ObjectDetector>;
}

/// Creates the event writer for a new worker.
pub type WriterFactory = Box<dyn Fn() -> Box<dyn EventWriter> + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Live(u32),
    Batch,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera {0} is already the active source")]
    AlreadyActive(u32),
    #[error("a batch job is already running")]
    BatchAlreadyRunning,
    #[error("operation rejected while a batch job is running")]
    Busy,
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("no batch job is running")]
    NotRunning,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Owns the active frame source and its worker thread.
///
/// Enforces mutual exclusion between live capture and batch jobs: every
/// transition fully quiesces the previous worker (cooperative stop plus
/// bounded join) before the next source is opened, so no two sources ever
/// share throttle state or a camera handle. All operations are called from
/// the shell's thread; updates flow back through the channel handed out at
/// construction.
pub struct SessionController {
    opener: Box<dyn CameraOpener>,
    detectors: Box<dyn DetectorFactory>,
    writers: WriterFactory,
    config: ConfigHandle,
    status: Arc<StatusCell>,
    updates: Sender<SessionUpdate>,
    state: SessionState,
    worker: Option<WorkerHandle>,
    resume_camera: Option<u32>,
    join_timeout: Duration,
}

impl SessionController {
    pub fn new(
        opener: Box<dyn CameraOpener>,
        detectors: Box<dyn DetectorFactory>,
        writers: WriterFactory,
        config: ConfigHandle,
    ) -> (Self, Receiver<SessionUpdate>) {
        let (updates, rx) = crossbeam_channel::unbounded();
        (
            Self {
                opener,
                detectors,
                writers,
                config,
                status: Arc::new(StatusCell::new()),
                updates,
                state: SessionState::Idle,
                worker: None,
                resume_camera: None,
                join_timeout: WORKER_JOIN_TIMEOUT,
            },
            rx,
        )
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> Arc<StatusCell> {
        self.status.clone()
    }

    pub fn config(&self) -> ConfigHandle {
        self.config.clone()
    }

    /// Camera indices in `0..=max_index` that currently open.
    pub fn probe_cameras(&self, max_index: u32) -> Vec<u32> {
        self.opener.probe(max_index)
    }

    /// Switches to live capture from the given camera.
    ///
    /// Stops and joins any current live worker first. Rejected while a
    /// batch job is running. On open failure the controller is left `Idle`
    /// with no retry.
    pub fn start_live(&mut self, index: u32) -> Result<(), SessionError> {
        if self.batch_active() {
            return Err(SessionError::Busy);
        }
        if let SessionState::Live(current) = self.state {
            if current == index && self.worker_alive() {
                return Err(SessionError::AlreadyActive(index));
            }
        }

        self.halt_worker();

        let grabber = self.opener.open(index)?;
        let (width, height) = grabber.dimensions();
        if width == 0 || height == 0 {
            return Err(SessionError::Camera(CameraError::InvalidResolution {
                index,
                width,
                height,
            }));
        }

        let mut source = CameraSource::new(grabber, index);
        let info = source
            .open()
            .map_err(|e| SessionError::SourceUnavailable(e.to_string()))?;

        log::info!("starting live capture on {}", info.descriptor);
        self.spawn(Box::new(source), info, true);
        self.state = SessionState::Live(index);
        Ok(())
    }

    /// Hands an image-folder job to a dedicated worker.
    ///
    /// Valid from `Idle` or live capture; a second concurrent batch job is
    /// rejected. An interrupted live camera is remembered and automatically
    /// resumed when the job finishes. The folder is opened before the live
    /// source is stopped, so a bad folder leaves the session untouched.
    pub fn start_batch(&mut self, folder: &Path) -> Result<(), SessionError> {
        if self.batch_active() {
            return Err(SessionError::BatchAlreadyRunning);
        }

        let mut source = FolderSource::new(folder);
        let info = source
            .open()
            .map_err(|e| SessionError::SourceUnavailable(e.to_string()))?;

        let resume = match self.state {
            SessionState::Live(index) => Some(index),
            _ => None,
        };

        self.halt_worker();
        self.resume_camera = resume;

        log::info!(
            "starting batch job over {} ({} files)",
            info.descriptor,
            info.total_frames.unwrap_or(0)
        );
        self.spawn(Box::new(source), info, false);
        self.state = SessionState::Batch;
        Ok(())
    }

    /// Finalizes a batch job after the shell observed
    /// [`SessionUpdate::BatchFinished`]: joins the worker, returns to
    /// `Idle`, and re-issues `start_live` for a remembered camera.
    /// Returns the resumed camera index, if any.
    pub fn complete_batch(&mut self) -> Result<Option<u32>, SessionError> {
        if !matches!(self.state, SessionState::Batch) {
            return Err(SessionError::NotRunning);
        }
        self.halt_worker();

        match self.resume_camera.take() {
            Some(index) => {
                log::info!("batch finished, resuming camera {index}");
                self.start_live(index)?;
                Ok(Some(index))
            }
            None => Ok(None),
        }
    }

    /// Cancels a running batch job. Cancellation is cooperative: it lands
    /// between files, within one file's processing latency. The remembered
    /// camera (if any) is resumed immediately.
    pub fn stop_batch(&mut self) -> Result<Option<u32>, SessionError> {
        if !matches!(self.state, SessionState::Batch) {
            return Err(SessionError::NotRunning);
        }
        self.halt_worker();

        match self.resume_camera.take() {
            Some(index) => {
                self.start_live(index)?;
                Ok(Some(index))
            }
            None => Ok(None),
        }
    }

    /// Stops whatever source is active and returns to `Idle`.
    pub fn stop(&mut self) -> JoinOutcome {
        self.resume_camera = None;
        self.halt_worker()
    }

    /// Shuts the session down for process exit.
    pub fn quit(&mut self) -> JoinOutcome {
        self.stop()
    }

    /// Swaps in a new configuration snapshot, applied between cycles.
    /// Rejected while a batch job is running; live capture picks the new
    /// snapshot up on its next cycle.
    pub fn update_config(&mut self, config: CaptureConfig) -> Result<(), SessionError> {
        if self.batch_active() {
            return Err(SessionError::Busy);
        }
        config.validate()?;
        self.config.replace(config);
        Ok(())
    }

    fn spawn(&mut self, source: Box<dyn FrameSource>, info: crate::capture::domain::frame_source::SourceInfo, is_live: bool) {
        let runner = PipelineRunner::new(
            self.detectors.create(DetectionClass::Face),
            self.detectors.create(DetectionClass::Plate),
            (self.writers)(),
            is_live,
        );
        self.worker = Some(spawn_worker(
            source,
            runner,
            info,
            self.config.clone(),
            self.updates.clone(),
            self.status.clone(),
        ));
    }

    fn worker_alive(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    fn batch_active(&self) -> bool {
        matches!(self.state, SessionState::Batch) && self.worker_alive()
    }

    fn halt_worker(&mut self) -> JoinOutcome {
        self.state = SessionState::Idle;
        match self.worker.take() {
            None => JoinOutcome::NotRunning,
            Some(worker) => worker.stop(self.join_timeout),
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.halt_worker();
    }
}
