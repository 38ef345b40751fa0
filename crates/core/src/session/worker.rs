use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::pipeline::overlay::OverlayLabel;
use crate::pipeline::runner::{PipelineRunner, SavedArtifact};
use crate::shared::config::ConfigHandle;
use crate::shared::status::{StatusCell, StatusSnapshot};

/// Frame previews still undelivered beyond which new ones are dropped.
const FRAME_BACKLOG_LIMIT: usize = 4;

/// Messages handed from the worker thread to the single UI-facing consumer.
///
/// `Frame` updates are disposable previews: when the consumer falls behind
/// they are dropped rather than stalling capture. Everything else is
/// delivered reliably, and the channel is unbounded so the worker never
/// blocks on a slow consumer (a blocked worker could not honor its stop
/// flag).
#[derive(Debug)]
pub enum SessionUpdate {
    Frame {
        annotated: crate::shared::frame::Frame,
        labels: Vec<OverlayLabel>,
        snapshot: StatusSnapshot,
    },
    Saved(SavedArtifact),
    BatchProgress {
        current: usize,
        total: usize,
    },
    BatchFinished(BatchSummary),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files_processed: usize,
    pub events_saved: usize,
    pub cancelled: bool,
}

/// Outcome of a bounded-wait worker stop.
///
/// `TimedOut` is a degraded condition the caller must handle explicitly:
/// the thread is detached and assumed to terminate eventually, never
/// blocked on indefinitely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Stopped,
    TimedOut,
    NotRunning,
}

/// Owning handle to the single active worker thread.
pub struct WorkerHandle {
    thread: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    done_rx: Receiver<()>,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Requests a cooperative stop and waits at most `timeout` for the
    /// worker to acknowledge. Batch workers poll the flag between files, so
    /// cancellation lands within one file's processing latency.
    pub fn stop(mut self, timeout: Duration) -> JoinOutcome {
        self.stop.store(true, Ordering::Relaxed);
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    let _ = thread.join();
                }
                JoinOutcome::Stopped
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("worker did not stop within {timeout:?}, detaching");
                JoinOutcome::TimedOut
            }
        }
    }
}

/// Spawns the dedicated worker thread for one frame source.
///
/// The source and runner move into the thread; the camera handle (if any)
/// is therefore exclusively owned by the worker until it exits.
pub fn spawn_worker(
    source: Box<dyn FrameSource>,
    runner: PipelineRunner,
    info: SourceInfo,
    config: ConfigHandle,
    updates: Sender<SessionUpdate>,
    status: Arc<StatusCell>,
) -> WorkerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);

    let stop_flag = stop.clone();
    let thread = std::thread::spawn(move || {
        let mut source = source;
        let mut runner = runner;
        run_loop(
            &mut *source,
            &mut runner,
            &info,
            &config,
            &updates,
            &status,
            &stop_flag,
        );
        source.close();
        let _ = done_tx.send(());
    });

    WorkerHandle {
        thread: Some(thread),
        stop,
        done_rx,
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    source: &mut dyn FrameSource,
    runner: &mut PipelineRunner,
    info: &SourceInfo,
    config: &ConfigHandle,
    updates: &Sender<SessionUpdate>,
    status: &StatusCell,
    stop: &AtomicBool,
) {
    let started = Instant::now();
    let mut fps = FpsCounter::new();
    let is_live = source.is_live();
    let total = info.total_frames.unwrap_or(0);
    let mut summary = BatchSummary::default();

    while !stop.load(Ordering::Relaxed) {
        let timed = match source.next_frame() {
            None => break,
            Some(Err(e)) => {
                log::warn!("frame acquisition failed: {e}");
                if !is_live {
                    summary.files_processed += 1;
                    if updates
                        .send(SessionUpdate::BatchProgress {
                            current: summary.files_processed,
                            total,
                        })
                        .is_err()
                    {
                        return;
                    }
                }
                continue;
            }
            Some(Ok(timed)) => timed,
        };

        let snapshot_dims = info
            .dimensions
            .unwrap_or((timed.frame.width(), timed.frame.height()));

        let cfg = config.snapshot();
        let now = started.elapsed().as_secs_f64();
        let out = runner.run_cycle(timed.frame, &timed.provenance, now, timed.unix_secs, &cfg);

        let snapshot = StatusSnapshot {
            descriptor: info.descriptor.clone(),
            width: snapshot_dims.0,
            height: snapshot_dims.1,
            fps: fps.tick(),
            flags: out.flags,
        };
        status.publish(snapshot.clone());

        for artifact in &out.saved {
            if updates.send(SessionUpdate::Saved(artifact.clone())).is_err() {
                return;
            }
        }

        if !is_live {
            summary.files_processed += 1;
            summary.events_saved += out.saved.len();
            if updates
                .send(SessionUpdate::BatchProgress {
                    current: summary.files_processed,
                    total,
                })
                .is_err()
            {
                return;
            }
        }

        if updates.len() > FRAME_BACKLOG_LIMIT {
            continue; // consumer is behind; this preview frame is disposable
        }
        let mut labels = out.labels;
        if is_live {
            labels.extend(info_block(&snapshot));
        }
        if updates
            .send(SessionUpdate::Frame {
                annotated: out.annotated,
                labels,
                snapshot,
            })
            .is_err()
        {
            return;
        }
    }

    if !is_live {
        summary.cancelled = stop.load(Ordering::Relaxed);
        let _ = updates.send(SessionUpdate::BatchFinished(summary));
    }
}

/// The live-mode info block: status lines anchored top-left, one per row.
fn info_block(snapshot: &StatusSnapshot) -> Vec<OverlayLabel> {
    let mut lines = vec![
        format!("FPS: {:.1}", snapshot.fps),
        snapshot.descriptor.clone(),
        format!("Resolution: {}x{}", snapshot.width, snapshot.height),
    ];
    if snapshot.flags.face_in_roi {
        lines.push("FACE IN ROI!".to_string());
    }
    if snapshot.flags.plate_found {
        lines.push("PLATE!".to_string());
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| OverlayLabel {
            text,
            x: 10,
            y: 25 + (i as u32) * 20,
        })
        .collect()
}

/// Rolling frames-per-second estimate, recomputed once per second.
struct FpsCounter {
    window_start: Instant,
    frames: u32,
    current: f64,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            current: 0.0,
        }
    }

    fn tick(&mut self) -> f64 {
        self.frames += 1;
        let elapsed = self.window_start.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.current = f64::from(self.frames) / elapsed;
            self.frames = 0;
            self.window_start = Instant::now();
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::event_writer::EventWriter;
    use crate::capture::domain::frame_source::{Provenance, TimedFrame};
    use crate::capture::event::CaptureEvent;
    use crate::detection::domain::detection::RawDetection;
    use crate::detection::domain::object_detector::{DetectorParams, ObjectDetector};
    use crate::shared::config::CaptureConfig;
    use crate::shared::frame::{Frame, GrayRegion};
    use crate::shared::geometry::PixelBox;
    use std::path::{Path, PathBuf};

    struct ListSource {
        frames: Vec<TimedFrame>,
        next: usize,
        per_frame_delay: Duration,
    }

    impl ListSource {
        fn new(count: usize) -> Self {
            let frames = (0..count)
                .map(|i| TimedFrame {
                    frame: Frame::filled(64, 48, [50, 50, 50]),
                    provenance: Provenance::File {
                        filename: format!("img_{i}.png"),
                        width: 64,
                        height: 48,
                    },
                    unix_secs: 1_700_000_000,
                })
                .collect();
            Self {
                frames,
                next: 0,
                per_frame_delay: Duration::from_millis(0),
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.per_frame_delay = delay;
            self
        }

        fn info(&self) -> SourceInfo {
            SourceInfo {
                descriptor: "Folder test".to_string(),
                dimensions: None,
                total_frames: Some(self.frames.len()),
            }
        }
    }

    impl FrameSource for ListSource {
        fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
            Ok(self.info())
        }

        fn next_frame(&mut self) -> Option<Result<TimedFrame, Box<dyn std::error::Error>>> {
            std::thread::sleep(self.per_frame_delay);
            let timed = self.frames.get(self.next)?.clone();
            self.next += 1;
            Some(Ok(timed))
        }

        fn is_live(&self) -> bool {
            false
        }

        fn close(&mut self) {}
    }

    struct FixedDetector(Vec<RawDetection>);

    impl ObjectDetector for FixedDetector {
        fn detect(
            &mut self,
            _region: &GrayRegion,
            _params: &DetectorParams,
        ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct NullWriter;

    impl EventWriter for NullWriter {
        fn write(
            &self,
            event: &CaptureEvent,
            _crop: &Frame,
            dir: &Path,
        ) -> Result<PathBuf, Box<dyn std::error::Error>> {
            Ok(dir.join(&event.saved_image_details.png_filename))
        }
    }

    fn batch_runner(face_hits: Vec<RawDetection>) -> PipelineRunner {
        PipelineRunner::new(
            Box::new(FixedDetector(face_hits)),
            Box::new(FixedDetector(vec![])),
            Box::new(NullWriter),
            false,
        )
    }

    fn small_config() -> ConfigHandle {
        let mut config = CaptureConfig::default();
        config.face.min_size = (1, 1);
        config.face.save_padding = 2;
        config.face.target_width = 32;
        config.plate.min_size = (1, 1);
        ConfigHandle::new(config)
    }

    fn spawn_batch(
        source: ListSource,
        runner: PipelineRunner,
    ) -> (WorkerHandle, Receiver<SessionUpdate>) {
        let info = source.info();
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn_worker(
            Box::new(source),
            runner,
            info,
            small_config(),
            tx,
            Arc::new(StatusCell::new()),
        );
        (handle, rx)
    }

    fn drain_until_finished(rx: &Receiver<SessionUpdate>) -> (BatchSummary, usize, usize) {
        let mut frames = 0;
        let mut saved = 0;
        loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                SessionUpdate::Frame { .. } => frames += 1,
                SessionUpdate::Saved(_) => saved += 1,
                SessionUpdate::BatchProgress { .. } => {}
                SessionUpdate::BatchFinished(summary) => return (summary, frames, saved),
            }
        }
    }

    #[test]
    fn test_batch_worker_processes_all_files() {
        let (handle, rx) = spawn_batch(ListSource::new(3), batch_runner(vec![]));

        let (summary, frames, saved) = drain_until_finished(&rx);
        assert_eq!(summary.files_processed, 3);
        assert_eq!(summary.events_saved, 0);
        assert!(!summary.cancelled);
        // Previews are disposable, but at least the first always lands.
        assert!((1..=3).contains(&frames));
        assert_eq!(saved, 0);

        assert_eq!(handle.stop(Duration::from_secs(1)), JoinOutcome::Stopped);
    }

    #[test]
    fn test_batch_worker_counts_saved_events() {
        let hit = RawDetection {
            bounds: PixelBox::new(10, 10, 20, 20),
            confidence: 9.0,
        };
        let (handle, rx) = spawn_batch(ListSource::new(2), batch_runner(vec![hit]));

        let (summary, _, saved) = drain_until_finished(&rx);
        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.events_saved, 2);
        assert_eq!(saved, 2);

        handle.stop(Duration::from_secs(1));
    }

    #[test]
    fn test_stop_cancels_between_files() {
        let source = ListSource::new(1000).slow(Duration::from_millis(5));
        let (handle, rx) = spawn_batch(source, batch_runner(vec![]));

        // Let a few files through, then cancel.
        let _ = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(handle.stop(Duration::from_secs(5)), JoinOutcome::Stopped);

        let (summary, _, _) = drain_until_finished(&rx);
        assert!(summary.cancelled);
        assert!(summary.files_processed < 1000);
    }

    #[test]
    fn test_worker_stops_when_consumer_disconnects() {
        let source = ListSource::new(1000).slow(Duration::from_millis(1));
        let info = source.info();
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn_worker(
            Box::new(source),
            batch_runner(vec![RawDetection {
                bounds: PixelBox::new(10, 10, 20, 20),
                confidence: 9.0,
            }]),
            info,
            small_config(),
            tx,
            Arc::new(StatusCell::new()),
        );

        drop(rx);
        // With the consumer gone the reliable send fails and the worker
        // winds down on its own.
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(handle.is_finished());
        handle.stop(Duration::from_secs(1));
    }

    #[test]
    fn test_status_snapshot_published_per_cycle() {
        let source = ListSource::new(2);
        let info = source.info();
        let (tx, rx) = crossbeam_channel::unbounded();
        let status = Arc::new(StatusCell::new());
        let handle = spawn_worker(
            Box::new(source),
            batch_runner(vec![]),
            info,
            small_config(),
            tx,
            status.clone(),
        );

        drain_until_finished(&rx);
        handle.stop(Duration::from_secs(1));

        let snapshot = status.load();
        assert_eq!(snapshot.descriptor, "Folder test");
        assert_eq!((snapshot.width, snapshot.height), (64, 48));
    }

    #[test]
    fn test_batch_frames_carry_no_info_block() {
        let (handle, rx) = spawn_batch(ListSource::new(1), batch_runner(vec![]));

        loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                SessionUpdate::Frame { labels, .. } => {
                    assert!(labels.iter().all(|l| !l.text.starts_with("FPS")));
                }
                SessionUpdate::BatchFinished(_) => break,
                _ => {}
            }
        }
        handle.stop(Duration::from_secs(1));
    }

    #[test]
    fn test_info_block_lines() {
        let snapshot = StatusSnapshot {
            descriptor: "Camera 0 (synthetic)".to_string(),
            width: 640,
            height: 480,
            fps: 12.34,
            flags: crate::shared::status::DetectionFlags {
                face_in_roi: true,
                plate_found: false,
            },
        };
        let labels = info_block(&snapshot);
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0].text, "FPS: 12.3");
        assert_eq!(labels[3].text, "FACE IN ROI!");
        // Lines stack downward from the top-left corner.
        assert!(labels[1].y > labels[0].y);
    }

    #[test]
    fn test_fps_counter_warms_up_from_zero() {
        let mut fps = FpsCounter::new();
        assert_eq!(fps.tick(), 0.0);
        std::thread::sleep(Duration::from_millis(1100));
        let rate = fps.tick();
        assert!(rate > 0.0 && rate < 100.0);
    }
}
