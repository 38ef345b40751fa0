use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use watchcap_core::capture::domain::camera::CameraOpener;
use watchcap_core::capture::domain::event_writer::EventWriter;
use watchcap_core::capture::infrastructure::fs_event_writer::FsEventWriter;
use watchcap_core::capture::infrastructure::synthetic_camera::SyntheticCameraOpener;
use watchcap_core::detection::domain::detection::DetectionClass;
use watchcap_core::detection::domain::object_detector::ObjectDetector;
use watchcap_core::detection::infrastructure::stub_detector::StubDetector;
use watchcap_core::session::controller::{DetectorFactory, SessionController};
use watchcap_core::session::worker::SessionUpdate;
use watchcap_core::shared::config::{CaptureConfig, ConfigHandle};
use watchcap_core::shared::constants::MAX_CAMERA_PROBE_INDEX;

/// Region-restricted face and license-plate capture from cameras and
/// image folders.
#[derive(Parser)]
#[command(name = "watchcap")]
struct Cli {
    /// Configuration snapshot (JSON). Defaults apply when the file is absent.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Stand-in detector confidence. Real backends plug in through the
    /// core's ObjectDetector seam; this build wires the stub backend.
    #[arg(long, default_value = "6.0")]
    stub_confidence: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream from a camera, saving accepted detections until interrupted.
    Live {
        /// Camera index to open.
        #[arg(long, default_value = "0")]
        camera: u32,

        /// Stop after this many seconds (runs until killed when omitted).
        #[arg(long)]
        duration: Option<u64>,

        /// Use the synthetic camera backend instead of real hardware.
        #[arg(long)]
        synthetic: bool,
    },
    /// Process every image in a folder once, unthrottled.
    Batch {
        /// Folder of images to process.
        folder: PathBuf,
    },
    /// List camera indices that currently open.
    Probe {
        #[arg(long, default_value_t = MAX_CAMERA_PROBE_INDEX)]
        max_index: u32,

        #[arg(long)]
        synthetic: bool,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let stub_confidence = cli.stub_confidence;

    match cli.command {
        Command::Live {
            camera,
            duration,
            synthetic,
        } => run_live(config, stub_confidence, camera, duration, synthetic),
        Command::Batch { folder } => run_batch(config, stub_confidence, &folder),
        Command::Probe {
            max_index,
            synthetic,
        } => {
            let opener = build_opener(synthetic)?;
            let available = opener.probe(max_index);
            if available.is_empty() {
                println!("No cameras detected");
            } else {
                for index in available {
                    println!("Camera {index}");
                }
            }
            Ok(())
        }
    }
}

fn run_live(
    config: CaptureConfig,
    stub_confidence: f64,
    camera: u32,
    duration: Option<u64>,
    synthetic: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let opener = build_opener(synthetic)?;
    let (mut controller, updates) = build_controller(opener, config, stub_confidence);

    controller.start_live(camera)?;
    log::info!("live capture running on camera {camera}");

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match updates.recv_timeout(Duration::from_millis(250)) {
            Ok(SessionUpdate::Frame { snapshot, .. }) => {
                eprint!(
                    "\r{} @ {}x{}  FPS: {:5.1}  face: {}  plate: {}   ",
                    snapshot.descriptor,
                    snapshot.width,
                    snapshot.height,
                    snapshot.fps,
                    mark(snapshot.flags.face_in_roi),
                    mark(snapshot.flags.plate_found),
                );
            }
            Ok(SessionUpdate::Saved(artifact)) => {
                eprintln!();
                println!(
                    "saved {} ({:.2}) -> {}",
                    artifact.event.detection_type,
                    artifact.event.confidence_score,
                    artifact.image_path.display()
                );
            }
            Ok(_) => {}
            Err(e) if is_disconnected(&e) => break,
            Err(_) => {}
        }
    }

    eprintln!();
    controller.quit();
    Ok(())
}

fn run_batch(
    config: CaptureConfig,
    stub_confidence: f64,
    folder: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    // Batch jobs have no camera to fall back to; the synthetic opener only
    // satisfies the controller's camera seam.
    let opener: Box<dyn CameraOpener> =
        Box::new(SyntheticCameraOpener::new(640, 480).with_available(vec![]));
    let (mut controller, updates) = build_controller(opener, config, stub_confidence);

    controller.start_batch(folder)?;

    loop {
        match updates.recv() {
            Ok(SessionUpdate::BatchProgress { current, total }) => {
                eprint!("\rProcessing image {current}/{total}");
            }
            Ok(SessionUpdate::Saved(artifact)) => {
                eprintln!();
                println!(
                    "saved {} ({:.2}) -> {}",
                    artifact.event.detection_type,
                    artifact.event.confidence_score,
                    artifact.image_path.display()
                );
            }
            Ok(SessionUpdate::BatchFinished(summary)) => {
                eprintln!();
                controller.complete_batch()?;
                println!(
                    "Processed {} files, saved {} detections{}",
                    summary.files_processed,
                    summary.events_saved,
                    if summary.cancelled { " (cancelled)" } else { "" }
                );
                return Ok(());
            }
            Ok(_) => {}
            Err(_) => return Err("batch worker ended without a summary".into()),
        }
    }
}

fn build_controller(
    opener: Box<dyn CameraOpener>,
    config: CaptureConfig,
    stub_confidence: f64,
) -> (
    SessionController,
    crossbeam_channel::Receiver<SessionUpdate>,
) {
    SessionController::new(
        opener,
        Box::new(StubFactory {
            confidence: stub_confidence,
        }),
        Box::new(|| Box::new(FsEventWriter::new()) as Box<dyn EventWriter>),
        ConfigHandle::new(config),
    )
}

/// Wires the stub backend for both classes until a real detector capability
/// is linked in.
struct StubFactory {
    confidence: f64,
}

impl DetectorFactory for StubFactory {
    fn create(&self, class: DetectionClass) -> Box<dyn ObjectDetector> {
        let fraction = match class {
            DetectionClass::Face => 0.4,
            DetectionClass::Plate => 0.2,
        };
        Box::new(StubDetector::centered(fraction, self.confidence))
    }
}

fn build_opener(synthetic: bool) -> Result<Box<dyn CameraOpener>, Box<dyn std::error::Error>> {
    if synthetic {
        return Ok(Box::new(SyntheticCameraOpener::new(640, 480)));
    }
    real_opener()
}

#[cfg(feature = "camera-v4l2")]
fn real_opener() -> Result<Box<dyn CameraOpener>, Box<dyn std::error::Error>> {
    Ok(Box::new(
        watchcap_core::capture::infrastructure::v4l2_camera::V4l2CameraOpener::new(),
    ))
}

#[cfg(not(feature = "camera-v4l2"))]
fn real_opener() -> Result<Box<dyn CameraOpener>, Box<dyn std::error::Error>> {
    Err(watchcap_core::capture::domain::camera::CameraError::NoBackend.into())
}

fn load_config(path: &Path) -> Result<CaptureConfig, Box<dyn std::error::Error>> {
    if path.exists() {
        log::info!("loading configuration from {}", path.display());
        Ok(CaptureConfig::load(path)?)
    } else {
        log::info!(
            "{} not found, using default configuration",
            path.display()
        );
        Ok(CaptureConfig::default())
    }
}

fn mark(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "no "
    }
}

fn is_disconnected(err: &crossbeam_channel::RecvTimeoutError) -> bool {
    matches!(err, crossbeam_channel::RecvTimeoutError::Disconnected)
}
