mod cv_frame;
mod devices;
mod reports;
mod yolo;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hazard_vision::config::AppConfig;
use hazard_vision::core_modules::video_catalog::{list_videos, zone_name_for};
use hazard_vision::pipeline::FrameProcessor;
use hazard_vision::session::{MonitoringSession, SessionEnd};
use hazard_vision::{AlertStore, Palette, RiskModel};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::devices::{CaptureSource, WindowDisplay};
use crate::yolo::YoloDetector;

#[derive(Parser, Debug)]
#[command(name = "monitor", about = "Camera hazard monitoring and alert reports")]
struct Cli {
    /// Configuration file (defaults to ./hazard_vision.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor one camera feed until it ends or `q` is pressed.
    Watch {
        /// A video path, or a file name inside the video root.
        video: String,
        /// Zone name for alerts (defaults to the video's file stem).
        #[arg(long)]
        zone: Option<String>,
        /// Also write the annotated stream to this file.
        #[arg(long, value_name = "PATH")]
        record: Option<PathBuf>,
        /// Do not open a window.
        #[arg(long)]
        headless: bool,
    },
    /// List the recorded feeds in the video root.
    Videos,
    /// List alert archives, newest first.
    Dates,
    /// List the zones with alerts on a date (default: today).
    Zones { date: Option<String> },
    /// Summarize one zone's alerts for a date.
    Report {
        date: String,
        zone: String,
        /// Print the whole log file instead of the summary.
        #[arg(long)]
        raw: bool,
    },
    /// Show environment and configuration details.
    Info,
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn resolve_video(video: &str, video_root: &Path) -> PathBuf {
    let direct = PathBuf::from(video);
    if direct.exists() {
        direct
    } else {
        video_root.join(video)
    }
}

fn watch(cfg: &AppConfig, store: AlertStore, video: &str, zone: Option<String>, record: Option<PathBuf>, headless: bool) -> Result<()> {
    let path = resolve_video(video, &cfg.video_root);
    let zone = zone.unwrap_or_else(|| zone_name_for(&path));
    let location = path.to_string_lossy().into_owned();
    info!(zone = %zone, video = %location, "initializing zone");

    let detector = YoloDetector::load(&cfg.model_path, cfg.device)?;

    let mut display = WindowDisplay::new(headless);
    if let Some(record) = record {
        // Probe the source once for the recorder's geometry.
        let probe = CaptureSource::open(&location)?;
        let record = record.to_string_lossy().into_owned();
        display = display.record_to(&record, probe.fps(), probe.frame_size())?;
    }

    let processor = FrameProcessor::new(zone, RiskModel::default(), Palette::default(), store);
    let mut session = MonitoringSession::new(detector, display, processor);
    if !headless {
        println!("Press 'q' in the video window to stop.");
    }
    let report = session.run(&location, CaptureSource::open);

    println!(
        "{} frames processed, {} alerts logged, {} degraded frames.",
        report.frames_processed, report.alerts_logged, report.frames_degraded
    );
    match report.end {
        SessionEnd::OpenFailed(reason) => bail!("could not open video: {reason}"),
        SessionEnd::ReadFailed(reason) => println!("Stream interrupted: {reason}"),
        SessionEnd::DisplayFailed(reason) => println!("Display stopped: {reason}"),
        SessionEnd::SourceExhausted => println!("End of video stream."),
        SessionEnd::StopRequested => println!("Monitoring stopped by operator."),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&cfg.log_level);

    let store = AlertStore::open(&cfg.log_root)
        .with_context(|| format!("opening alert log at {}", cfg.log_root.display()))?;

    match cli.command {
        Command::Watch {
            video,
            zone,
            record,
            headless,
        } => watch(&cfg, store, &video, zone, record, headless)?,
        Command::Videos => {
            let videos = list_videos(&cfg.video_root)?;
            if videos.is_empty() {
                println!("No video found in '{}'.", cfg.video_root.display());
            }
            for (i, video) in videos.iter().enumerate() {
                println!(" [{}] {}  (zone {})", i + 1, video.display(), zone_name_for(video));
            }
        }
        Command::Dates => reports::print_dates(&store.enumerate_dates()?),
        Command::Zones { date } => {
            let date = match date {
                Some(date) => AlertStore::parse_date(&date)?,
                None => AlertStore::today(),
            };
            match store.enumerate_zones(date) {
                Ok(zones) => reports::print_zones(date, &zones),
                Err(hazard_vision::error::StoreError::UnknownDate(date)) => {
                    println!("No data recorded for {date}. Run a monitoring session to create logs.");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Report { date, zone, raw } => {
            let date = AlertStore::parse_date(&date)?;
            if raw {
                reports::print_raw(&store.read_raw(date, &zone)?);
            } else {
                reports::print_summary(date, &zone, &store.summarize_zone(date, &zone)?);
            }
        }
        Command::Info => reports::print_info(&cfg.model_path, store.root()),
    }
    Ok(())
}
