// Process-wide settings, loaded once at startup and never mutated.
//
// Sources, lowest precedence first: built-in defaults, an optional TOML file,
// then `HAZARD_*` environment variables (e.g. `HAZARD_LOG_ROOT=/var/log/hazard`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "hazard_vision.toml";
const ENV_PREFIX: &str = "HAZARD";

/// Where the detector runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cpu,
    Cuda,
}

impl ComputeDevice {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(ComputeDevice::Cpu),
            "cuda" | "gpu" => Ok(ComputeDevice::Cuda),
            other => Err(ConfigError::UnknownDevice(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    model_path: PathBuf,
    device: String,
    log_root: PathBuf,
    video_root: PathBuf,
    log_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// ONNX export of the object detection model.
    pub model_path: PathBuf,
    pub device: ComputeDevice,
    /// Root of the date/zone alert log tree.
    pub log_root: PathBuf,
    /// Directory holding one recorded feed per zone.
    pub video_root: PathBuf,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl AppConfig {
    /// Loads defaults, then `file` (or `hazard_vision.toml` in the working
    /// directory when present), then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("model_path", "models/yolov8s.onnx")?
            .set_default("device", "cpu")?
            .set_default("log_root", "logs")?
            .set_default("video_root", "videos")?
            .set_default("log_level", "info")?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let raw: RawConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        Ok(Self {
            model_path: raw.model_path,
            device: ComputeDevice::parse(&raw.device)?,
            log_root: raw.log_root,
            video_root: raw.video_root,
            log_level: raw.log_level,
        })
    }
}
