use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::CameraConfig;
use crate::geometry::{
    Geometry, DEFAULT_FOCAL_LENGTH_M, DEFAULT_PIXEL_COUNT, DEFAULT_SENSOR_WIDTH_M,
};

const DEFAULT_IMAGE_DIR: &str = "img";
const DEFAULT_RESULT_PATH: &str = "result.txt";
const DEFAULT_DEVICE: &str = "stub://overhead";
const DEFAULT_WIDTH: u32 = 4056;
const DEFAULT_HEIGHT: u32 = 3040;
const DEFAULT_RUN_SECS: u64 = 9 * 60;
const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 1_000;
const DEFAULT_RETAIN_FRAMES: usize = 42;
const DEFAULT_MAX_FEATURES: usize = 1_000;
const DEFAULT_BACKEND: &str = "cpu";

#[derive(Debug, Deserialize, Default)]
struct GroundtrackConfigFile {
    image_dir: Option<PathBuf>,
    result_path: Option<PathBuf>,
    camera: Option<CameraConfigFile>,
    run: Option<RunConfigFile>,
    geometry: Option<GeometryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RunConfigFile {
    duration_secs: Option<u64>,
    capture_interval_ms: Option<u64>,
    retain_frames: Option<usize>,
    max_features: Option<usize>,
    backend: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct GeometryConfigFile {
    focal_length_m: Option<f64>,
    sensor_width_m: Option<f64>,
    pixel_count: Option<u32>,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct GroundtrackConfig {
    /// Directory captured frames are written to.
    pub image_dir: PathBuf,
    /// Path the final estimate is written to.
    pub result_path: PathBuf,
    pub camera: CameraConfig,
    /// Total wall-clock run duration bound.
    pub run_duration: Duration,
    /// Pacing delay between capture iterations.
    pub capture_interval: Duration,
    /// Frame retention capacity bound.
    pub retain_frames: usize,
    /// Feature ceiling per frame.
    pub max_features: usize,
    /// Feature backend name.
    pub backend: String,
    pub geometry: Geometry,
}

impl Default for GroundtrackConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            result_path: PathBuf::from(DEFAULT_RESULT_PATH),
            camera: CameraConfig {
                device: DEFAULT_DEVICE.to_string(),
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
            },
            run_duration: Duration::from_secs(DEFAULT_RUN_SECS),
            capture_interval: Duration::from_millis(DEFAULT_CAPTURE_INTERVAL_MS),
            retain_frames: DEFAULT_RETAIN_FRAMES,
            max_features: DEFAULT_MAX_FEATURES,
            backend: DEFAULT_BACKEND.to_string(),
            geometry: Geometry::default(),
        }
    }
}

impl GroundtrackConfig {
    /// Resolve configuration from the optional `GROUNDTRACK_CONFIG` TOML
    /// file, then environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GROUNDTRACK_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Resolve configuration from an explicit TOML file path, then
    /// environment overrides, then validation. `None` resolves pure
    /// defaults plus environment.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => GroundtrackConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GroundtrackConfigFile) -> Self {
        let defaults = Self::default();
        let camera = file.camera.unwrap_or_default();
        let run = file.run.unwrap_or_default();
        let geometry = file.geometry.unwrap_or_default();
        Self {
            image_dir: file.image_dir.unwrap_or(defaults.image_dir),
            result_path: file.result_path.unwrap_or(defaults.result_path),
            camera: CameraConfig {
                device: camera.device.unwrap_or(defaults.camera.device),
                width: camera.width.unwrap_or(defaults.camera.width),
                height: camera.height.unwrap_or(defaults.camera.height),
            },
            run_duration: run
                .duration_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.run_duration),
            capture_interval: run
                .capture_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.capture_interval),
            retain_frames: run.retain_frames.unwrap_or(defaults.retain_frames),
            max_features: run.max_features.unwrap_or(defaults.max_features),
            backend: run.backend.unwrap_or(defaults.backend),
            geometry: Geometry {
                focal_length_m: geometry.focal_length_m.unwrap_or(DEFAULT_FOCAL_LENGTH_M),
                sensor_width_m: geometry.sensor_width_m.unwrap_or(DEFAULT_SENSOR_WIDTH_M),
                pixel_count: geometry.pixel_count.unwrap_or(DEFAULT_PIXEL_COUNT),
                ..Geometry::default()
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("GROUNDTRACK_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(dir) = std::env::var("GROUNDTRACK_IMAGE_DIR") {
            if !dir.trim().is_empty() {
                self.image_dir = PathBuf::from(dir);
            }
        }
        if let Ok(path) = std::env::var("GROUNDTRACK_RESULT_PATH") {
            if !path.trim().is_empty() {
                self.result_path = PathBuf::from(path);
            }
        }
        if let Ok(backend) = std::env::var("GROUNDTRACK_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend;
            }
        }
        if let Ok(secs) = std::env::var("GROUNDTRACK_DURATION_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| anyhow!("GROUNDTRACK_DURATION_SECS must be an integer"))?;
            self.run_duration = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.run_duration.is_zero() {
            return Err(anyhow!("run duration must be greater than zero"));
        }
        if self.retain_frames < 2 {
            return Err(anyhow!(
                "retain_frames must be at least 2 to keep the comparison window alive"
            ));
        }
        if self.max_features == 0 {
            return Err(anyhow!("max_features must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera resolution must be non-zero"));
        }
        if self.geometry.focal_length_m <= 0.0 || self.geometry.sensor_width_m <= 0.0 {
            return Err(anyhow!("camera geometry must be positive"));
        }
        if self.geometry.pixel_count == 0 {
            return Err(anyhow!("geometry pixel_count must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<GroundtrackConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let cfg = toml::from_str(&raw)
        .with_context(|| format!("parse config file {}", path.display()))?;
    Ok(cfg)
}
