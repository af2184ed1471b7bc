//! Camera capture sources.
//!
//! The acquisition loop drives a single exclusively-owned [`Camera`]. A
//! `stub://` device renders a deterministic synthetic scene (always
//! available, used by tests and dry runs); real V4L2 devices sit behind the
//! `capture-v4l2` feature.
//!
//! Fault contract: `configure` and `release` faults are fatal to the run;
//! `capture_to` faults are per-iteration failures the loop absorbs.

mod synthetic;
#[cfg(feature = "capture-v4l2")]
mod v4l2;

use std::path::Path;

use anyhow::Result;

use synthetic::SyntheticCamera;
#[cfg(feature = "capture-v4l2")]
use v4l2::DeviceCamera;

/// Configuration for a capture source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device identifier: `stub://...` or a V4L2 node such as `/dev/video0`.
    pub device: String,
    /// Requested frame width, px.
    pub width: u32,
    /// Requested frame height, px.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://overhead".to_string(),
            width: 4056,
            height: 3040,
        }
    }
}

/// Statistics for a capture source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

/// Exclusively-owned capture handle.
pub struct Camera {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "capture-v4l2")]
    Device(DeviceCamera),
}

impl Camera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            })
        } else {
            #[cfg(feature = "capture-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceCamera::new(config)?),
                })
            }
            #[cfg(not(feature = "capture-v4l2"))]
            {
                Err(anyhow::anyhow!(
                    "device '{}' requires the capture-v4l2 feature",
                    config.device
                ))
            }
        }
    }

    /// Open the device and apply the configured resolution. Fatal on error.
    pub fn configure(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.configure(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(camera) => camera.configure(),
        }
    }

    /// Capture one frame and write it to `path` as a JPEG. Blocking.
    pub fn capture_to(&mut self, path: &Path) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.capture_to(path),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(camera) => camera.capture_to(path),
        }
    }

    /// Release the capture handle. Consumes the camera so release happens
    /// exactly once; a fault here is fatal.
    pub fn release(self) -> Result<()> {
        match self.backend {
            CameraBackend::Synthetic(camera) => camera.release(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(camera) => camera.release(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(camera) => camera.stats(),
        }
    }
}
