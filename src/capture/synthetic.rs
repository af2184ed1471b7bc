use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder};

use super::{CameraConfig, CameraStats};

/// Ground-track drift of the synthetic scene, px per captured frame.
const SCENE_DRIFT_PX: i64 = 12;

/// Spacing of the synthetic ground texture, px.
const TEXTURE_PERIOD: i64 = 48;

/// Side length of the bright texture patches, px.
const TEXTURE_PATCH: i64 = 10;

const JPEG_QUALITY: u8 = 90;

/// Synthetic camera for `stub://` devices.
///
/// Renders a fixed world-space patch texture that translates by
/// [`SCENE_DRIFT_PX`] between captures, so consecutive frames carry a known
/// pixel displacement for the feature pipeline to recover. Deterministic:
/// frame k always renders the same image.
pub struct SyntheticCamera {
    config: CameraConfig,
    configured: bool,
    frames_captured: u64,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            configured: false,
            frames_captured: 0,
        }
    }

    pub fn configure(&mut self) -> Result<()> {
        self.configured = true;
        log::info!(
            "camera: configured {} at {}x{} (synthetic)",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub fn capture_to(&mut self, path: &Path) -> Result<()> {
        if !self.configured {
            return Err(anyhow!("camera not configured"));
        }
        let image = self.render(self.frames_captured);
        write_jpeg(&image, path)?;
        self.frames_captured += 1;
        Ok(())
    }

    pub fn release(self) -> Result<()> {
        log::info!(
            "camera: released {} after {} frames",
            self.config.device,
            self.frames_captured
        );
        Ok(())
    }

    pub fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frames_captured,
            device: self.config.device.clone(),
        }
    }

    fn render(&self, frame_index: u64) -> GrayImage {
        let offset = frame_index as i64 * SCENE_DRIFT_PX;
        GrayImage::from_fn(self.config.width, self.config.height, |x, y| {
            // World coordinates: the scene scrolls left as the platform
            // moves, so texture at world x appears at pixel x - offset.
            let wx = i64::from(x) + offset;
            let wy = i64::from(y);
            image::Luma([texture(wx, wy)])
        })
    }
}

/// Bright patches on a dark background, on a fixed world-space grid.
fn texture(wx: i64, wy: i64) -> u8 {
    let px = wx.rem_euclid(TEXTURE_PERIOD);
    let py = wy.rem_euclid(TEXTURE_PERIOD);
    if px < TEXTURE_PATCH && py < TEXTURE_PATCH {
        220
    } else {
        // Faint stable variation so flat regions are not byte-identical.
        30 + ((wx / TEXTURE_PERIOD * 7 + wy / TEXTURE_PERIOD * 13).rem_euclid(5)) as u8
    }
}

fn write_jpeg(image: &GrayImage, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("create capture file {}", path.display()))?;
    let writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::L8,
        )
        .with_context(|| format!("encode capture to {}", path.display()))?;
    Ok(())
}
