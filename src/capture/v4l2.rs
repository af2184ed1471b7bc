//! V4L2 capture backend (`capture-v4l2` feature).
//!
//! Opens a local device node, streams RGB frames via mmap buffers, and
//! writes each captured frame to disk as a JPEG. The device handle and its
//! stream are released together when the camera is released.

use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use ouroboros::self_referencing;

use super::{CameraConfig, CameraStats};

const JPEG_QUALITY: u8 = 90;

pub struct DeviceCamera {
    config: CameraConfig,
    state: Option<DeviceState>,
    frames_captured: u64,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceCamera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frames_captured: 0,
        })
    }

    pub fn configure(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = device
            .set_format(&format)
            .with_context(|| format!("set v4l2 format on {}", self.config.device))?;
        self.active_width = format.width;
        self.active_height = format.height;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "camera: configured {} at {}x{}",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    pub fn capture_to(&mut self, path: &Path) -> Result<()> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not configured")?;
        let (width, height) = (self.active_width, self.active_height);
        let frame = state.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, _meta) = fields
                .stream
                .next()
                .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))?;
            let expected = (width * height * 3) as usize;
            if buf.len() < expected {
                return Err(anyhow!(
                    "short v4l2 frame: {} bytes, expected {}",
                    buf.len(),
                    expected
                ));
            }
            Ok(buf[..expected].to_vec())
        })?;

        let file = std::fs::File::create(path)
            .with_context(|| format!("create capture file {}", path.display()))?;
        let writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
        encoder
            .write_image(&frame, width, height, ExtendedColorType::Rgb8)
            .with_context(|| format!("encode capture to {}", path.display()))?;

        self.frames_captured += 1;
        Ok(())
    }

    pub fn release(self) -> Result<()> {
        // Dropping the state closes the stream and the device node.
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
}
