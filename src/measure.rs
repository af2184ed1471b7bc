//! Pairwise feature-displacement measurement.
//!
//! Given two retained frames, decodes both to single-channel intensity,
//! obtains cross-checked feature correspondences from the configured
//! backend, and reduces them to one scalar: the mean Euclidean pixel
//! displacement. All matches contribute, unweighted; the backend's distance
//! ranking is not used here.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use image::GrayImage;

use crate::features::{FeatureBackend, FeatureMatch, Keypoint};
use crate::frame::Frame;

/// Mean pixel displacement for one frame pair plus the elapsed time between
/// the two captures.
#[derive(Clone, Copy, Debug)]
pub struct DisplacementSample {
    pub mean_px: f64,
    pub elapsed: Duration,
}

impl DisplacementSample {
    /// A sample can feed the solver only with positive elapsed time and
    /// resolvable motion. Zero displacement is legal but yields no velocity.
    pub fn usable(&self) -> bool {
        !self.elapsed.is_zero() && self.mean_px > 0.0
    }
}

/// Measure the mean feature displacement between two frames.
///
/// Backend faults and image decode faults propagate as errors; the
/// acquisition loop absorbs them as per-iteration failures. Zero
/// correspondences yield a displacement of exactly 0.0, not an error.
pub fn measure(
    backend: &mut dyn FeatureBackend,
    previous: &Frame,
    current: &Frame,
    elapsed: Duration,
    max_features: usize,
) -> Result<DisplacementSample> {
    let image_a = load_luma(previous)?;
    let image_b = load_luma(current)?;

    let (keypoints_a, descriptors_a) = backend.detect_and_describe(&image_a, max_features)?;
    let (keypoints_b, descriptors_b) = backend.detect_and_describe(&image_b, max_features)?;
    let matches = backend.cross_checked_match(&descriptors_a, &descriptors_b)?;

    let mean_px = mean_displacement(&keypoints_a, &keypoints_b, &matches)?;
    Ok(DisplacementSample { mean_px, elapsed })
}

/// Arithmetic mean of the Euclidean pixel distances across all matches.
/// Defined as exactly 0.0 for an empty match set.
pub fn mean_displacement(
    keypoints_a: &[Keypoint],
    keypoints_b: &[Keypoint],
    matches: &[FeatureMatch],
) -> Result<f64> {
    if matches.is_empty() {
        return Ok(0.0);
    }
    let mut total = 0.0f64;
    for m in matches {
        let a = keypoints_a
            .get(m.query)
            .ok_or_else(|| anyhow!("match query index {} out of range", m.query))?;
        let b = keypoints_b
            .get(m.train)
            .ok_or_else(|| anyhow!("match train index {} out of range", m.train))?;
        total += f64::from(a.x - b.x).hypot(f64::from(a.y - b.y));
    }
    Ok(total / matches.len() as f64)
}

fn load_luma(frame: &Frame) -> Result<GrayImage> {
    let image = image::open(&frame.path)
        .with_context(|| format!("decode frame {} at {}", frame.index, frame.path.display()))?;
    Ok(image.into_luma8())
}
