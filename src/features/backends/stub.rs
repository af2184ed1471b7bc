use anyhow::{anyhow, Result};
use image::GrayImage;

use crate::features::backend::{Descriptor, FeatureBackend, FeatureMatch, Keypoint};

/// Stub backend for tests. Ignores pixel content.
///
/// Emits a fixed grid of keypoints translated by `drift` pixels on every
/// successive `detect_and_describe` call, so two consecutive calls (one
/// frame pair) always differ by exactly `drift`. Matching pairs keypoints
/// by grid position; match calls listed in `fail_match_calls` return an
/// error instead, for fault-isolation tests.
pub struct StubBackend {
    drift: (f32, f32),
    detect_calls: u64,
    match_calls: u64,
    fail_match_calls: Vec<u64>,
}

const GRID_SIDE: u32 = 8;
const GRID_SPACING: f32 = 24.0;
const GRID_ORIGIN: f32 = 16.0;

impl StubBackend {
    pub fn new() -> Self {
        Self::with_drift(0.0, 0.0)
    }

    /// Stub whose keypoints translate by `(dx, dy)` pixels per detect call.
    pub fn with_drift(dx: f32, dy: f32) -> Self {
        Self {
            drift: (dx, dy),
            detect_calls: 0,
            match_calls: 0,
            fail_match_calls: Vec::new(),
        }
    }

    /// Make the n-th `cross_checked_match` call (0-based) fail.
    pub fn fail_match_call(mut self, call: u64) -> Self {
        self.fail_match_calls.push(call);
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect_and_describe(
        &mut self,
        _image: &GrayImage,
        max_features: usize,
    ) -> Result<(Vec<Keypoint>, Vec<Descriptor>)> {
        let shift = self.detect_calls as f32;
        self.detect_calls += 1;

        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();
        'grid: for gy in 0..GRID_SIDE {
            for gx in 0..GRID_SIDE {
                if keypoints.len() >= max_features {
                    break 'grid;
                }
                keypoints.push(Keypoint {
                    x: GRID_ORIGIN + gx as f32 * GRID_SPACING + shift * self.drift.0,
                    y: GRID_ORIGIN + gy as f32 * GRID_SPACING + shift * self.drift.1,
                });
                // Descriptor encodes the grid slot so matching is identity.
                let mut bytes = [0u8; 32];
                bytes[0] = gx as u8;
                bytes[1] = gy as u8;
                descriptors.push(Descriptor(bytes));
            }
        }
        Ok((keypoints, descriptors))
    }

    fn cross_checked_match(
        &mut self,
        query: &[Descriptor],
        train: &[Descriptor],
    ) -> Result<Vec<FeatureMatch>> {
        let call = self.match_calls;
        self.match_calls += 1;
        if self.fail_match_calls.contains(&call) {
            return Err(anyhow!("stub matcher fault injected on call {call}"));
        }

        let count = query.len().min(train.len());
        Ok((0..count)
            .map(|i| FeatureMatch {
                query: i,
                train: i,
                distance: 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> GrayImage {
        GrayImage::new(64, 64)
    }

    #[test]
    fn consecutive_detects_differ_by_drift() {
        let mut backend = StubBackend::with_drift(10.0, 0.0);
        let (first, _) = backend.detect_and_describe(&blank(), 1000).unwrap();
        let (second, _) = backend.detect_and_describe(&blank(), 1000).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert!((b.x - a.x - 10.0).abs() < f32::EPSILON);
            assert!((b.y - a.y).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn zero_drift_keypoints_are_stable() {
        let mut backend = StubBackend::new();
        let (first, _) = backend.detect_and_describe(&blank(), 1000).unwrap();
        let (second, _) = backend.detect_and_describe(&blank(), 1000).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn respects_feature_ceiling() {
        let mut backend = StubBackend::new();
        let (keypoints, descriptors) = backend.detect_and_describe(&blank(), 5).unwrap();
        assert_eq!(keypoints.len(), 5);
        assert_eq!(descriptors.len(), 5);
    }

    #[test]
    fn injected_fault_hits_only_the_requested_call() {
        let mut backend = StubBackend::new().fail_match_call(1);
        let (_, desc) = backend.detect_and_describe(&blank(), 1000).unwrap();
        assert!(backend.cross_checked_match(&desc, &desc).is_ok());
        assert!(backend.cross_checked_match(&desc, &desc).is_err());
        assert!(backend.cross_checked_match(&desc, &desc).is_ok());
    }
}
