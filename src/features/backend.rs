use anyhow::Result;
use image::GrayImage;

/// A detected keypoint in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

/// 256-bit binary descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Descriptor(pub [u8; 32]);

impl Descriptor {
    /// Hamming distance to another descriptor.
    pub fn distance(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// A cross-checked correspondence between two descriptor sets.
///
/// `query`/`train` index into the first and second keypoint lists handed to
/// `cross_checked_match`. `distance` is the backend's internal ranking value;
/// callers must not depend on its absolute scale.
#[derive(Clone, Copy, Debug)]
pub struct FeatureMatch {
    pub query: usize,
    pub train: usize,
    pub distance: u32,
}

/// Feature detection/description/matching capability.
///
/// Backends own the whole keypoint pipeline for one camera; the estimator
/// core only consumes matched pixel coordinates. Implementations must be
/// deterministic for a given image so that repeated description of the same
/// frame (each pair re-describes its older frame) yields identical
/// keypoints.
pub trait FeatureBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Detect up to `max_features` keypoints and compute their descriptors.
    ///
    /// The returned vectors are parallel: `descriptors[i]` describes
    /// `keypoints[i]`.
    fn detect_and_describe(
        &mut self,
        image: &GrayImage,
        max_features: usize,
    ) -> Result<(Vec<Keypoint>, Vec<Descriptor>)>;

    /// Mutual-best-match pairs between two descriptor sets, ranked ascending
    /// by descriptor distance. A pair is kept only when each side is the
    /// other's single best match (cross-check symmetry).
    fn cross_checked_match(
        &mut self,
        query: &[Descriptor],
        train: &[Descriptor],
    ) -> Result<Vec<FeatureMatch>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_distance_counts_differing_bits() {
        let a = Descriptor([0u8; 32]);
        let mut bits = [0u8; 32];
        bits[0] = 0b1010_0000;
        bits[31] = 0b0000_0001;
        let b = Descriptor(bits);
        assert_eq!(a.distance(&b), 3);
        assert_eq!(b.distance(&a), 3);
        assert_eq!(a.distance(&a), 0);
    }
}
