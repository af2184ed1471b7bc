//! Feature detection and matching capability.
//!
//! The estimator core treats keypoint detection, description, and matching
//! as an external capability behind [`FeatureBackend`]. Two backends ship:
//!
//! - `cpu`: FAST-9 corners, 256-bit binary descriptors, brute-force Hamming
//!   cross-check matching. The default for real captures.
//! - `stub`: deterministic synthetic correspondences with configurable
//!   per-frame drift and scriptable match faults. Used by tests.

pub mod backend;
pub mod backends;

use anyhow::{anyhow, Result};

pub use backend::{Descriptor, FeatureBackend, FeatureMatch, Keypoint};
pub use backends::{CpuBackend, StubBackend};

/// Construct a feature backend by configured name.
pub fn backend_from_name(name: &str) -> Result<Box<dyn FeatureBackend>> {
    match name {
        "cpu" => Ok(Box::new(CpuBackend::new())),
        "stub" => Ok(Box::new(StubBackend::new())),
        other => Err(anyhow!("unknown feature backend '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_backends() {
        assert_eq!(backend_from_name("cpu").unwrap().name(), "cpu");
        assert_eq!(backend_from_name("stub").unwrap().name(), "stub");
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(backend_from_name("gpu").is_err());
    }
}
