//! groundtrack
//!
//! Ground-track speed estimation for a downward-looking camera platform
//! moving above a rotating body. The daemon captures a time-stamped frame
//! sequence, measures feature displacement between consecutive frames, and
//! resolves the unknown altitude through a circular-orbit velocity model.
//!
//! # Pipeline
//!
//! 1. Acquisition loop captures one frame per iteration and retains it in a
//!    bounded on-disk store (oldest frames evicted and deleted).
//! 2. Correspondence measurer reduces each consecutive frame pair to one
//!    scalar: mean pixel displacement across cross-checked feature matches.
//! 3. Height-velocity solver fixed-point iterates the orbital-velocity and
//!    pinhole-projection laws to a consistent (altitude, velocity) pair.
//! 4. Aggregator averages all per-pair velocities into the final km/s
//!    estimate, falling back to a documented constant when no pair
//!    succeeded. The run always writes a result.
//!
//! # Module Structure
//!
//! - `capture`: camera sources (synthetic `stub://`, feature-gated V4L2)
//! - `features`: keypoint detection/description/matching backends
//! - `frame`: captured frames and the bounded retention store
//! - `measure`, `solver`, `aggregate`: the estimation core
//! - `run`: the timed acquisition loop with per-iteration fault isolation
//! - `config`, `geometry`: run configuration and physical constants

pub mod aggregate;
pub mod capture;
pub mod config;
pub mod features;
pub mod frame;
pub mod geometry;
pub mod measure;
pub mod run;
pub mod solver;

pub use aggregate::{finalize, Estimate, FALLBACK_VELOCITY_MPS};
pub use capture::{Camera, CameraConfig, CameraStats};
pub use config::GroundtrackConfig;
pub use features::{
    backend_from_name, CpuBackend, Descriptor, FeatureBackend, FeatureMatch, Keypoint, StubBackend,
};
pub use frame::{Frame, FrameStore};
pub use geometry::Geometry;
pub use measure::{measure, DisplacementSample};
pub use run::{run, PairOutcome, RunSummary, SEED_ALTITUDE_HISTORY_M};
pub use solver::{solve, SolveOutcome, SEED_ALTITUDE_SOLVER_M, SOLVER_ROUNDS};
