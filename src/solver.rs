//! Height-velocity fixed-point solver.
//!
//! The orbital-velocity law gives speed from altitude; the pinhole
//! projection law gives altitude from speed, elapsed time, and mean pixel
//! displacement. The two are mutually dependent, so the solver alternates
//! them from a fixed seed altitude for a fixed number of rounds. The round
//! count is an empirical choice trading accuracy for bounded per-pair
//! latency; there is deliberately no tolerance check, to stay numerically
//! compatible with historical results.

use crate::geometry::Geometry;
use crate::measure::DisplacementSample;

/// Fixed-point rounds per frame pair.
pub const SOLVER_ROUNDS: u32 = 8;

/// Seed altitude for each per-pair solve, m.
pub const SEED_ALTITUDE_SOLVER_M: f64 = 400_000.0;

/// Outcome of solving one frame pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SolveOutcome {
    /// Converged on a consistent velocity/altitude pair.
    Converged { velocity_mps: f64, altitude_m: f64 },
    /// No velocity can be derived from this pair. Zero displacement,
    /// non-positive elapsed time, and arithmetic domain faults all land
    /// here; none of them is an error.
    Skipped,
}

/// Solve one displacement sample against the run geometry.
pub fn solve(sample: &DisplacementSample, geometry: &Geometry) -> SolveOutcome {
    if !sample.usable() {
        return SolveOutcome::Skipped;
    }
    let (velocity_mps, altitude_m) = converge(
        sample.mean_px,
        sample.elapsed.as_secs_f64(),
        geometry,
        SOLVER_ROUNDS,
    );
    if !velocity_mps.is_finite() || !altitude_m.is_finite() || velocity_mps <= 0.0 {
        return SolveOutcome::Skipped;
    }
    SolveOutcome::Converged {
        velocity_mps,
        altitude_m,
    }
}

/// Run the fixed-point iteration for `rounds` rounds and return the final
/// (velocity m/s, altitude m) pair.
///
/// Exposed with a round-count parameter so partial convergence can be
/// observed; [`solve`] always uses [`SOLVER_ROUNDS`]. With `mean_px == 0`
/// the altitude update is skipped every round (division guard) and the
/// result is meaningless; callers must treat that case as skipped.
pub fn converge(mean_px: f64, elapsed_s: f64, geometry: &Geometry, rounds: u32) -> (f64, f64) {
    let mut altitude_m = SEED_ALTITUDE_SOLVER_M;
    let mut velocity_mps = 0.0;
    for _ in 0..rounds {
        velocity_mps = geometry.orbital_velocity(altitude_m);
        if mean_px != 0.0 {
            altitude_m = velocity_mps * elapsed_s * geometry.projection_factor()
                / (geometry.sensor_width_m * mean_px);
        }
    }
    (velocity_mps, altitude_m)
}
