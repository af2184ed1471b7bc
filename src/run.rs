//! Timed acquisition loop.
//!
//! Single logical thread of control: capture, measure, and solve for one
//! frame pair are strictly sequential, with no pipelining and no locking.
//! Every per-iteration fault is absorbed at the loop boundary and surfaces
//! only as a skip counter; a single bad frame pair never halts acquisition.
//! Only setup faults (image directory creation) escape as errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};

use crate::config::GroundtrackConfig;
use crate::features::FeatureBackend;
use crate::frame::{Frame, FrameStore};
use crate::measure;
use crate::solver::{self, SolveOutcome};
use crate::Camera;

/// Seed value for the altitude history, m. Distinct from the per-pair
/// solver seed; both are kept as separate constants deliberately.
pub const SEED_ALTITUDE_HISTORY_M: f64 = 418_000.0;

/// Classified outcome of one loop iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PairOutcome {
    /// A velocity sample was recorded.
    Sample {
        velocity_mps: f64,
        altitude_m: f64,
    },
    /// No preceding frame to compare against yet.
    FirstFrame,
    /// Steady-state capture fault; non-fatal.
    CaptureFailed,
    /// Feature detection or matching fault; non-fatal.
    MatchFailed,
    /// Zero mean displacement: no motion resolvable.
    NoMotion,
    /// Solver declined the pair (arithmetic guard).
    SolverSkipped,
}

/// Accumulated results of one acquisition run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Velocity samples in m/s, in acquisition order.
    pub velocity_samples_mps: Vec<f64>,
    /// Converged altitudes, seeded with [`SEED_ALTITUDE_HISTORY_M`].
    pub altitude_history_m: Vec<f64>,
    pub frames_captured: u64,
    pub capture_failures: u64,
    pub match_failures: u64,
    pub no_motion_pairs: u64,
    pub solver_skips: u64,
}

/// Run the acquisition loop until the wall-clock bound elapses or `stop` is
/// raised.
///
/// The bound is checked once per iteration boundary; an iteration already
/// in progress is allowed to finish. The caller owns the camera lifecycle:
/// `configure` before, `release` after, on every exit path.
pub fn run(
    cfg: &GroundtrackConfig,
    camera: &mut Camera,
    backend: &mut dyn FeatureBackend,
    stop: &AtomicBool,
) -> Result<RunSummary> {
    std::fs::create_dir_all(&cfg.image_dir)
        .with_context(|| format!("create image directory {}", cfg.image_dir.display()))?;

    let start = Instant::now();
    let mut store = FrameStore::new(cfg.retain_frames);
    let mut summary = RunSummary {
        altitude_history_m: vec![SEED_ALTITUDE_HISTORY_M],
        ..RunSummary::default()
    };

    let mut index: u64 = 0;
    while start.elapsed() < cfg.run_duration && !stop.load(Ordering::Relaxed) {
        let outcome = iterate(cfg, camera, backend, &mut store, index, &mut summary);
        match outcome {
            PairOutcome::Sample {
                velocity_mps,
                altitude_m,
            } => {
                log::info!(
                    "pair {}: v = {:.1} m/s, h = {:.0} m",
                    index,
                    velocity_mps,
                    altitude_m
                );
            }
            PairOutcome::FirstFrame => {}
            PairOutcome::CaptureFailed | PairOutcome::MatchFailed => {}
            PairOutcome::NoMotion | PairOutcome::SolverSkipped => {
                log::debug!("pair {}: skipped ({:?})", index, outcome);
            }
        }

        index += 1;
        if !cfg.capture_interval.is_zero() {
            std::thread::sleep(cfg.capture_interval);
        }
    }

    if stop.load(Ordering::Relaxed) {
        log::info!("stop requested; ending acquisition early");
    }
    log::info!(
        "acquisition done: {} frames, {} velocity samples, {} capture / {} match faults",
        summary.frames_captured,
        summary.velocity_samples_mps.len(),
        summary.capture_failures,
        summary.match_failures
    );

    // Final cleanup: every still-buffered frame is deleted exactly once.
    store.purge();
    Ok(summary)
}

fn iterate(
    cfg: &GroundtrackConfig,
    camera: &mut Camera,
    backend: &mut dyn FeatureBackend,
    store: &mut FrameStore,
    index: u64,
    summary: &mut RunSummary,
) -> PairOutcome {
    let path = cfg.image_dir.join(format!("photo_{index}.jpg"));
    if let Err(err) = camera.capture_to(&path) {
        log::warn!("frame {}: capture failed: {:#}", index, err);
        // A fault after the file was created leaves a partial capture the
        // store never learns about; unlink it so eviction stays the only
        // thing bounding disk usage.
        let _ = std::fs::remove_file(&path);
        summary.capture_failures += 1;
        return PairOutcome::CaptureFailed;
    }
    summary.frames_captured += 1;

    let frame = Frame {
        index,
        captured_at: Instant::now(),
        path,
    };
    store.retain(frame);

    let (Some(previous), Some(current)) = (store.previous(), store.latest()) else {
        return PairOutcome::FirstFrame;
    };
    let elapsed = current.captured_at.duration_since(previous.captured_at);

    let sample = match measure::measure(backend, previous, current, elapsed, cfg.max_features) {
        Ok(sample) => sample,
        Err(err) => {
            log::warn!(
                "pair ({}, {}): feature matching failed: {:#}",
                previous.index,
                current.index,
                err
            );
            summary.match_failures += 1;
            return PairOutcome::MatchFailed;
        }
    };

    if sample.mean_px == 0.0 {
        summary.no_motion_pairs += 1;
        return PairOutcome::NoMotion;
    }

    match solver::solve(&sample, &cfg.geometry) {
        SolveOutcome::Converged {
            velocity_mps,
            altitude_m,
        } => {
            summary.velocity_samples_mps.push(velocity_mps);
            summary.altitude_history_m.push(altitude_m);
            PairOutcome::Sample {
                velocity_mps,
                altitude_m,
            }
        }
        SolveOutcome::Skipped => {
            summary.solver_skips += 1;
            PairOutcome::SolverSkipped
        }
    }
}
