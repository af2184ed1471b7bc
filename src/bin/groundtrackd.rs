//! groundtrackd - ground-track speed estimation daemon
//!
//! Runs the timed acquisition loop against the configured camera, then
//! writes the final estimate (km/s, 4 fractional digits) to the result
//! file. The daemon always completes and always writes a result: degraded
//! input quality is absorbed into a less accurate (or fallback) estimate,
//! never surfaced as an error.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use groundtrack::{aggregate, features, run, Camera, GroundtrackConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a TOML config file (also read from GROUNDTRACK_CONFIG).
    #[arg(long, env = "GROUNDTRACK_CONFIG")]
    config: Option<PathBuf>,
    /// Capture device, e.g. stub://overhead or /dev/video0.
    #[arg(long)]
    device: Option<String>,
    /// Feature backend (cpu|stub).
    #[arg(long)]
    backend: Option<String>,
    /// Override the run duration bound, seconds.
    #[arg(long)]
    duration_secs: Option<u64>,
    /// Override the result file path.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = GroundtrackConfig::load_from(args.config.as_deref())?;
    if let Some(device) = args.device {
        cfg.camera.device = device;
    }
    if let Some(backend) = args.backend {
        cfg.backend = backend;
    }
    if let Some(secs) = args.duration_secs {
        cfg.run_duration = std::time::Duration::from_secs(secs);
    }
    if let Some(output) = args.output {
        cfg.result_path = output;
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        })
        .context("install interrupt handler")?;
    }

    log::info!(
        "groundtrackd {} starting: device={}, backend={}, duration={}s",
        env!("CARGO_PKG_VERSION"),
        cfg.camera.device,
        cfg.backend,
        cfg.run_duration.as_secs()
    );

    let mut backend = features::backend_from_name(&cfg.backend)?;
    let mut camera = Camera::new(cfg.camera.clone())?;
    camera.configure()?;

    // The loop's own faults are fatal, but the camera is released either
    // way, exactly once.
    let loop_result = run::run(&cfg, &mut camera, backend.as_mut(), &stop);
    camera.release()?;
    let summary = loop_result?;

    if summary.velocity_samples_mps.is_empty() {
        log::warn!("no velocity samples recorded; using fallback estimate");
    }
    if let Some(altitude) = summary.altitude_history_m.last() {
        log::debug!("final altitude estimate: {:.0} m", altitude);
    }

    let estimate = aggregate::finalize(&summary.velocity_samples_mps);
    std::fs::write(&cfg.result_path, estimate.format())
        .with_context(|| format!("write result file {}", cfg.result_path.display()))?;
    log::info!(
        "estimate: {} km/s ({} samples{}) written to {}",
        estimate.format(),
        summary.velocity_samples_mps.len(),
        if estimate.fallback { ", fallback" } else { "" },
        cfg.result_path.display()
    );
    Ok(())
}
