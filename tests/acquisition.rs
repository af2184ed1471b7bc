//! End-to-end acquisition loop tests against the stub camera and stub
//! feature backend.

use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use groundtrack::{aggregate, run, Camera, CameraConfig, GroundtrackConfig, StubBackend};

fn test_config(image_dir: &std::path::Path) -> GroundtrackConfig {
    GroundtrackConfig {
        image_dir: image_dir.to_path_buf(),
        camera: CameraConfig {
            device: "stub://test".to_string(),
            width: 160,
            height: 120,
        },
        run_duration: Duration::from_millis(300),
        capture_interval: Duration::from_millis(20),
        ..GroundtrackConfig::default()
    }
}

#[test]
fn records_velocity_samples_and_cleans_up_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    let mut backend = StubBackend::with_drift(10.0, 0.0);
    let mut camera = Camera::new(cfg.camera.clone()).expect("camera");
    camera.configure().expect("configure");

    let stop = AtomicBool::new(false);
    let summary = run::run(&cfg, &mut camera, &mut backend, &stop).expect("run");
    camera.release().expect("release");

    assert!(summary.frames_captured >= 2, "expected at least one pair");
    assert!(!summary.velocity_samples_mps.is_empty());
    assert_eq!(summary.capture_failures, 0);
    assert_eq!(summary.match_failures, 0);

    // Short inter-frame intervals put the converged altitude low, so every
    // sample must sit near low-orbit speeds.
    for v in &summary.velocity_samples_mps {
        assert!(*v > 5_000.0 && *v < 9_000.0, "implausible velocity {v}");
    }

    // Altitude history keeps its seed plus one entry per sample.
    assert_eq!(
        summary.altitude_history_m.len(),
        summary.velocity_samples_mps.len() + 1
    );
    assert_eq!(summary.altitude_history_m[0], run::SEED_ALTITUDE_HISTORY_M);

    // Final purge removed every retained frame file.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read image dir")
        .collect();
    assert!(leftovers.is_empty(), "frames left behind: {leftovers:?}");

    // The aggregate is the mean of the samples, km/s, 4 digits.
    let estimate = aggregate::finalize(&summary.velocity_samples_mps);
    assert!(!estimate.fallback);
    let mean_mps = summary.velocity_samples_mps.iter().sum::<f64>()
        / summary.velocity_samples_mps.len() as f64;
    let expected = format!("{:.4}", mean_mps / 1000.0);
    assert_eq!(estimate.format(), expected);
}

#[test]
fn injected_match_fault_does_not_suppress_neighboring_pairs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    // Fail the second match call: pair 1 of pairs 0, 1, 2, ...
    let mut backend = StubBackend::with_drift(10.0, 0.0).fail_match_call(1);
    let mut camera = Camera::new(cfg.camera.clone()).expect("camera");
    camera.configure().expect("configure");

    let stop = AtomicBool::new(false);
    let summary = run::run(&cfg, &mut camera, &mut backend, &stop).expect("run");
    camera.release().expect("release");

    assert_eq!(summary.match_failures, 1);
    // Pairs before and after the faulty one still contributed.
    assert!(
        summary.velocity_samples_mps.len() >= 2,
        "expected samples from pairs around the fault, got {}",
        summary.velocity_samples_mps.len()
    );
}

#[test]
fn zero_drift_yields_fallback_estimate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path());
    // Identical keypoints every frame: zero displacement on every pair.
    let mut backend = StubBackend::new();
    let mut camera = Camera::new(cfg.camera.clone()).expect("camera");
    camera.configure().expect("configure");

    let stop = AtomicBool::new(false);
    let summary = run::run(&cfg, &mut camera, &mut backend, &stop).expect("run");
    camera.release().expect("release");

    assert!(summary.velocity_samples_mps.is_empty());
    assert!(summary.no_motion_pairs >= 1);

    let estimate = aggregate::finalize(&summary.velocity_samples_mps);
    assert!(estimate.fallback);
    assert_eq!(estimate.format(), "7.6677");
}

#[test]
fn capture_fault_does_not_orphan_partial_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    cfg.run_duration = Duration::from_millis(100);
    cfg.capture_interval = Duration::from_millis(10);

    // A partially written capture left at the path of the first attempt.
    std::fs::write(dir.path().join("photo_0.jpg"), b"truncated").expect("plant partial file");

    let mut backend = StubBackend::new();
    // Skipping configure makes every steady-state capture fail.
    let mut camera = Camera::new(cfg.camera.clone()).expect("camera");

    let stop = AtomicBool::new(false);
    let summary = run::run(&cfg, &mut camera, &mut backend, &stop).expect("run");
    camera.release().expect("release");

    assert!(summary.capture_failures >= 1);
    assert_eq!(summary.frames_captured, 0);
    assert!(summary.velocity_samples_mps.is_empty());

    // Failed captures leave nothing behind: the store never saw these
    // paths, so the loop itself must unlink them.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read image dir")
        .collect();
    assert!(leftovers.is_empty(), "orphaned captures: {leftovers:?}");
}

#[test]
fn terminates_within_one_iteration_of_the_duration_bound() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    cfg.run_duration = Duration::from_millis(100);
    cfg.capture_interval = Duration::ZERO;

    let mut backend = StubBackend::new();
    let mut camera = Camera::new(cfg.camera.clone()).expect("camera");
    camera.configure().expect("configure");

    let started = Instant::now();
    let stop = AtomicBool::new(false);
    run::run(&cfg, &mut camera, &mut backend, &stop).expect("run");
    camera.release().expect("release");

    // One in-flight iteration may finish after the bound; allow generous
    // slack for slow CI, but rule out unbounded looping.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn stop_flag_ends_the_run_before_the_bound() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path());
    cfg.run_duration = Duration::from_secs(60);

    let mut backend = StubBackend::new();
    let mut camera = Camera::new(cfg.camera.clone()).expect("camera");
    camera.configure().expect("configure");

    let started = Instant::now();
    let stop = AtomicBool::new(true);
    let summary = run::run(&cfg, &mut camera, &mut backend, &stop).expect("run");
    camera.release().expect("release");

    assert_eq!(summary.frames_captured, 0);
    assert!(started.elapsed() < Duration::from_secs(5));
}
