use std::sync::Mutex;

use tempfile::NamedTempFile;

use groundtrack::config::GroundtrackConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "GROUNDTRACK_CONFIG",
        "GROUNDTRACK_DEVICE",
        "GROUNDTRACK_IMAGE_DIR",
        "GROUNDTRACK_RESULT_PATH",
        "GROUNDTRACK_BACKEND",
        "GROUNDTRACK_DURATION_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = GroundtrackConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://overhead");
    assert_eq!(cfg.camera.width, 4056);
    assert_eq!(cfg.camera.height, 3040);
    assert_eq!(cfg.run_duration.as_secs(), 9 * 60);
    assert_eq!(cfg.retain_frames, 42);
    assert_eq!(cfg.max_features, 1000);
    assert_eq!(cfg.backend, "cpu");
    assert!((cfg.geometry.focal_length_m - 0.005).abs() < 1e-12);
    assert!((cfg.geometry.sensor_width_m - 0.006287).abs() < 1e-12);
    assert_eq!(cfg.geometry.pixel_count, 4056);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        image_dir = "/var/lib/groundtrack/img"
        result_path = "/var/lib/groundtrack/result.txt"

        [camera]
        device = "/dev/video2"
        width = 1920
        height = 1080

        [run]
        duration_secs = 120
        capture_interval_ms = 250
        retain_frames = 12
        max_features = 500
        backend = "stub"

        [geometry]
        focal_length_m = 0.004
        sensor_width_m = 0.0058
        pixel_count = 1920
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("GROUNDTRACK_CONFIG", file.path());
    std::env::set_var("GROUNDTRACK_DEVICE", "stub://bench");
    std::env::set_var("GROUNDTRACK_DURATION_SECS", "60");

    let cfg = GroundtrackConfig::load().expect("load config");

    assert_eq!(cfg.image_dir.to_str().unwrap(), "/var/lib/groundtrack/img");
    assert_eq!(
        cfg.result_path.to_str().unwrap(),
        "/var/lib/groundtrack/result.txt"
    );
    // Environment wins over the file.
    assert_eq!(cfg.camera.device, "stub://bench");
    assert_eq!(cfg.run_duration.as_secs(), 60);
    assert_eq!(cfg.camera.width, 1920);
    assert_eq!(cfg.camera.height, 1080);
    assert_eq!(cfg.capture_interval.as_millis(), 250);
    assert_eq!(cfg.retain_frames, 12);
    assert_eq!(cfg.max_features, 500);
    assert_eq!(cfg.backend, "stub");
    assert!((cfg.geometry.focal_length_m - 0.004).abs() < 1e-12);
    assert_eq!(cfg.geometry.pixel_count, 1920);

    clear_env();
}

#[test]
fn explicit_path_takes_precedence_over_env_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut env_file = NamedTempFile::new().expect("env config");
    std::io::Write::write_all(
        &mut env_file,
        br#"
        [run]
        backend = "cpu"
    "#,
    )
    .expect("write env config");

    let mut explicit_file = NamedTempFile::new().expect("explicit config");
    std::io::Write::write_all(
        &mut explicit_file,
        br#"
        [run]
        backend = "stub"
        duration_secs = 30
    "#,
    )
    .expect("write explicit config");

    std::env::set_var("GROUNDTRACK_CONFIG", env_file.path());

    let cfg = GroundtrackConfig::load_from(Some(explicit_file.path())).expect("load config");
    assert_eq!(cfg.backend, "stub");
    assert_eq!(cfg.run_duration.as_secs(), 30);

    // The env-driven entry point still honors GROUNDTRACK_CONFIG.
    let cfg = GroundtrackConfig::load().expect("load config");
    assert_eq!(cfg.backend, "cpu");

    clear_env();
}

#[test]
fn rejects_retention_below_comparison_window() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [run]
        retain_frames = 1
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("GROUNDTRACK_CONFIG", file.path());

    assert!(GroundtrackConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_zero_duration() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("GROUNDTRACK_DURATION_SECS", "0");
    assert!(GroundtrackConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_malformed_duration_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("GROUNDTRACK_DURATION_SECS", "soon");
    assert!(GroundtrackConfig::load().is_err());

    clear_env();
}
