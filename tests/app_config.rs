use std::path::PathBuf;
use std::sync::Mutex;

use image::Rgb;
use tempfile::NamedTempFile;

use pedestrian_annotator::config::AppConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PEDESTRIAN_CONFIG",
        "PEDESTRIAN_MODEL",
        "PEDESTRIAN_CONFIDENCE",
        "PEDESTRIAN_DEVICE",
        "PEDESTRIAN_IOU_THRESHOLD",
        "PEDESTRIAN_PROGRESS_INTERVAL",
        "PEDESTRIAN_LOG_LEVEL",
        "PEDESTRIAN_LOG_FILE",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AppConfig::load().expect("load config");
    assert_eq!(cfg, AppConfig::default());
    assert_eq!(cfg.detector.model, "yolo11n");
    assert_eq!(cfg.detector.confidence_threshold, 0.5);
    assert_eq!(cfg.detector.device, "cpu");
    assert_eq!(cfg.detector.imgsz, 640);
    assert_eq!(cfg.pipeline.iou_threshold, 0.5);
    assert_eq!(cfg.pipeline.progress_interval, 30);
    assert!(!cfg.pipeline.display);
    assert_eq!(cfg.render.box_color, Rgb([0, 255, 0]));
    assert_eq!(cfg.render.box_thickness, 2);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.log_file, None);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"
        [detector]
        backend = "stub"
        model = "yolov8s"
        models_dir = "/opt/models"
        confidence = 0.35
        imgsz = 320

        [pipeline]
        iou_threshold = 0.45
        progress_interval = 10
        display = true

        [render]
        box_color = [255, 64, 0]
        text_offset = 6

        [logging]
        level = "debug"
        file = "logs/file.log"
        "#,
    );

    std::env::set_var("PEDESTRIAN_CONFIG", file.path());
    std::env::set_var("PEDESTRIAN_MODEL", "yolo11m");
    std::env::set_var("PEDESTRIAN_PROGRESS_INTERVAL", "60");
    std::env::set_var("PEDESTRIAN_LOG_FILE", "/var/log/pedestrian_detection.log");

    let cfg = AppConfig::load().expect("load config");

    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.detector.model, "yolo11m");
    assert_eq!(cfg.detector.models_dir, PathBuf::from("/opt/models"));
    assert_eq!(cfg.detector.confidence_threshold, 0.35);
    assert_eq!(cfg.detector.imgsz, 320);
    assert_eq!(cfg.detector.device, "cpu");
    assert_eq!(cfg.pipeline.iou_threshold, 0.45);
    assert_eq!(cfg.pipeline.progress_interval, 60);
    assert!(cfg.pipeline.display);
    assert_eq!(cfg.render.box_color, Rgb([255, 64, 0]));
    assert_eq!(cfg.render.text_offset, 6);
    assert_eq!(cfg.render.glyph_scale, 2);
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(
        cfg.log_file,
        Some(PathBuf::from("/var/log/pedestrian_detection.log"))
    );

    clear_env();
}

#[test]
fn from_path_ignores_config_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let env_file = write_config("[detector]\nmodel = \"yolo11x\"\n");
    let explicit = write_config("[detector]\nmodel = \"yolo11s\"\n");
    std::env::set_var("PEDESTRIAN_CONFIG", env_file.path());

    let cfg = AppConfig::from_path(explicit.path()).expect("load config");
    assert_eq!(cfg.detector.model, "yolo11s");

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PEDESTRIAN_CONFIDENCE", "very");
    let err = AppConfig::load().unwrap_err();
    assert!(err.to_string().contains("PEDESTRIAN_CONFIDENCE"));

    std::env::set_var("PEDESTRIAN_CONFIDENCE", "1.5");
    let cfg = AppConfig::load().expect("range is checked by validate");
    assert!(cfg.validate().is_err());

    clear_env();
}

#[test]
fn command_line_overrides_can_repair_loaded_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config("[detector]
confidence = 1.5
");
    std::env::set_var("PEDESTRIAN_IOU_THRESHOLD", "2.0");

    let mut cfg = AppConfig::from_path(file.path()).expect("load config");
    assert!(cfg.validate().is_err());

    // What `--confidence 0.4 --iou 0.45` does in the annotate binary.
    cfg.detector.confidence_threshold = 0.4;
    cfg.pipeline.iou_threshold = 0.45;
    cfg.validate().expect("overrides are valid");

    clear_env();
}

#[test]
fn rejects_invalid_file_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let load_and_validate = |path: &std::path::Path| {
        AppConfig::from_path(path).and_then(|cfg| cfg.validate().map(|_| cfg))
    };

    let zero_interval = write_config("[pipeline]\nprogress_interval = 0\n");
    assert!(load_and_validate(zero_interval.path()).is_err());

    let bad_size = write_config("[detector]\nimgsz = 500\n");
    assert!(load_and_validate(bad_size.path()).is_err());

    let not_toml = write_config("{ \"detector\": {} }");
    assert!(AppConfig::from_path(not_toml.path()).is_err());

    let missing = std::env::temp_dir().join("pedestrian-annotator-missing-config.toml");
    assert!(AppConfig::from_path(&missing).is_err());

    clear_env();
}
