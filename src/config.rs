use anyhow::{anyhow, Result};
use image::Rgb;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::detect::DetectorConfig;
use crate::pipeline::PipelineConfig;
use crate::render::RenderStyle;

pub const CONFIG_ENV: &str = "PEDESTRIAN_CONFIG";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    detector: Option<DetectorConfigFile>,
    pipeline: Option<PipelineConfigFile>,
    render: Option<RenderConfigFile>,
    logging: Option<LoggingConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    backend: Option<String>,
    model: Option<String>,
    models_dir: Option<PathBuf>,
    confidence: Option<f32>,
    device: Option<String>,
    imgsz: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    iou_threshold: Option<f64>,
    progress_interval: Option<u64>,
    display: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RenderConfigFile {
    box_color: Option<[u8; 3]>,
    text_color: Option<[u8; 3]>,
    label_background: Option<[u8; 3]>,
    box_thickness: Option<u32>,
    text_offset: Option<u32>,
    glyph_scale: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LoggingConfigFile {
    level: Option<String>,
    file: Option<PathBuf>,
}

/// Settings for one annotation run: detector, pipeline, overlay, logging.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub pipeline: PipelineConfig,
    pub render: RenderStyle,
    pub log_level: String,
    /// Debug-level log file written alongside the console output.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            pipeline: PipelineConfig::default(),
            render: RenderStyle::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with the file named by `PEDESTRIAN_CONFIG` (if set)
    /// and then with `PEDESTRIAN_*` variables.
    ///
    /// Values are not range-checked here so that command-line overrides can
    /// still replace them; call [`AppConfig::validate`] once all layers are in.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        Self::build(file_cfg.unwrap_or_default())
    }

    /// Like [`AppConfig::load`] but reads an explicit file.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::build(read_config_file(path)?)
    }

    fn build(file: AppConfigFile) -> Result<Self> {
        let mut cfg = Self::from_file(file);
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let defaults = Self::default();

        let det = file.detector.unwrap_or_default();
        let detector = DetectorConfig {
            backend: det.backend.unwrap_or(defaults.detector.backend),
            model: det.model.unwrap_or(defaults.detector.model),
            models_dir: det.models_dir.unwrap_or(defaults.detector.models_dir),
            confidence_threshold: det
                .confidence
                .unwrap_or(defaults.detector.confidence_threshold),
            device: det.device.unwrap_or(defaults.detector.device),
            imgsz: det.imgsz.unwrap_or(defaults.detector.imgsz),
        };

        let pipe = file.pipeline.unwrap_or_default();
        let pipeline = PipelineConfig {
            iou_threshold: pipe.iou_threshold.unwrap_or(defaults.pipeline.iou_threshold),
            progress_interval: pipe
                .progress_interval
                .unwrap_or(defaults.pipeline.progress_interval),
            display: pipe.display.unwrap_or(defaults.pipeline.display),
        };

        let style = file.render.unwrap_or_default();
        let render = RenderStyle {
            box_color: style.box_color.map(Rgb).unwrap_or(defaults.render.box_color),
            text_color: style.text_color.map(Rgb).unwrap_or(defaults.render.text_color),
            label_background: style
                .label_background
                .map(Rgb)
                .unwrap_or(defaults.render.label_background),
            box_thickness: style.box_thickness.unwrap_or(defaults.render.box_thickness),
            text_offset: style.text_offset.unwrap_or(defaults.render.text_offset),
            glyph_scale: style.glyph_scale.unwrap_or(defaults.render.glyph_scale),
        };

        let logging = file.logging.unwrap_or_default();
        let log_level = logging.level.unwrap_or(defaults.log_level);

        Self {
            detector,
            pipeline,
            render,
            log_level,
            log_file: logging.file,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(model) = env_string("PEDESTRIAN_MODEL") {
            self.detector.model = model;
        }
        if let Some(device) = env_string("PEDESTRIAN_DEVICE") {
            self.detector.device = device;
        }
        if let Some(level) = env_string("PEDESTRIAN_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(path) = env_string("PEDESTRIAN_LOG_FILE") {
            self.log_file = Some(PathBuf::from(path));
        }
        if let Some(confidence) = env_parsed("PEDESTRIAN_CONFIDENCE", "a number")? {
            self.detector.confidence_threshold = confidence;
        }
        if let Some(iou) = env_parsed("PEDESTRIAN_IOU_THRESHOLD", "a number")? {
            self.pipeline.iou_threshold = iou;
        }
        if let Some(interval) = env_parsed("PEDESTRIAN_PROGRESS_INTERVAL", "a frame count")? {
            self.pipeline.progress_interval = interval;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.pipeline.validate()?;
        if self.render.box_thickness == 0 {
            return Err(anyhow!("render.box_thickness must be at least 1"));
        }
        if self.render.glyph_scale == 0 {
            return Err(anyhow!("render.glyph_scale must be at least 1"));
        }
        if self.log_level.trim().is_empty() {
            return Err(anyhow!("logging.level must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T: FromStr>(key: &str, expected: &str) -> Result<Option<T>> {
    match env_string(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be {} (got '{}')", key, expected, raw)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::from_file(toml::from_str("").unwrap());
        assert_eq!(cfg, AppConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let file: AppConfigFile = toml::from_str(
            r#"
            [render]
            box_color = [255, 0, 0]

            [pipeline]
            display = true

            [logging]
            file = "logs/run.log"
            "#,
        )
        .unwrap();
        let cfg = AppConfig::from_file(file);
        assert_eq!(cfg.log_file, Some(PathBuf::from("logs/run.log")));
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.render.box_color, Rgb([255, 0, 0]));
        assert_eq!(cfg.render.text_color, Rgb([0, 0, 0]));
        assert!(cfg.pipeline.display);
        assert_eq!(cfg.pipeline.progress_interval, 30);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<AppConfigFile>("[detector]\nweights = \"x\"").is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.render.glyph_scale = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.detector.imgsz = 100;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.pipeline.iou_threshold = -0.1;
        assert!(cfg.validate().is_err());
    }
}
