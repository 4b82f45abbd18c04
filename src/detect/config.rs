use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Serialize;

pub const DEFAULT_BACKEND: &str = "tract";
pub const DEFAULT_MODEL: &str = "yolo11n";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_DEVICE: &str = "cpu";
pub const DEFAULT_IMGSZ: u32 = 640;
pub const DEFAULT_MODELS_DIR: &str = "models";

/// Model names accepted without a path; resolved to `<models_dir>/<name>.onnx`.
pub const KNOWN_MODELS: &[&str] = &[
    "yolo11n", "yolo11s", "yolo11m", "yolo11l", "yolo11x", "yolov8n", "yolov8s", "yolov8m",
    "yolov8l", "yolov8x",
];

/// Fixed detector configuration, set once at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Backend name (`stub`, `tract`).
    pub backend: String,
    /// Catalogue name or path to an ONNX file.
    pub model: String,
    pub models_dir: PathBuf,
    pub confidence_threshold: f32,
    /// Device selector. Only `cpu` is implemented.
    pub device: String,
    /// Square inference resolution in pixels.
    pub imgsz: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model: DEFAULT_MODEL.to_string(),
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            device: DEFAULT_DEVICE.to_string(),
            imgsz: DEFAULT_IMGSZ,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if self.imgsz == 0 || self.imgsz % 32 != 0 {
            return Err(anyhow!(
                "inference size must be a positive multiple of 32, got {}",
                self.imgsz
            ));
        }
        if self.device.trim().is_empty() {
            return Err(anyhow!("device selector must not be empty"));
        }
        Ok(())
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            backend: self.backend.clone(),
            model: self.model.clone(),
            device: self.device.clone(),
            confidence_threshold: self.confidence_threshold,
            imgsz: self.imgsz,
        }
    }
}

/// What a detector was built with, for logs and the CLI banner.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelInfo {
    pub backend: String,
    pub model: String,
    pub device: String,
    pub confidence_threshold: f32,
    pub imgsz: u32,
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model={} backend={} device={} confidence={:.2} imgsz={}",
            self.model, self.backend, self.device, self.confidence_threshold, self.imgsz
        )
    }
}

/// Resolve a model identifier to a file on disk.
///
/// An existing path wins. Otherwise a catalogue name (with or without a
/// `.pt`/`.onnx` suffix) maps to `<models_dir>/<name>.onnx`.
pub fn resolve_model_path(identifier: &str, models_dir: &Path) -> Result<PathBuf> {
    let direct = Path::new(identifier);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    let stem = identifier
        .strip_suffix(".pt")
        .or_else(|| identifier.strip_suffix(".onnx"))
        .unwrap_or(identifier);
    if !KNOWN_MODELS.contains(&stem) {
        return Err(anyhow!(
            "unknown model '{}' (expected a file path or one of: {})",
            identifier,
            KNOWN_MODELS.join(", ")
        ));
    }

    let candidate = models_dir.join(format!("{stem}.onnx"));
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(anyhow!(
            "model '{}' not found at {}",
            identifier,
            candidate.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        DetectorConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let mut cfg = DetectorConfig {
            confidence_threshold: 1.5,
            ..DetectorConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg.confidence_threshold = 0.3;
        cfg.imgsz = 500;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn model_info_reflects_settings() {
        let cfg = DetectorConfig {
            backend: "stub".to_string(),
            model: "yolov8s".to_string(),
            confidence_threshold: 0.35,
            ..DetectorConfig::default()
        };
        let info = cfg.model_info();
        assert_eq!(info.model, "yolov8s");
        assert_eq!(info.device, "cpu");
        assert_eq!(info.confidence_threshold, 0.35);
        assert_eq!(
            info.to_string(),
            "model=yolov8s backend=stub device=cpu confidence=0.35 imgsz=640"
        );
    }

    #[test]
    fn resolves_catalogue_names_in_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("yolo11s.onnx");
        std::fs::write(&model, b"onnx").unwrap();

        assert_eq!(resolve_model_path("yolo11s", dir.path()).unwrap(), model);
        assert_eq!(resolve_model_path("yolo11s.pt", dir.path()).unwrap(), model);
        assert_eq!(
            resolve_model_path(model.to_str().unwrap(), Path::new("elsewhere")).unwrap(),
            model
        );
    }

    #[test]
    fn missing_or_unknown_models_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_model_path("yolo11m", dir.path()).is_err());
        assert!(resolve_model_path("resnet50", dir.path()).is_err());
    }
}
