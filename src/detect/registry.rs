use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::StubBackend;
use super::config::DetectorConfig;

/// Backend names compiled into this build.
pub fn available_backends() -> Vec<&'static str> {
    let mut names = vec!["stub"];
    if cfg!(feature = "backend-tract") {
        names.push("tract");
    }
    names
}

/// Construct the backend named by `config.backend`.
///
/// Validates the configuration and loads the model eagerly so that a bad
/// model identifier fails before any frame is processed.
pub fn build_detector(config: &DetectorConfig) -> Result<Box<dyn DetectorBackend>> {
    config.validate()?;
    match config.backend.as_str() {
        "stub" => Ok(Box::new(
            StubBackend::new().with_threshold(config.confidence_threshold),
        )),
        #[cfg(feature = "backend-tract")]
        "tract" => {
            let mut backend = super::backends::TractBackend::new(config)?;
            backend.warm_up()?;
            Ok(Box::new(backend))
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => Err(anyhow!(
            "the tract backend requires the backend-tract feature"
        )),
        other => Err(anyhow!(
            "unknown detector backend '{}' (available: {})",
            other,
            available_backends().join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_stub_backend() {
        let cfg = DetectorConfig {
            backend: "stub".to_string(),
            ..DetectorConfig::default()
        };
        let backend = build_detector(&cfg).unwrap();
        assert_eq!(backend.name(), "stub");
    }

    #[test]
    fn rejects_unknown_backend_and_bad_config() {
        let cfg = DetectorConfig {
            backend: "opencv".to_string(),
            ..DetectorConfig::default()
        };
        assert!(build_detector(&cfg).is_err());

        let cfg = DetectorConfig {
            backend: "stub".to_string(),
            confidence_threshold: -0.1,
            ..DetectorConfig::default()
        };
        assert!(build_detector(&cfg).is_err());
    }

    #[test]
    fn tract_backend_fails_fast_on_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DetectorConfig {
            backend: "tract".to_string(),
            model: "yolo11n".to_string(),
            models_dir: dir.path().to_path_buf(),
            ..DetectorConfig::default()
        };
        assert!(build_detector(&cfg).is_err());
    }
}
