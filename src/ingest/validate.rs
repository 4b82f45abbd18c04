use std::path::Path;

use anyhow::{anyhow, Result};

/// Container extensions accepted as input, lowercase, without the dot.
pub const SUPPORTED_VIDEO_FORMATS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "wmv", "webm"];

/// Check that `path` is an existing regular file with a supported extension.
///
/// Runs before any decoding is attempted.
pub fn validate_video_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("input file {} does not exist", path.display()));
    }
    if !path.is_file() {
        return Err(anyhow!("input path {} is not a file", path.display()));
    }
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| anyhow!("input file {} has no extension", path.display()))?;
    if !SUPPORTED_VIDEO_FORMATS.contains(&ext.as_str()) {
        return Err(anyhow!(
            "unsupported video format '.{}' (supported: {})",
            ext,
            SUPPORTED_VIDEO_FORMATS
                .iter()
                .map(|f| format!(".{f}"))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_extensions_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["clip.mp4", "clip.MOV", "clip.webm"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"").unwrap();
            validate_video_path(&path).unwrap();
        }
    }

    #[test]
    fn rejects_missing_directories_and_unknown_formats() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_video_path(&dir.path().join("absent.mp4")).is_err());

        let folder = dir.path().join("folder.mp4");
        std::fs::create_dir(&folder).unwrap();
        assert!(validate_video_path(&folder).is_err());

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"").unwrap();
        assert!(validate_video_path(&text).is_err());

        let bare = dir.path().join("noext");
        std::fs::write(&bare, b"").unwrap();
        assert!(validate_video_path(&bare).is_err());
    }
}
