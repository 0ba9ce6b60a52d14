//! Composition files on disk.
//!
//! A composition is saved as pretty-printed JSON wrapped with the schema
//! version and save time.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CompositionError, Result};
use crate::model::CompositionState;

/// Current schema version for composition files.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// On-disk wrapper around a composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionFile {
    pub schema_version: String,
    pub saved_at: DateTime<Utc>,
    pub composition: CompositionState,
}

/// Load a composition file.
pub fn load_state(path: &Path) -> Result<CompositionState> {
    let content = fs::read_to_string(path).map_err(|e| CompositionError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file: CompositionFile = serde_json::from_str(&content)?;
    Ok(file.composition)
}

/// Save a composition file, creating parent directories as needed.
pub fn save_state(path: &Path, state: &CompositionState) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CompositionError::FileWriteError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = CompositionFile {
        schema_version: CURRENT_SCHEMA_VERSION.to_string(),
        saved_at: Utc::now(),
        composition: state.clone(),
    };
    let content = serde_json::to_string_pretty(&file)?;
    fs::write(path, content).map_err(|e| CompositionError::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scene;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("composition.json");

        let mut state = CompositionState::new();
        state.clips.push(Scene::new(1, 0.0, 5.0, Some("a.mp4".into())).into());
        state.total_duration = 10.0;

        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded, state);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["schemaVersion"], CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let missing = load_state(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(missing.error_code(), "FILE_READ_ERROR");

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{ not json").unwrap();
        assert_eq!(load_state(&garbage).unwrap_err().error_code(), "SERIALIZATION_ERROR");
    }
}
