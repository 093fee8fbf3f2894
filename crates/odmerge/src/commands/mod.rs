//! Command implementations for the odmerge CLI
//!
//! Each command module handles the CLI interface and delegates to
//! odmerge-core for the actual work.

pub mod concat;
pub mod mailmerge;
pub mod pretty;
pub mod replace;
pub mod text;

use anyhow::{Context, Result};
use odmerge_core::EngineConfig;
use std::fs;
use std::path::Path;

/// Engine options from `path`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&source).with_context(|| format!("Invalid config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odmerge.toml");
        fs::write(&path, "renumber = false\ngenerator = \"letters\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert!(!config.renumber);
        assert_eq!(config.generator.as_deref(), Some("letters"));
    }

    #[test]
    fn test_unknown_field_type_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odmerge.toml");
        fs::write(&path, "renumber = \"yes\"\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("Invalid config file"));
    }
}
