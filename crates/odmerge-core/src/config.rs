/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Engine options shared by the pipeline builders.
 */

use crate::transforms::DEFAULT_GENERATOR;
use serde::Deserialize;

/// Options controlling which optional transforms a pipeline gets.
///
/// Every field has a default, so an empty configuration file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Generator recorded in meta.xml. Editinfo runs only when set.
    pub generator: Option<String>,

    /// Regenerate frame, section, table, image and object names after a
    /// merge.
    pub renumber: bool,

    /// Make the output update links, fields and charts on load.
    pub autoupdate: bool,

    /// Existing paragraph style to use for page breaks instead of a
    /// generated one.
    pub pagebreak_style: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generator: Some(DEFAULT_GENERATOR.to_string()),
            renumber: true,
            autoupdate: false,
            pagebreak_style: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.renumber);
        assert!(config.generator.unwrap().starts_with("odmerge/"));
    }

    #[test]
    fn test_partial_config() {
        let config: EngineConfig = toml::from_str(
            r#"
            autoupdate = true
            pagebreak-style = "Break"
            "#,
        )
        .unwrap();
        assert!(config.autoupdate);
        assert!(config.renumber);
        assert_eq!(config.pagebreak_style.as_deref(), Some("Break"));
    }
}
