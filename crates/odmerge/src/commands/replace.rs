//! Replace command implementation

use anyhow::{Result, bail};
use odmerge_core::pipeline::{replace_transforms, run_pipeline};
use odmerge_core::transforms::StaticMap;
use odmerge_core::{EngineConfig, OdfPackage};
use std::path::Path;

/// Parse `NAME=VALUE` arguments.
pub fn parse_fields(fields: &[String]) -> Result<StaticMap> {
    let mut map = StaticMap::new();
    for field in fields {
        let Some((name, value)) = field.split_once('=') else {
            bail!("Invalid field '{}': expected NAME=VALUE", field);
        };
        if name.is_empty() {
            bail!("Invalid field '{}': empty name", field);
        }
        map = map.with(name, value);
    }
    Ok(map)
}

pub fn execute(input: &Path, output: &Path, fields: &[String], config: &EngineConfig) -> Result<()> {
    let source = parse_fields(fields)?;
    let mut doc = OdfPackage::open_for_write(input, output)?;
    run_pipeline(&mut doc, replace_transforms(Box::new(source), config))?;
    doc.close()?;
    Ok(())
}
