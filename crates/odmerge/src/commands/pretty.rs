//! Pretty command implementation

use anyhow::{Context, Result, anyhow};
use odmerge_core::transforms::text::pretty;
use odmerge_core::{DocumentStore, OdfPackage, Part};
use std::path::Path;

pub fn execute(input: &Path, part: &str) -> Result<()> {
    let part = Part::from_file_name(part).ok_or_else(|| {
        anyhow!("Unknown part '{}': expected content.xml, styles.xml, meta.xml or settings.xml", part)
    })?;
    let mut doc = OdfPackage::open_for_read(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let root = doc.read_part(part)?;
    print!("{}", pretty(&root, doc.schema()));
    Ok(())
}
