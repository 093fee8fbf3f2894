//! Text command implementation

use anyhow::{Context, Result};
use odmerge_core::transforms::text::as_text;
use odmerge_core::{DocumentStore, OdfPackage, Part};
use std::path::Path;

pub fn execute(input: &Path) -> Result<()> {
    let mut doc = OdfPackage::open_for_read(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let content = doc.read_part(Part::Content)?;
    print!("{}", as_text(&content, doc.schema()));
    Ok(())
}
