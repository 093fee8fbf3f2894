//! Concat command implementation

use anyhow::{Context, Result};
use odmerge_core::pipeline::{concatenate_transforms, run_pipeline};
use odmerge_core::{DocumentStore, EngineConfig, OdfPackage, SourceDocument};
use std::path::{Path, PathBuf};

pub fn execute(first: &Path, others: &[PathBuf], output: &Path, config: &EngineConfig) -> Result<()> {
    let sources = others
        .iter()
        .map(|path| -> Result<SourceDocument> {
            let mut package = OdfPackage::open_for_read(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            SourceDocument::load(&mut package)
                .with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut doc = OdfPackage::open_for_write(first, output)
        .with_context(|| format!("Failed to open {}", first.display()))?;
    let transforms = concatenate_transforms(doc.schema(), sources, config);
    run_pipeline(&mut doc, transforms).context("Concatenation failed")?;
    doc.close()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(documents = others.len() + 1, output = %output.display(), "Wrote combined document");
    Ok(())
}
