//! Mailmerge command implementation

use anyhow::{Context, Result};
use odmerge_core::pipeline::{mailmerge_transforms, run_pipeline};
use odmerge_core::transforms::{FieldSource, StaticMap};
use odmerge_core::{DocumentStore, EngineConfig, OdfPackage};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Parse a JSON array of `{"field": "value"}` objects.
pub fn parse_records(json: &str) -> Result<Vec<Box<dyn FieldSource>>> {
    let records: Vec<HashMap<String, String>> =
        serde_json::from_str(json).context("Records must be a JSON array of string-valued objects")?;
    Ok(records
        .into_iter()
        .map(|record| Box::new(StaticMap(record)) as Box<dyn FieldSource>)
        .collect())
}

pub fn execute(template: &Path, records: &Path, output: &Path, config: &EngineConfig) -> Result<()> {
    let json = fs::read_to_string(records)
        .with_context(|| format!("Failed to read records from {}", records.display()))?;
    let records = parse_records(&json)?;
    let count = records.len();

    let mut doc = OdfPackage::open_for_write(template, output)
        .with_context(|| format!("Failed to open template {}", template.display()))?;
    let transforms = mailmerge_transforms(doc.schema(), records, config);
    run_pipeline(&mut doc, transforms).context("Mail-merge failed")?;
    doc.close()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(records = count, output = %output.display(), "Wrote merged document");
    Ok(())
}
