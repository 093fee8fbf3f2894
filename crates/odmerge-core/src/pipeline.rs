/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Ready-made transform lists and the single entry point that runs them.
 */

//! Pipeline assembly.
//!
//! Each builder returns the ordered transform list for one operation; the
//! order comes from the transforms' priorities, so the lists can be
//! extended freely before calling [`run_pipeline`].

use crate::attribute_access::{get_meta, renumber_all, set_meta};
use crate::concatenate::{Concatenate, SourceDocument};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::document::DocumentStore;
use crate::mailmerge::Mailmerge;
use crate::schema::SchemaConfig;
use crate::transform::{Transform, Transformer};
use crate::transforms::{Autoupdate, Editinfo, FieldReplace, FieldSource, PagebreakStyle};
use crate::Result;

/// Run `transforms` against `doc` and return the final context.
///
/// Nothing is written unless every transform succeeds.
pub fn run_pipeline(doc: &mut dyn DocumentStore, transforms: Vec<Box<dyn Transform>>) -> Result<Context> {
    let mut transformer = Transformer::new();
    transformer.extend(transforms);
    tracing::debug!(transforms = ?transformer.transform_names(), "Running pipeline");
    transformer.transform(doc)
}

/// Editinfo and Autoupdate, as configured.
pub fn finishing_transforms(config: &EngineConfig) -> Vec<Box<dyn Transform>> {
    let mut transforms: Vec<Box<dyn Transform>> = Vec::new();
    if let Some(generator) = &config.generator {
        transforms.push(Box::new(Editinfo::new(generator.clone())));
    }
    if config.autoupdate {
        transforms.push(Box::new(Autoupdate));
    }
    transforms
}

/// Statistics in, merge step, optional renumbering, statistics out.
fn merge_transforms(
    schema: &SchemaConfig,
    config: &EngineConfig,
    merge: Box<dyn Transform>,
) -> Vec<Box<dyn Transform>> {
    let mut transforms: Vec<Box<dyn Transform>> = vec![Box::new(get_meta(schema)), merge];
    if config.renumber {
        transforms.push(Box::new(renumber_all(schema)));
    }
    transforms.push(Box::new(set_meta(schema)));
    transforms.extend(finishing_transforms(config));
    transforms
}

fn pagebreak_style(config: &EngineConfig) -> Option<PagebreakStyle> {
    config.pagebreak_style.clone().map(PagebreakStyle::Named)
}

/// Mail-merge `records` into the document the pipeline runs on.
pub fn mailmerge_transforms(
    schema: &SchemaConfig,
    records: Vec<Box<dyn FieldSource>>,
    config: &EngineConfig,
) -> Vec<Box<dyn Transform>> {
    let mut mailmerge = Mailmerge::new(records);
    if let Some(style) = pagebreak_style(config) {
        mailmerge = mailmerge.with_pagebreak_style(style);
    }
    merge_transforms(schema, config, Box::new(mailmerge))
}

/// Append `sources` to the document the pipeline runs on.
pub fn concatenate_transforms(
    schema: &SchemaConfig,
    sources: Vec<SourceDocument>,
    config: &EngineConfig,
) -> Vec<Box<dyn Transform>> {
    let mut concatenate = Concatenate::new(sources);
    if let Some(style) = pagebreak_style(config) {
        concatenate = concatenate.with_pagebreak_style(style);
    }
    merge_transforms(schema, config, Box::new(concatenate))
}

/// Substitute fields in place.
pub fn replace_transforms(source: Box<dyn FieldSource>, config: &EngineConfig) -> Vec<Box<dyn Transform>> {
    let mut transforms: Vec<Box<dyn Transform>> = vec![Box::new(FieldReplace::new(source))];
    transforms.extend(finishing_transforms(config));
    transforms
}
