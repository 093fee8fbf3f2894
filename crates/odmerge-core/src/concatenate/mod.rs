/*
 * concatenate/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Append whole documents to the current one.
 */

//! Document concatenation.
//!
//! The current document is the reference: its styles win, and every
//! appended document is fitted around them. For each appended document
//!
//! 1. the first paragraph gets a private copy of its style bound to the
//!    document's first master page, so the page layout survives;
//! 2. its style definitions are merged (see [`styles`]);
//! 3. its body is renamed to the merged style names, its page-anchored
//!    shapes are moved past the pages already emitted, and it is appended
//!    after a page break.
//!
//! Requires `GetAttribute:page-count` for the reference document and
//! writes `SetAttribute:<counter>` totals for [`set_meta`].
//!
//! [`set_meta`]: crate::attribute_access::set_meta

mod body;
pub mod refs;
pub mod styles;

use crate::attribute_access::{META_COUNTERS, get_meta, max_z_index, reanchor_shapes};
use crate::context::{Context, producer};
use crate::document::{DocumentStore, Part};
use crate::schema::SchemaConfig;
use crate::transform::{PartTrees, Transform};
use crate::transforms::{BodyParts, PagebreakStyle, ensure_pagebreak_style, pagebreak_paragraph};
use crate::{EngineError, Result};
use body::{append_declarations, set_pagestyle};
use odmerge_xml::Element;
use std::collections::BTreeMap;
use styles::StyleMerger;

pub use refs::{Family, RefKind, RefRule, RefRules};
pub use styles::{DocNames, Scope};

/// An appended document: the parts concatenation needs.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    schema: SchemaConfig,
    content: Element,
    styles: Element,
    meta: Element,
}

impl SourceDocument {
    pub fn new(schema: SchemaConfig, content: Element, styles: Element, meta: Element) -> Self {
        Self {
            schema,
            content,
            styles,
            meta,
        }
    }

    /// Read content, styles and meta from a document.
    pub fn load(store: &mut dyn DocumentStore) -> Result<Self> {
        Ok(Self {
            schema: store.schema().clone(),
            content: store.read_part(Part::Content)?,
            styles: store.read_part(Part::Styles)?,
            meta: store.read_part(Part::Meta)?,
        })
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }
}

/// Concatenation transform over content.xml and styles.xml.
pub struct Concatenate {
    sources: Vec<SourceDocument>,
    pagebreak: Option<PagebreakStyle>,
}

impl Concatenate {
    pub fn new(sources: Vec<SourceDocument>) -> Self {
        Self {
            sources,
            pagebreak: None,
        }
    }

    /// Use an existing page-break style instead of creating one.
    pub fn with_pagebreak_style(mut self, style: PagebreakStyle) -> Self {
        self.pagebreak = Some(style);
        self
    }

    fn concatenate(&mut self, content: &mut Element, styles: &mut Element, ctx: &mut Context) -> Result<()> {
        let schema = ctx.schema().clone();
        for (index, source) in self.sources.iter().enumerate() {
            if source.schema.generation() != schema.generation() {
                return Err(EngineError::schema(format!(
                    "document {} is {} but the reference document is {}",
                    index + 1,
                    source.schema.mimetype(),
                    schema.mimetype()
                )));
            }
        }

        let page_key = Context::key(producer::GET_ATTRIBUTE, "page-count");
        let mut pages = ctx.get_int(&page_key)?;
        let mut totals = BTreeMap::new();
        for counter in META_COUNTERS.iter().filter(|c| **c != "page-count") {
            let key = Context::key(producer::GET_ATTRIBUTE, counter);
            if ctx.has(&key) {
                totals.insert(*counter, ctx.get_int(&key)?);
            }
        }

        let mut merger = StyleMerger::new(&schema);
        merger.register_reference(content, styles)?;
        for source in &mut self.sources {
            set_pagestyle(&schema, &mut source.content, &source.styles)?;
            merger.merge(&mut source.content, &mut source.styles, content, styles)?;
        }

        let pagebreak = match &self.pagebreak {
            Some(style) => style.resolve(ctx)?,
            None => ensure_pagebreak_style(content, ctx)?,
        };
        let z_key = Context::key(producer::CONCATENATE, "max-z-index");
        let body = schema.body_mut(content)?;
        let mut output = BodyParts::divide(body, &schema);
        let mut z_offset = max_z_index(&schema, output.content_mut(), ctx, &z_key)? + 1;

        for (position, source) in self.sources.iter_mut().enumerate() {
            let index = position + 1;
            let mut scratch = Context::new(schema.clone());
            get_meta(&schema).apply(&mut source.meta, &mut scratch)?;
            let doc_pages = scratch.get_int(&page_key)?;

            let mut parts = BodyParts::divide(schema.body_mut(&mut source.content)?, &schema);
            let doc_z = max_z_index(&schema, parts.content_mut(), &mut scratch, &z_key)?;

            if let Some(names) = merger.names(index) {
                merger
                    .rules()
                    .rename_access(Part::Content, names)
                    .apply_each(
                        parts
                            .declarations
                            .iter_mut()
                            .chain(parts.shapes.iter_mut())
                            .chain(parts.flow.iter_mut()),
                        &mut scratch,
                    )?;
            }
            reanchor_shapes(&schema, pages, z_offset).apply_each(parts.content_mut(), &mut scratch)?;

            output.flow.push(pagebreak_paragraph(&schema, &pagebreak));
            append_declarations(&mut output.declarations, parts.declarations, &schema);
            output.shapes.extend(parts.shapes);
            output.flow.extend(parts.flow);

            pages += doc_pages;
            z_offset += doc_z + 1;
            for (counter, total) in totals.iter_mut() {
                // One page-break paragraph per appended document.
                if *counter == "paragraph-count" {
                    *total += 1;
                }
                let key = Context::key(producer::GET_ATTRIBUTE, counter);
                if scratch.has(&key) {
                    *total += scratch.get_int(&key)?;
                }
            }
            tracing::info!(document = index, pages = doc_pages, "Appended document");
        }
        output.reassemble(body);

        ctx.set(Context::key(producer::SET_ATTRIBUTE, "page-count"), pages);
        for (counter, total) in totals {
            ctx.set(Context::key(producer::SET_ATTRIBUTE, counter), total);
        }
        Ok(())
    }
}

impl Transform for Concatenate {
    fn name(&self) -> &str {
        "concatenate"
    }

    fn part(&self) -> Part {
        Part::Content
    }

    fn priority(&self) -> i32 {
        80
    }

    fn parts(&self) -> Vec<Part> {
        vec![Part::Content, Part::Styles]
    }

    /// Concatenation needs styles.xml as well; use [`Transform::apply_all`].
    fn apply(&mut self, _root: &mut Element, _ctx: &mut Context) -> Result<()> {
        Err(EngineError::MissingPart(Part::Styles.file_name().to_string()))
    }

    fn apply_all(&mut self, trees: &mut PartTrees, ctx: &mut Context) -> Result<()> {
        let mut content = trees.take(Part::Content)?;
        let mut styles = match trees.take(Part::Styles) {
            Ok(styles) => styles,
            Err(e) => {
                trees.insert(Part::Content, content);
                return Err(e);
            }
        };
        let result = self.concatenate(&mut content, &mut styles, ctx);
        trees.insert(Part::Content, content);
        trees.insert(Part::Styles, styles);
        result
    }
}
