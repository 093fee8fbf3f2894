/*
 * mailmerge.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Replicate a template body once per record.
 */

//! Mail-merge.
//!
//! The current document is the template. Its body is split into
//! declarations, page-anchored shapes and flow; declarations are kept once
//! while shapes and flow are copied for every record, with the record's
//! values substituted into the copy's variable fields. Records after the
//! first start on a new page: a page-break paragraph is appended and the
//! copy's page anchors and stacking indices are shifted past the ones
//! already emitted.
//!
//! Requires `GetAttribute:page-count` (see
//! [`get_meta`](crate::attribute_access::get_meta)) and writes
//! `SetAttribute:<counter>` for every statistic the template has, to be
//! stored by [`set_meta`](crate::attribute_access::set_meta).

use crate::attribute_access::{META_COUNTERS, max_z_index, reanchor_shapes};
use crate::context::{Context, producer};
use crate::document::Part;
use crate::schema::Ns;
use crate::transform::Transform;
use crate::transforms::{
    BodyParts, FieldSource, PagebreakStyle, ensure_pagebreak_style, pagebreak_paragraph,
    replace_fields,
};
use crate::Result;
use odmerge_xml::Element;

/// Mail-merge transform over content.xml.
pub struct Mailmerge {
    records: Vec<Box<dyn FieldSource>>,
    pagebreak: Option<PagebreakStyle>,
}

impl Mailmerge {
    pub fn new(records: Vec<Box<dyn FieldSource>>) -> Self {
        Self {
            records,
            pagebreak: None,
        }
    }

    /// Use an existing page-break style instead of creating one.
    pub fn with_pagebreak_style(mut self, style: PagebreakStyle) -> Self {
        self.pagebreak = Some(style);
        self
    }

    fn update_counters(&self, ctx: &mut Context) -> Result<()> {
        let n = self.records.len() as i64;
        for counter in META_COUNTERS {
            let get_key = Context::key(producer::GET_ATTRIBUTE, counter);
            if !ctx.has(&get_key) {
                continue;
            }
            let per_copy = ctx.get_int(&get_key)?;
            let total = match (counter, n) {
                // An empty merge still has one (empty) paragraph on one page.
                ("page-count" | "paragraph-count", 0) => 1,
                (_, 0) => 0,
                ("paragraph-count", n) => per_copy * n + (n - 1),
                (_, n) => per_copy * n,
            };
            ctx.set(Context::key(producer::SET_ATTRIBUTE, counter), total);
        }
        Ok(())
    }
}

impl Transform for Mailmerge {
    fn name(&self) -> &str {
        "mailmerge"
    }

    fn part(&self) -> Part {
        Part::Content
    }

    fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
        let schema = ctx.schema().clone();
        let pages = ctx.get_int(&Context::key(producer::GET_ATTRIBUTE, "page-count"))?;
        let style = match &self.pagebreak {
            Some(style) => style.resolve(ctx)?,
            None => ensure_pagebreak_style(root, ctx)?,
        };

        let body = schema.body_mut(root)?;
        let mut template = BodyParts::divide(body, &schema);
        let z_key = Context::key(producer::MAILMERGE, "max-z-index");
        let z_step = max_z_index(&schema, template.content_mut(), ctx, &z_key)? + 1;

        let mut output = BodyParts {
            declarations: std::mem::take(&mut template.declarations),
            ..BodyParts::default()
        };

        for (index, record) in self.records.iter().enumerate() {
            let mut copy = template.clone();
            if index > 0 {
                let index = index as i64;
                output.flow.push(pagebreak_paragraph(&schema, &style));
                reanchor_shapes(&schema, index * pages, index * z_step)
                    .apply_each(copy.content_mut(), ctx)?;
            }
            for element in copy.content_mut() {
                replace_fields(element, record.as_ref(), &schema);
            }
            output.shapes.extend(copy.shapes);
            output.flow.extend(copy.flow);
        }

        if self.records.is_empty() {
            // The body must not be empty.
            output.flow.push(Element::new(schema.tag(Ns::Text, "p")));
        }
        output.reassemble(body);

        self.update_counters(ctx)?;
        tracing::info!(records = self.records.len(), pages_per_record = pages, "Merged records");
        Ok(())
    }
}
