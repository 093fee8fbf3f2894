/*
 * transforms/meta.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Edit information in meta.xml.
 */

use crate::context::Context;
use crate::document::Part;
use crate::schema::Ns;
use crate::transform::Transform;
use crate::{EngineError, Result};
use odmerge_xml::Element;

/// Default value written to `meta:generator`.
pub const DEFAULT_GENERATOR: &str = concat!("odmerge/", env!("CARGO_PKG_VERSION"));

/// Resets the edit information of a generated document: generator, date,
/// editing cycles and editing duration. Only entries already present in
/// `office:meta` are changed.
#[derive(Debug, Clone)]
pub struct Editinfo {
    generator: String,
    date: Option<String>,
}

impl Editinfo {
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
            date: None,
        }
    }

    /// Use a fixed date instead of the current time.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

impl Default for Editinfo {
    fn default() -> Self {
        Self::new(DEFAULT_GENERATOR)
    }
}

impl Transform for Editinfo {
    fn name(&self) -> &str {
        "editinfo"
    }

    fn part(&self) -> Part {
        Part::Meta
    }

    fn priority(&self) -> i32 {
        20
    }

    fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
        let schema = ctx.schema();
        let date = self
            .date
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string());
        let replacements = [
            (schema.tag(Ns::Meta, "generator"), self.generator.clone()),
            (schema.tag(Ns::Dc, "date"), date),
            (schema.tag(Ns::Meta, "editing-cycles"), "0".to_string()),
            (schema.tag(Ns::Meta, "editing-duration"), "PT0M0S".to_string()),
        ];

        let meta = root
            .find_mut(&schema.tag(Ns::Office, "meta"))
            .ok_or_else(|| EngineError::schema_in("meta.xml", "missing <office:meta>"))?;
        for node in &mut meta.children {
            if let Some((_, value)) = replacements.iter().find(|(tag, _)| *tag == node.tag) {
                node.set_text(value.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Generation, SchemaConfig};
    use odmerge_xml::parse;

    #[test]
    fn test_editinfo_replaces_present_entries() {
        let schema = SchemaConfig::new(Generation::OpenDocument);
        let mut ctx = Context::new(schema.clone());
        let mut root = parse(
            r#"<office:document-meta xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:meta="urn:oasis:names:tc:opendocument:xmlns:meta:1.0" xmlns:dc="http://purl.org/dc/elements/1.1/"><office:meta><meta:generator>Writer</meta:generator><dc:date>2004-01-01T00:00:00</dc:date><meta:editing-cycles>17</meta:editing-cycles><dc:title>Letter</dc:title></office:meta></office:document-meta>"#,
        )
        .unwrap();

        Editinfo::new("odmerge test")
            .with_date("2025-06-01T12:00:00")
            .apply(&mut root, &mut ctx)
            .unwrap();

        let texts: Vec<_> = root.children[0]
            .children
            .iter()
            .map(|e| e.text.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(texts, vec!["odmerge test", "2025-06-01T12:00:00", "0", "Letter"]);
        assert!(root.children[0].find(&schema.tag(Ns::Meta, "editing-duration")).is_none());
    }

    #[test]
    fn test_editinfo_requires_office_meta() {
        let mut ctx = Context::new(SchemaConfig::new(Generation::OpenDocument));
        let mut root = parse(r#"<r/>"#).unwrap();
        assert!(Editinfo::default().apply(&mut root, &mut ctx).is_err());
    }
}
