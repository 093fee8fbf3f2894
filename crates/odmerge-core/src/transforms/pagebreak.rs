/*
 * transforms/pagebreak.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Forced page breaks: an ad-hoc paragraph style and empty paragraphs using it.
 */

use crate::context::{Context, producer};
use crate::document::Part;
use crate::schema::{Ns, SchemaConfig};
use crate::transform::Transform;
use crate::Result;
use odmerge_xml::Element;
use once_cell::sync::Lazy;
use regex::Regex;

/// Automatic paragraph style names: `P<n>`.
static PARAGRAPH_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^P([0-9]+)$").expect("Invalid regex pattern for paragraph styles"));

/// Context key holding the generated page-break style name.
pub fn pagebreak_style_key() -> String {
    Context::key(producer::PAGEBREAK_STYLE, "stylename")
}

/// Make sure content.xml has a page-break paragraph style and return its
/// name. The style is created once per run: `P<n+1>` where `P<n>` is the
/// highest numbered automatic paragraph style.
pub fn ensure_pagebreak_style(root: &mut Element, ctx: &mut Context) -> Result<String> {
    let key = pagebreak_style_key();
    if ctx.has(&key) {
        return ctx.get_text(&key);
    }

    let schema = ctx.schema().clone();
    let styles = automatic_styles(root, &schema);
    let name_attr = schema.tag(Ns::Style, "name");
    let style_tag = schema.tag(Ns::Style, "style");

    let highest = styles
        .children_with_tag(&style_tag)
        .filter_map(|s| s.get(&name_attr))
        .filter_map(|name| PARAGRAPH_STYLE.captures(name))
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    let name = format!("P{}", highest + 1);

    let properties = Element::new(schema.paragraph_properties_tag())
        .with_attribute(schema.tag(Ns::Fo, "break-before"), "page");
    styles.children.push(
        Element::new(style_tag)
            .with_attribute(name_attr, name.clone())
            .with_attribute(schema.tag(Ns::Style, "family"), "paragraph")
            .with_attribute(schema.tag(Ns::Style, "parent-style-name"), "Standard")
            .with_child(properties),
    );

    tracing::debug!(style = %name, "Created page break style");
    ctx.set(key, name.clone());
    Ok(name)
}

/// The `office:automatic-styles` container of content.xml, created before
/// `office:body` when absent.
fn automatic_styles<'a>(root: &'a mut Element, schema: &SchemaConfig) -> &'a mut Element {
    let tag = schema.tag(Ns::Office, "automatic-styles");
    let index = match root.position(&tag) {
        Some(index) => index,
        None => {
            let at = root
                .position(&schema.tag(Ns::Office, "body"))
                .unwrap_or(root.children.len());
            root.children.insert(at, Element::new(tag));
            at
        }
    };
    &mut root.children[index]
}

/// An empty paragraph with the page-break style.
pub fn pagebreak_paragraph(schema: &SchemaConfig, style: &str) -> Element {
    Element::new(schema.tag(Ns::Text, "p")).with_attribute(schema.tag(Ns::Text, "style-name"), style)
}

/// Adds the page-break paragraph style to content.xml.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddPagebreakStyle;

impl Transform for AddPagebreakStyle {
    fn name(&self) -> &str {
        "add-pagebreak-style"
    }

    fn part(&self) -> Part {
        Part::Content
    }

    fn priority(&self) -> i32 {
        80
    }

    fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
        ensure_pagebreak_style(root, ctx).map(|_| ())
    }
}

/// Which style a page-break paragraph uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagebreakStyle {
    Named(String),
    /// Read the name from a context key when applied.
    Key(String),
}

impl Default for PagebreakStyle {
    fn default() -> Self {
        PagebreakStyle::Key(pagebreak_style_key())
    }
}

impl PagebreakStyle {
    pub fn resolve(&self, ctx: &Context) -> Result<String> {
        match self {
            PagebreakStyle::Named(name) => Ok(name.clone()),
            PagebreakStyle::Key(key) => ctx.get_text(key),
        }
    }
}

/// Appends a page break to the end of the body.
#[derive(Debug, Clone, Default)]
pub struct AddPagebreak {
    style: PagebreakStyle,
}

impl AddPagebreak {
    pub fn new(style: PagebreakStyle) -> Self {
        Self { style }
    }
}

impl Transform for AddPagebreak {
    fn name(&self) -> &str {
        "add-pagebreak"
    }

    fn part(&self) -> Part {
        Part::Content
    }

    fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
        let style = self.style.resolve(ctx)?;
        let schema = ctx.schema();
        let paragraph = pagebreak_paragraph(schema, &style);
        schema.body_mut(root)?.children.push(paragraph);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use crate::schema::Generation;
    use odmerge_xml::parse;

    const CONTENT: &str = r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0"><office:automatic-styles><style:style style:name="P1" style:family="paragraph"/><style:style style:name="P9" style:family="paragraph"/><style:style style:name="P10_Concat" style:family="paragraph"/><style:style style:name="T4" style:family="text"/></office:automatic-styles><office:body><office:text><text:p text:style-name="P1"/></office:text></office:body></office:document-content>"#;

    fn setup() -> (SchemaConfig, Context, Element) {
        let schema = SchemaConfig::new(Generation::OpenDocument);
        let ctx = Context::new(schema.clone());
        (schema, ctx, parse(CONTENT).unwrap())
    }

    #[test]
    fn test_style_allocates_next_number() {
        let (schema, mut ctx, mut root) = setup();
        AddPagebreakStyle.apply(&mut root, &mut ctx).unwrap();
        assert_eq!(ctx.get_text("AddpagebreakStyle:stylename").unwrap(), "P10");

        let styles = &root.children[0];
        let created = styles.children.last().unwrap();
        assert_eq!(created.get(&schema.tag(Ns::Style, "name")), Some("P10"));
        assert_eq!(
            created.get(&schema.tag(Ns::Style, "parent-style-name")),
            Some("Standard")
        );
        let props = &created.children[0];
        assert_eq!(props.tag, schema.tag(Ns::Style, "paragraph-properties"));
        assert_eq!(props.get(&schema.tag(Ns::Fo, "break-before")), Some("page"));

        // A second request reuses the style.
        assert_eq!(ensure_pagebreak_style(&mut root, &mut ctx).unwrap(), "P10");
        assert_eq!(root.children[0].children.len(), 5);
    }

    #[test]
    fn test_pagebreak_appends_paragraph() {
        let (schema, mut ctx, mut root) = setup();
        AddPagebreakStyle.apply(&mut root, &mut ctx).unwrap();
        AddPagebreak::default().apply(&mut root, &mut ctx).unwrap();
        let body = schema.body(&root).unwrap();
        assert_eq!(body.children.len(), 2);
        assert_eq!(
            body.children[1].get(&schema.tag(Ns::Text, "style-name")),
            Some("P10")
        );
    }

    #[test]
    fn test_pagebreak_without_style_key() {
        let (_, mut ctx, mut root) = setup();
        let err = AddPagebreak::default().apply(&mut root, &mut ctx).unwrap_err();
        assert!(matches!(err, EngineError::ContextKeyMissing(_)));

        AddPagebreak::new(PagebreakStyle::Named("Break".to_string()))
            .apply(&mut root, &mut ctx)
            .unwrap();
    }

    #[test]
    fn test_missing_automatic_styles_is_created() {
        let schema = SchemaConfig::new(Generation::OpenDocument);
        let mut ctx = Context::new(schema.clone());
        let mut root = parse(r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"><office:body><office:text/></office:body></office:document-content>"#).unwrap();
        assert_eq!(ensure_pagebreak_style(&mut root, &mut ctx).unwrap(), "P1");
        assert_eq!(root.children[0].tag, schema.tag(Ns::Office, "automatic-styles"));
        assert_eq!(root.children[1].tag, schema.tag(Ns::Office, "body"));
    }
}
