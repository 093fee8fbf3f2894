/*
 * attribute_access.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Generic tag-keyed attribute reads and rewrites.
 */

//! Attribute access.
//!
//! An [`Accessor`] names a target tag (or every element) and an attribute,
//! and maps the attribute's current value to a new one. [`AttributeAccess`]
//! runs a list of accessors over a tree in a single top-down walk, which is
//! how counters are read and written, anchored objects are moved, unique
//! names are regenerated and cross-references are renamed.

use crate::context::{Context, producer};
use crate::document::Part;
use crate::schema::{Generation, Ns, SchemaConfig};
use crate::transform::Transform;
use crate::{EngineError, Result};
use odmerge_xml::Element;
use std::collections::HashMap;

/// Statistics attributes of `meta:document-statistic`.
pub const META_COUNTERS: [&str; 7] = [
    "page-count",
    "paragraph-count",
    "character-count",
    "word-count",
    "image-count",
    "object-count",
    "table-count",
];

/// A (tag, attribute) target with a value mapping.
pub trait Accessor {
    /// Qualified tag this accessor is interested in; `None` for every element.
    fn target(&self) -> Option<&str>;

    /// Qualified attribute name.
    fn attribute(&self) -> &str;

    /// Called once before each walk.
    fn begin(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Map the current value (`None` when absent) to a new value.
    /// `None` leaves the element untouched.
    fn use_value(&mut self, old: Option<&str>, ctx: &mut Context) -> Result<Option<String>>;

    /// Like [`Accessor::use_value`], for accessors whose mapping depends on
    /// the qualified tag of the element being visited.
    fn use_value_on(&mut self, _tag: &str, old: Option<&str>, ctx: &mut Context) -> Result<Option<String>> {
        self.use_value(old, ctx)
    }
}

/// Records the attribute value into a context key.
#[derive(Debug, Clone)]
pub struct GetAttribute {
    tag: String,
    attribute: String,
    key: String,
}

impl GetAttribute {
    pub fn new(tag: impl Into<String>, attribute: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attribute: attribute.into(),
            key: key.into(),
        }
    }
}

impl Accessor for GetAttribute {
    fn target(&self) -> Option<&str> {
        Some(&self.tag)
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn use_value(&mut self, old: Option<&str>, ctx: &mut Context) -> Result<Option<String>> {
        if let Some(value) = old {
            ctx.set(self.key.clone(), value);
        }
        Ok(None)
    }
}

/// Tracks the maximum integer value of an attribute in a context key.
#[derive(Debug, Clone)]
pub struct GetMax {
    tag: String,
    attribute: String,
    key: String,
    initial: i64,
}

impl GetMax {
    /// The key starts at `initial` at the beginning of every walk.
    pub fn new(
        tag: impl Into<String>,
        attribute: impl Into<String>,
        key: impl Into<String>,
        initial: i64,
    ) -> Self {
        Self {
            tag: tag.into(),
            attribute: attribute.into(),
            key: key.into(),
            initial,
        }
    }
}

impl Accessor for GetMax {
    fn target(&self) -> Option<&str> {
        Some(&self.tag)
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn begin(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.set(self.key.clone(), self.initial);
        Ok(())
    }

    fn use_value(&mut self, old: Option<&str>, ctx: &mut Context) -> Result<Option<String>> {
        let Some(value) = old else {
            return Ok(None);
        };
        let n = parse_int(&self.attribute, value)?;
        if n > ctx.get_int(&self.key)? {
            ctx.set(self.key.clone(), n);
        }
        Ok(None)
    }
}

/// Where [`SetAttribute`] takes its new value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetSource {
    /// A context key, read when the attribute is encountered.
    Key(String),
    Fixed(String),
}

/// Overwrites an existing attribute.
#[derive(Debug, Clone)]
pub struct SetAttribute {
    tag: String,
    attribute: String,
    source: SetSource,
    old_value: Option<String>,
}

impl SetAttribute {
    pub fn new(tag: impl Into<String>, attribute: impl Into<String>, source: SetSource) -> Self {
        Self {
            tag: tag.into(),
            attribute: attribute.into(),
            source,
            old_value: None,
        }
    }

    /// Only overwrite when the current value equals `old_value`.
    pub fn when_equal(mut self, old_value: impl Into<String>) -> Self {
        self.old_value = Some(old_value.into());
        self
    }
}

impl Accessor for SetAttribute {
    fn target(&self) -> Option<&str> {
        Some(&self.tag)
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn use_value(&mut self, old: Option<&str>, ctx: &mut Context) -> Result<Option<String>> {
        let Some(current) = old else {
            return Ok(None);
        };
        if self.old_value.as_deref().is_some_and(|expected| expected != current) {
            return Ok(None);
        }
        let value = match &self.source {
            SetSource::Key(key) => ctx.get_text(key)?,
            SetSource::Fixed(value) => value.clone(),
        };
        Ok(Some(value))
    }
}

/// Assigns sequential names `<base><n>`.
#[derive(Debug, Clone)]
pub struct Renumber {
    tag: String,
    attribute: String,
    base: String,
    start: u32,
    next: u32,
}

impl Renumber {
    pub fn new(tag: impl Into<String>, attribute: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attribute: attribute.into(),
            base: base.into(),
            start: 1,
            next: 1,
        }
    }

    pub fn starting_at(mut self, start: u32) -> Self {
        self.start = start;
        self.next = start;
        self
    }
}

impl Accessor for Renumber {
    fn target(&self) -> Option<&str> {
        Some(&self.tag)
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn begin(&mut self, _ctx: &mut Context) -> Result<()> {
        self.next = self.start;
        Ok(())
    }

    fn use_value(&mut self, _old: Option<&str>, _ctx: &mut Context) -> Result<Option<String>> {
        let name = format!("{}{}", self.base, self.next);
        self.next += 1;
        Ok(Some(name))
    }
}

/// Adds an offset to an integer attribute (page anchors, z-index).
#[derive(Debug, Clone)]
pub struct Reanchor {
    tag: String,
    attribute: String,
    offset: i64,
}

impl Reanchor {
    pub fn new(tag: impl Into<String>, attribute: impl Into<String>, offset: i64) -> Self {
        Self {
            tag: tag.into(),
            attribute: attribute.into(),
            offset,
        }
    }
}

impl Accessor for Reanchor {
    fn target(&self) -> Option<&str> {
        Some(&self.tag)
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn use_value(&mut self, old: Option<&str>, _ctx: &mut Context) -> Result<Option<String>> {
        match old {
            None => Ok(None),
            Some(value) => Ok(Some((parse_int(&self.attribute, value)? + self.offset).to_string())),
        }
    }
}

fn parse_int(attribute: &str, value: &str) -> Result<i64> {
    value.trim().parse().map_err(|_| EngineError::InvalidValue {
        key: attribute.to_string(),
        value: value.to_string(),
    })
}

/// Runs a set of accessors in one document-order walk.
pub struct AttributeAccess {
    name: String,
    part: Part,
    priority: i32,
    accessors: Vec<Box<dyn Accessor>>,
    attributes: Vec<String>,
    by_tag: HashMap<String, Vec<usize>>,
    global: Vec<usize>,
}

impl AttributeAccess {
    pub fn new(
        name: impl Into<String>,
        part: Part,
        priority: i32,
        accessors: Vec<Box<dyn Accessor>>,
    ) -> Self {
        let mut by_tag: HashMap<String, Vec<usize>> = HashMap::new();
        let mut global = Vec::new();
        for (index, accessor) in accessors.iter().enumerate() {
            match accessor.target() {
                Some(tag) => by_tag.entry(tag.to_string()).or_default().push(index),
                None => global.push(index),
            }
        }
        let attributes = accessors.iter().map(|a| a.attribute().to_string()).collect();
        Self {
            name: name.into(),
            part,
            priority,
            accessors,
            attributes,
            by_tag,
            global,
        }
    }

    /// Content-part instance used internally by composite transforms.
    pub fn content(name: impl Into<String>, accessors: Vec<Box<dyn Accessor>>) -> Self {
        Self::new(name, Part::Content, 110, accessors)
    }

    /// Walk several trees as one: accessors are reset once, then every root
    /// is visited in order.
    pub fn apply_each<'a>(
        &mut self,
        roots: impl IntoIterator<Item = &'a mut Element>,
        ctx: &mut Context,
    ) -> Result<()> {
        for accessor in &mut self.accessors {
            accessor.begin(ctx)?;
        }
        for root in roots {
            self.walk(root, ctx)?;
        }
        Ok(())
    }

    fn walk(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
        let accessors = &mut self.accessors;
        let attributes = &self.attributes;
        let by_tag = &self.by_tag;
        let global = &self.global;

        root.walk_mut(&mut |element: &mut Element| -> Result<()> {
            let specific = by_tag.get(&element.tag).map(Vec::as_slice).unwrap_or_default();
            for &index in specific.iter().chain(global.iter()) {
                let attribute = &attributes[index];
                let old = element.get(attribute).map(str::to_string);
                let Some(new) = accessors[index].use_value_on(&element.tag, old.as_deref(), ctx)? else {
                    continue;
                };
                if old.as_deref() != Some(new.as_str()) {
                    tracing::trace!(
                        tag = %element.tag,
                        attribute = %attribute,
                        old = ?old,
                        new = %new,
                        "Rewriting attribute"
                    );
                    element.set(attribute.clone(), new);
                }
            }
            Ok(())
        })
    }
}

impl Transform for AttributeAccess {
    fn name(&self) -> &str {
        &self.name
    }

    fn part(&self) -> Part {
        self.part
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
        self.apply_each(std::iter::once(root), ctx)
    }
}

/// Records every document statistic into `GetAttribute:<counter>`.
pub fn get_meta(schema: &SchemaConfig) -> AttributeAccess {
    let tag = schema.tag(Ns::Meta, "document-statistic");
    let accessors = META_COUNTERS
        .iter()
        .map(|counter| {
            Box::new(GetAttribute::new(
                tag.clone(),
                schema.tag(Ns::Meta, counter),
                Context::key(producer::GET_ATTRIBUTE, counter),
            )) as Box<dyn Accessor>
        })
        .collect();
    AttributeAccess::new("get-meta", Part::Meta, 20, accessors)
}

/// Writes `SetAttribute:<counter>` back into every present statistic.
pub fn set_meta(schema: &SchemaConfig) -> AttributeAccess {
    let tag = schema.tag(Ns::Meta, "document-statistic");
    let accessors = META_COUNTERS
        .iter()
        .map(|counter| {
            Box::new(SetAttribute::new(
                tag.clone(),
                schema.tag(Ns::Meta, counter),
                SetSource::Key(Context::key(producer::SET_ATTRIBUTE, counter)),
            )) as Box<dyn Accessor>
        })
        .collect();
    AttributeAccess::new("set-meta", Part::Meta, 120, accessors)
}

/// Frames are named `Frame<n>`.
pub fn renumber_frames(schema: &SchemaConfig) -> Renumber {
    Renumber::new(schema.frame_tag(), schema.tag(Ns::Draw, "name"), "Frame")
}

/// Sections are named `Section<n>`.
pub fn renumber_sections(schema: &SchemaConfig) -> Renumber {
    Renumber::new(
        schema.tag(Ns::Text, "section"),
        schema.tag(Ns::Text, "name"),
        "Section",
    )
}

/// Tables are named `Table<n>`.
pub fn renumber_tables(schema: &SchemaConfig) -> Renumber {
    Renumber::new(
        schema.tag(Ns::Table, "table"),
        schema.tag(Ns::Table, "name"),
        "Table",
    )
}

/// Images are named `Graphic<n>`.
pub fn renumber_images(schema: &SchemaConfig) -> Renumber {
    Renumber::new(schema.tag(Ns::Draw, "image"), schema.tag(Ns::Draw, "name"), "Graphic")
}

/// Embedded objects are named `Object<n>`.
pub fn renumber_objects(schema: &SchemaConfig) -> Renumber {
    Renumber::new(schema.tag(Ns::Draw, "object"), schema.tag(Ns::Draw, "name"), "Object")
}

/// Regenerate every unique object name in content.xml.
///
/// OpenDocument images and objects sit inside a named `draw:frame`, so
/// only the frame is renumbered there.
pub fn renumber_all(schema: &SchemaConfig) -> AttributeAccess {
    let mut accessors: Vec<Box<dyn Accessor>> = vec![
        Box::new(renumber_frames(schema)),
        Box::new(renumber_sections(schema)),
        Box::new(renumber_tables(schema)),
    ];
    if schema.generation() == Generation::OpenOffice1 {
        accessors.push(Box::new(renumber_images(schema)));
        accessors.push(Box::new(renumber_objects(schema)));
    }
    AttributeAccess::new("renumber", Part::Content, 110, accessors)
}

/// Move page-anchored shapes by `pages` and restack every shape by `z`.
pub fn reanchor_shapes(schema: &SchemaConfig, pages: i64, z: i64) -> AttributeAccess {
    let anchor = schema.tag(Ns::Text, "anchor-page-number");
    let z_index = schema.tag(Ns::Draw, "z-index");
    let mut accessors: Vec<Box<dyn Accessor>> = Vec::new();
    for tag in schema.shape_tags() {
        accessors.push(Box::new(Reanchor::new(tag.clone(), anchor.clone(), pages)));
        accessors.push(Box::new(Reanchor::new(tag, z_index.clone(), z)));
    }
    AttributeAccess::content("reanchor", accessors)
}

/// Highest `draw:z-index` of any shape, `-1` when there is none.
pub fn max_z_index<'a>(
    schema: &SchemaConfig,
    roots: impl IntoIterator<Item = &'a mut Element>,
    ctx: &mut Context,
    key: &str,
) -> Result<i64> {
    let z_index = schema.tag(Ns::Draw, "z-index");
    let accessors = schema
        .shape_tags()
        .into_iter()
        .map(|tag| Box::new(GetMax::new(tag, z_index.clone(), key, -1)) as Box<dyn Accessor>)
        .collect();
    AttributeAccess::content("max-z-index", accessors).apply_each(roots, ctx)?;
    ctx.get_int(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use odmerge_xml::parse;

    const SXW_CONTENT: &str = r#"<office:document-content
        xmlns:office="http://openoffice.org/2000/office"
        xmlns:text="http://openoffice.org/2000/text"
        xmlns:draw="http://openoffice.org/2000/drawing"
        xmlns:table="http://openoffice.org/2000/table">
      <office:body>
        <draw:text-box draw:name="A" draw:z-index="2" text:anchor-page-number="1"/>
        <draw:rect draw:z-index="5"/>
        <text:section text:name="intro"><text:p/></text:section>
        <text:p><draw:text-box draw:name="A" draw:z-index="0"/></text:p>
        <table:table table:name="prices"/>
        <text:section text:name="outro"/>
      </office:body>
    </office:document-content>"#;

    const SXW_META: &str = r#"<office:document-meta
        xmlns:office="http://openoffice.org/2000/office"
        xmlns:meta="http://openoffice.org/2000/meta">
      <office:meta>
        <meta:document-statistic meta:page-count="2" meta:paragraph-count="12"/>
      </office:meta>
    </office:document-meta>"#;

    fn schema() -> SchemaConfig {
        SchemaConfig::new(Generation::OpenOffice1)
    }

    fn ctx() -> Context {
        Context::new(schema())
    }

    fn names(root: &Element, tag: &str, attribute: &str) -> Vec<Option<String>> {
        root.iter()
            .filter(|e| e.tag == tag)
            .map(|e| e.get(attribute).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_get_and_set_meta() {
        let s = schema();
        let mut ctx = ctx();
        let mut meta = parse(SXW_META).unwrap();

        get_meta(&s).apply(&mut meta, &mut ctx).unwrap();
        assert_eq!(ctx.get_int("GetAttribute:page-count").unwrap(), 2);
        assert_eq!(ctx.get_int("GetAttribute:paragraph-count").unwrap(), 12);
        assert!(!ctx.has("GetAttribute:word-count"));

        ctx.set("SetAttribute:page-count", 6_i64);
        ctx.set("SetAttribute:paragraph-count", "38");
        set_meta(&s).apply(&mut meta, &mut ctx).unwrap();

        let stat = meta.find_descendant(&s.tag(Ns::Meta, "document-statistic")).unwrap();
        assert_eq!(stat.get(&s.tag(Ns::Meta, "page-count")), Some("6"));
        assert_eq!(stat.get(&s.tag(Ns::Meta, "paragraph-count")), Some("38"));
        // Absent attributes stay absent.
        assert_eq!(stat.get(&s.tag(Ns::Meta, "word-count")), None);
    }

    #[test]
    fn test_set_meta_without_values_is_missing_key() {
        let s = schema();
        let mut meta = parse(SXW_META).unwrap();
        let err = set_meta(&s).apply(&mut meta, &mut ctx()).unwrap_err();
        assert!(matches!(err, EngineError::ContextKeyMissing(_)));
    }

    #[test]
    fn test_set_attribute_when_equal() {
        let mut ctx = ctx();
        let mut root = parse(r#"<r><e a="x"/><e a="y"/><e/></r>"#).unwrap();
        let set = SetAttribute::new("e", "a", SetSource::Fixed("z".to_string())).when_equal("y");
        AttributeAccess::new("set", Part::Content, 100, vec![Box::new(set)])
            .apply(&mut root, &mut ctx)
            .unwrap();
        assert_eq!(
            names(&root, "e", "a"),
            vec![Some("x".to_string()), Some("z".to_string()), None]
        );
    }

    #[test]
    fn test_renumber_all_in_document_order() {
        let s = schema();
        let mut root = parse(SXW_CONTENT).unwrap();
        let mut renumber = renumber_all(&s);
        renumber.apply(&mut root, &mut ctx()).unwrap();

        assert_eq!(
            names(&root, &s.tag(Ns::Draw, "text-box"), &s.tag(Ns::Draw, "name")),
            vec![Some("Frame1".to_string()), Some("Frame2".to_string())]
        );
        assert_eq!(
            names(&root, &s.tag(Ns::Text, "section"), &s.tag(Ns::Text, "name")),
            vec![Some("Section1".to_string()), Some("Section2".to_string())]
        );
        assert_eq!(
            names(&root, &s.tag(Ns::Table, "table"), &s.tag(Ns::Table, "name")),
            vec![Some("Table1".to_string())]
        );

        // A second run restarts numbering.
        renumber.apply(&mut root, &mut ctx()).unwrap();
        assert_eq!(
            names(&root, &s.tag(Ns::Table, "table"), &s.tag(Ns::Table, "name")),
            vec![Some("Table1".to_string())]
        );
    }

    #[test]
    fn test_reanchor_and_max_z() {
        let s = schema();
        let mut ctx = ctx();
        let mut root = parse(SXW_CONTENT).unwrap();

        let max = max_z_index(&s, std::iter::once(&mut root), &mut ctx, "Test:z").unwrap();
        assert_eq!(max, 5);

        reanchor_shapes(&s, 3, 6).apply(&mut root, &mut ctx).unwrap();
        let boxes: Vec<_> = root
            .iter()
            .filter(|e| e.tag == s.tag(Ns::Draw, "text-box"))
            .map(|e| {
                (
                    e.get(&s.tag(Ns::Draw, "z-index")).map(str::to_string),
                    e.get(&s.tag(Ns::Text, "anchor-page-number")).map(str::to_string),
                )
            })
            .collect();
        assert_eq!(
            boxes,
            vec![
                (Some("8".to_string()), Some("4".to_string())),
                (Some("6".to_string()), None),
            ]
        );
    }

    #[test]
    fn test_max_z_without_shapes() {
        let s = schema();
        let mut ctx = ctx();
        let mut root = parse(r#"<r/>"#).unwrap();
        assert_eq!(max_z_index(&s, std::iter::once(&mut root), &mut ctx, "Test:z").unwrap(), -1);
    }

    #[test]
    fn test_reanchor_rejects_non_integer() {
        let mut root = parse(r#"<r><e n="two"/></r>"#).unwrap();
        let err = AttributeAccess::new("r", Part::Content, 100, vec![Box::new(Reanchor::new("e", "n", 1))])
            .apply(&mut root, &mut ctx())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidValue { ref value, .. } if value == "two"));
    }
}
