/*
 * concatenate/styles.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Merging style definitions of several documents into one.
 */

//! Style merging.
//!
//! Every named definition (style, list style, data style, master page,
//! page layout, font declaration, drawing definition) of an appended
//! document is either recognised as a structural duplicate of a definition
//! already in the result, in which case references to it are redirected,
//! or it is copied over under a name that is unique in its scope. Style
//! names are unique per family: a paragraph style and a text style may
//! share a name. The mapping from old to new names is kept per document
//! and later applied to its body.

use super::refs::{DRAWING_DEFINITIONS, RefKind, RefRules};
use crate::context::Context;
use crate::document::Part;
use crate::schema::{Ns, SchemaConfig};
use crate::transform::Transform;
use crate::{EngineError, Result};
use odmerge_xml::{CanonicalForm, Element, local_name, namespace_uri};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Stands in for a definition's own name when comparing definitions.
const SELF_REFERENCE: &str = "\u{0}self";

/// Marks a reference whose target is not yet known.
const PENDING: char = '\u{0}';

/// A namespace of definition names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// `office:styles` and `office:master-styles` of styles.xml.
    Shared,
    ContentAuto,
    StylesAuto,
    ContentFonts,
    StylesFonts,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Shared => "common styles",
            Scope::ContentAuto => "content automatic styles",
            Scope::StylesAuto => "styles automatic styles",
            Scope::ContentFonts => "content font declarations",
            Scope::StylesFonts => "styles font declarations",
        })
    }
}

/// Scopes a reference of `kind` made from `part` resolves against, most
/// specific first.
fn visible(part: Part, kind: RefKind) -> &'static [Scope] {
    match (part, kind) {
        (Part::Content, RefKind::Style) => &[Scope::ContentAuto, Scope::Shared],
        (_, RefKind::Style) => &[Scope::StylesAuto, Scope::Shared],
        (Part::Content, RefKind::Font) => &[Scope::ContentFonts],
        (_, RefKind::Font) => &[Scope::StylesFonts],
        (_, RefKind::MasterPage) => &[Scope::Shared],
        (_, RefKind::PageLayout) => &[Scope::StylesAuto],
        (_, RefKind::Drawing) => &[Scope::Shared],
    }
}

/// A definition container and the scope its children are named in.
#[derive(Debug, Clone)]
struct Container {
    part: Part,
    tag: String,
    scope: Scope,
}

/// Containers in merge order: styles.xml first, so content.xml can refer
/// to everything it defines.
fn containers(schema: &SchemaConfig) -> Vec<Container> {
    let container = |part, tag, scope| Container { part, tag, scope };
    vec![
        container(Part::Styles, schema.font_decls_tag(), Scope::StylesFonts),
        container(Part::Styles, schema.tag(Ns::Office, "styles"), Scope::Shared),
        container(Part::Styles, schema.tag(Ns::Office, "automatic-styles"), Scope::StylesAuto),
        container(Part::Styles, schema.tag(Ns::Office, "master-styles"), Scope::Shared),
        container(Part::Content, schema.font_decls_tag(), Scope::ContentFonts),
        container(Part::Content, schema.tag(Ns::Office, "automatic-styles"), Scope::ContentAuto),
    ]
}

/// Order of the top-level children of content.xml and styles.xml.
pub(crate) fn root_order(schema: &SchemaConfig) -> Vec<String> {
    vec![
        schema.tag(Ns::Office, "scripts"),
        schema.tag(Ns::Office, "script"),
        schema.font_decls_tag(),
        schema.tag(Ns::Office, "styles"),
        schema.tag(Ns::Office, "automatic-styles"),
        schema.tag(Ns::Office, "master-styles"),
        schema.tag(Ns::Office, "body"),
    ]
}

/// The child of `root` tagged `tag`, inserted at its place in `order`
/// when absent.
pub(crate) fn ensure_container<'a>(root: &'a mut Element, tag: &str, order: &[String]) -> &'a mut Element {
    if let Some(index) = root.position(tag) {
        return &mut root.children[index];
    }
    let rank = |t: &str| order.iter().position(|o| o == t);
    let own = rank(tag).unwrap_or(order.len());
    let at = root
        .children
        .iter()
        .position(|c| rank(&c.tag).is_some_and(|r| r > own))
        .unwrap_or(root.children.len());
    root.children.insert(at, Element::new(tag));
    &mut root.children[at]
}

/// Old-to-new name mappings of one document.
#[derive(Debug, Clone, Default)]
pub struct DocNames {
    /// scope and kind, then family, then old name.
    maps: HashMap<(Scope, RefKind), HashMap<String, HashMap<String, String>>>,
}

impl DocNames {
    pub(crate) fn insert(
        &mut self,
        scope: Scope,
        kind: RefKind,
        family: &str,
        old: impl Into<String>,
        new: impl Into<String>,
    ) {
        self.maps
            .entry((scope, kind))
            .or_default()
            .entry(family.to_string())
            .or_default()
            .insert(old.into(), new.into());
    }

    /// New name of the `family` definition `name` as referenced from `part`.
    pub fn lookup_exact(&self, part: Part, kind: RefKind, family: &str, name: &str) -> Option<&str> {
        visible(part, kind).iter().find_map(|scope| {
            self.maps
                .get(&(*scope, kind))?
                .get(family)?
                .get(name)
                .map(String::as_str)
        })
    }

    /// Like [`DocNames::lookup_exact`], falling back to any family when
    /// `family` is unknown or has no mapping for `name`. Ties go to the
    /// alphabetically first family.
    pub fn lookup(&self, part: Part, kind: RefKind, family: Option<&str>, name: &str) -> Option<&str> {
        if let Some(found) = family.and_then(|f| self.lookup_exact(part, kind, f, name)) {
            return Some(found);
        }
        visible(part, kind).iter().find_map(|scope| {
            self.maps
                .get(&(*scope, kind))?
                .iter()
                .filter_map(|(family, map)| map.get(name).map(|new| (family, new)))
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(_, new)| new.as_str())
        })
    }

    pub fn is_empty(&self) -> bool {
        self.maps
            .values()
            .all(|families| families.values().all(HashMap::is_empty))
    }
}

/// The definition whose references are being rewritten.
#[derive(Debug, Clone, Copy)]
struct Owner<'a> {
    name: Option<&'a str>,
    kind: RefKind,
    family: &'a str,
}

/// Accumulates the merged style state across documents.
pub struct StyleMerger {
    schema: SchemaConfig,
    rules: RefRules,
    name_attr: String,
    display_attr: String,
    draw_name_attr: String,
    draw_display_attr: String,
    family_attr: String,
    list_style_tag: String,
    drawing_tags: Vec<String>,
    number_ns: String,
    used: HashSet<(Scope, RefKind, String, String)>,
    serialised: HashMap<(Scope, CanonicalForm), String>,
    names: Vec<DocNames>,
}

impl StyleMerger {
    pub fn new(schema: &SchemaConfig) -> Self {
        let number_tag = schema.tag(Ns::Number, "number-style");
        Self {
            schema: schema.clone(),
            rules: RefRules::new(schema),
            name_attr: schema.tag(Ns::Style, "name"),
            display_attr: schema.tag(Ns::Style, "display-name"),
            draw_name_attr: schema.tag(Ns::Draw, "name"),
            draw_display_attr: schema.tag(Ns::Draw, "display-name"),
            family_attr: schema.tag(Ns::Style, "family"),
            list_style_tag: schema.tag(Ns::Text, "list-style"),
            drawing_tags: DRAWING_DEFINITIONS.iter().map(|local| schema.tag(Ns::Draw, local)).collect(),
            number_ns: namespace_uri(&number_tag).unwrap_or_default().to_string(),
            used: HashSet::new(),
            serialised: HashMap::new(),
            names: Vec::new(),
        }
    }

    pub fn rules(&self) -> &RefRules {
        &self.rules
    }

    /// Name mappings of document `index`; 0 is the reference document.
    pub fn names(&self, index: usize) -> Option<&DocNames> {
        self.names.get(index)
    }

    /// Record the definitions of the reference document.
    ///
    /// Structural duplicates within the reference are removed and every
    /// reference to them is redirected to the definition that is kept.
    pub fn register_reference(&mut self, content: &mut Element, styles: &mut Element) -> Result<()> {
        let mut names = DocNames::default();
        for container in containers(&self.schema) {
            let root = match container.part {
                Part::Content => &mut *content,
                _ => &mut *styles,
            };
            let Some(target) = root.find_mut(&container.tag) else {
                continue;
            };

            let mut kept = Vec::new();
            for mut child in std::mem::take(&mut target.children) {
                let kind = self.definition_kind(&child);
                let Some(name) = child.get(self.name_attribute(kind)).map(str::to_string) else {
                    kept.push(child);
                    continue;
                };
                let family = self.definition_family(&child, kind);
                let owner = Owner {
                    name: Some(name.as_str()),
                    kind,
                    family: &family,
                };
                let mut pending = false;
                self.rewrite(&names, container.part, &mut child, owner, true, false, &mut pending)?;

                let key = (container.scope, self.canonical_key(&child, owner));
                if let Some(existing) = self.serialised.get(&key) {
                    if *existing != name {
                        tracing::debug!(scope = %container.scope, name = %name, kept = %existing, "Removing duplicate definition");
                        names.insert(container.scope, kind, &family, name.clone(), existing.clone());
                    }
                    continue;
                }
                self.used.insert((container.scope, kind, family.clone(), name.clone()));
                self.serialised.insert(key, name);
                kept.push(child);
            }
            target.children = kept;
        }

        if !names.is_empty() {
            let mut ctx = Context::new(self.schema.clone());
            self.rules
                .rename_access(Part::Styles, &names)
                .apply(styles, &mut ctx)?;
            self.rules
                .rename_access(Part::Content, &names)
                .apply(content, &mut ctx)?;
        }
        self.names.push(names);
        Ok(())
    }

    /// Merge the definitions of one appended document into the reference
    /// parts. The document's containers are emptied.
    ///
    /// # Errors
    ///
    /// A definition whose parent style is not defined before it is a
    /// schema violation.
    pub fn merge(
        &mut self,
        doc_content: &mut Element,
        doc_styles: &mut Element,
        ref_content: &mut Element,
        ref_styles: &mut Element,
    ) -> Result<()> {
        if self.names.is_empty() {
            return Err(EngineError::schema("reference document must be registered before merging"));
        }
        let index = self.names.len();
        let order = root_order(&self.schema);
        self.backfill_standard(doc_styles, ref_styles);

        let mut names = DocNames::default();
        let mut appended = Vec::new();
        for container in containers(&self.schema) {
            let (source_root, target_root) = match container.part {
                Part::Content => (&mut *doc_content, &mut *ref_content),
                _ => (&mut *doc_styles, &mut *ref_styles),
            };
            let Some(source) = source_root.find_mut(&container.tag) else {
                continue;
            };
            let children = std::mem::take(&mut source.children);
            let target = ensure_container(target_root, &container.tag, &order);
            let start = target.children.len();
            for child in children {
                self.merge_definition(&mut names, &container, child, target)?;
            }
            appended.push((container, start));
        }

        // Resolve references to definitions that came later in the document.
        for (container, start) in appended {
            let root = match container.part {
                Part::Content => &mut *ref_content,
                _ => &mut *ref_styles,
            };
            if let Some(target) = root.find_mut(&container.tag) {
                for child in &mut target.children[start..] {
                    resolve_pending(&names, container.part, child);
                }
            }
        }

        tracing::debug!(document = index, "Merged style definitions");
        self.names.push(names);
        Ok(())
    }

    fn merge_definition(
        &mut self,
        names: &mut DocNames,
        container: &Container,
        mut child: Element,
        target: &mut Element,
    ) -> Result<()> {
        let kind = self.definition_kind(&child);
        let family = self.definition_family(&child, kind);
        let name_attr = self.name_attribute(kind).to_string();
        let Some(name) = child.get(&name_attr).map(str::to_string) else {
            let owner = Owner {
                name: None,
                kind,
                family: &family,
            };
            let mut pending = false;
            self.rewrite(names, container.part, &mut child, owner, true, true, &mut pending)?;
            let present = target.children.iter().any(|c| {
                c.tag == child.tag && c.get(&name_attr).is_none() && self.definition_family(c, kind) == family
            });
            if present {
                tracing::debug!(tag = %child.tag, "Dropping nameless definition already present");
            } else {
                target.children.push(child);
            }
            return Ok(());
        };

        let owner = Owner {
            name: Some(name.as_str()),
            kind,
            family: &family,
        };
        let mut pending = false;
        self.rewrite(names, container.part, &mut child, owner, true, true, &mut pending)?;

        let key = (container.scope, self.canonical_key(&child, owner));
        if !pending {
            if let Some(existing) = self.serialised.get(&key) {
                tracing::debug!(scope = %container.scope, family = %family, name = %name, existing = %existing, "Reusing identical definition");
                names.insert(container.scope, kind, &family, name.clone(), existing.clone());
                return Ok(());
            }
        }

        let new_name = self.allocate(container.scope, kind, &family, &name);
        if new_name != name {
            child.set(name_attr.clone(), new_name.clone());
            child.remove(self.display_attribute(kind));
            let tag = child.tag.clone();
            for attribute in &mut child.attributes {
                if attribute.value == name && self.is_self_reference(&tag, &attribute.name, owner) {
                    attribute.value = new_name.clone();
                }
            }
            tracing::debug!(scope = %container.scope, family = %family, from = %name, to = %new_name, "Renamed definition");
        }
        if !self.used.insert((container.scope, kind, family.clone(), new_name.clone())) {
            return Err(EngineError::NameCollision {
                domain: format!("{} ({})", container.scope, family),
                name: new_name,
            });
        }
        if !pending {
            self.serialised.insert(key, new_name.clone());
        }
        names.insert(container.scope, kind, &family, name.clone(), new_name);
        target.children.push(child);
        Ok(())
    }

    /// Rewrite the references inside a definition.
    ///
    /// Self references of the definition itself are left alone. In strict
    /// mode an unknown parent is an error and other unknown references are
    /// marked pending.
    #[allow(clippy::too_many_arguments)]
    fn rewrite(
        &self,
        names: &DocNames,
        part: Part,
        element: &mut Element,
        owner: Owner<'_>,
        top: bool,
        strict: bool,
        pending: &mut bool,
    ) -> Result<()> {
        for attribute in &mut element.attributes {
            let Some(rule) = self.rules.rule_for(&element.tag, &attribute.name) else {
                continue;
            };
            if attribute.value.is_empty() {
                continue;
            }
            let family = rule.family_for(&element.tag, Some(owner.family));
            if top
                && owner.name == Some(attribute.value.as_str())
                && self.is_self_reference(&element.tag, &attribute.name, owner)
            {
                continue;
            }
            let found = match family {
                Some(family) if strict => names.lookup_exact(part, rule.kind, family, &attribute.value),
                _ => names.lookup(part, rule.kind, family, &attribute.value),
            };
            match found {
                Some(new) => attribute.value = new.to_string(),
                None if !strict => {}
                None if attribute.name == self.rules.parent_attribute() => {
                    return Err(EngineError::schema_in(
                        part.file_name(),
                        format!(
                            "'{}' refers to parent style '{}' which is not defined before it",
                            owner.name.unwrap_or("<unnamed>"),
                            attribute.value
                        ),
                    ));
                }
                None => {
                    attribute.value = pending_marker(rule.kind, family, &attribute.value);
                    *pending = true;
                }
            }
        }
        for child in &mut element.children {
            self.rewrite(names, part, child, owner, false, strict, pending)?;
        }
        Ok(())
    }

    /// Whether `attribute` on an element tagged `tag` can name the owner
    /// definition itself.
    fn is_self_reference(&self, tag: &str, attribute: &str, owner: Owner<'_>) -> bool {
        attribute != self.name_attribute(owner.kind)
            && self.rules.rule_for(tag, attribute).is_some_and(|rule| {
                rule.kind == owner.kind
                    && rule
                        .family_for(tag, Some(owner.family))
                        .is_none_or(|family| family == owner.family)
            })
    }

    /// Structural key of a definition with its own name erased.
    fn canonical_key(&self, element: &Element, owner: Owner<'_>) -> CanonicalForm {
        let mut normalized = element.clone();
        if let Some(name) = owner.name {
            for attribute in &mut normalized.attributes {
                if attribute.value == name && self.is_self_reference(&element.tag, &attribute.name, owner) {
                    attribute.value = SELF_REFERENCE.to_string();
                }
            }
        }
        CanonicalForm::of(&normalized, self.name_attribute(owner.kind))
    }

    fn definition_kind(&self, element: &Element) -> RefKind {
        if element.tag == self.schema.font_decl_tag() {
            RefKind::Font
        } else if element.tag == self.schema.tag(Ns::Style, "master-page") {
            RefKind::MasterPage
        } else if element.tag == self.schema.page_layout_tag() {
            RefKind::PageLayout
        } else if self.drawing_tags.contains(&element.tag) {
            RefKind::Drawing
        } else {
            RefKind::Style
        }
    }

    /// The namespace a definition's name lives in within its kind.
    fn definition_family(&self, element: &Element, kind: RefKind) -> String {
        match kind {
            RefKind::Style => {
                if namespace_uri(&element.tag) == Some(self.number_ns.as_str()) {
                    "data".to_string()
                } else if let Some(family) = element.get(&self.family_attr) {
                    family.to_string()
                } else if element.tag == self.list_style_tag {
                    "list".to_string()
                } else {
                    local_name(&element.tag).to_string()
                }
            }
            RefKind::Drawing => local_name(&element.tag).to_string(),
            _ => String::new(),
        }
    }

    fn name_attribute(&self, kind: RefKind) -> &str {
        match kind {
            RefKind::Drawing => &self.draw_name_attr,
            _ => &self.name_attr,
        }
    }

    fn display_attribute(&self, kind: RefKind) -> &str {
        match kind {
            RefKind::Drawing => &self.draw_display_attr,
            _ => &self.display_attr,
        }
    }

    /// `name` if free, else `Concat_<name>`, `Concat_<name>1`, ...
    fn allocate(&self, scope: Scope, kind: RefKind, family: &str, name: &str) -> String {
        if !self.conflicts(scope, kind, family, name) {
            return name.to_string();
        }
        let base = format!("Concat_{name}");
        let mut candidate = base.clone();
        let mut n = 0u32;
        while self.conflicts(scope, kind, family, &candidate) {
            n += 1;
            candidate = format!("{base}{n}");
        }
        candidate
    }

    /// Style names of content and styles share a namespace with the
    /// common styles of the same family, but not with each other.
    fn conflicts(&self, scope: Scope, kind: RefKind, family: &str, name: &str) -> bool {
        let own = [scope];
        let scopes: &[Scope] = match (kind, scope) {
            (RefKind::Style, Scope::Shared) => &[Scope::Shared, Scope::ContentAuto, Scope::StylesAuto],
            (RefKind::Style, Scope::ContentAuto) => &[Scope::ContentAuto, Scope::Shared],
            (RefKind::Style, Scope::StylesAuto) => &[Scope::StylesAuto, Scope::Shared],
            _ => &own,
        };
        scopes
            .iter()
            .any(|s| self.used.contains(&(*s, kind, family.to_string(), name.to_string())))
    }

    /// Copy the paragraph defaults of an appended document into its
    /// `Standard` style, so they survive when the reference's defaults
    /// replace its own.
    fn backfill_standard(&self, doc_styles: &mut Element, ref_styles: &Element) {
        let styles_tag = self.schema.tag(Ns::Office, "styles");
        let default_tag = self.schema.tag(Ns::Style, "default-style");
        let paragraph_default = |root: &Element| {
            root.find(&styles_tag)?
                .children
                .iter()
                .find(|c| c.tag == default_tag && c.get(&self.family_attr) == Some("paragraph"))
                .cloned()
        };

        let Some(defaults) = paragraph_default(doc_styles) else {
            return;
        };
        let same = paragraph_default(ref_styles)
            .is_some_and(|d| d.canonical_form(&self.name_attr) == defaults.canonical_form(&self.name_attr));
        if same {
            return;
        }

        let style_tag = self.schema.tag(Ns::Style, "style");
        let Some(standard) = doc_styles.find_mut(&styles_tag).and_then(|s| {
            s.children.iter_mut().find(|c| {
                c.tag == style_tag
                    && c.get(&self.name_attr) == Some("Standard")
                    && c.get(&self.family_attr) == Some("paragraph")
            })
        }) else {
            return;
        };

        for properties in &defaults.children {
            let index = match standard.position(&properties.tag) {
                Some(index) => index,
                None => {
                    standard.children.push(Element::new(properties.tag.clone()));
                    standard.children.len() - 1
                }
            };
            let target = &mut standard.children[index];
            for attribute in &properties.attributes {
                if target.get(&attribute.name).is_none() {
                    target.set(attribute.name.clone(), attribute.value.clone());
                }
            }
            for child in &properties.children {
                if target.position(&child.tag).is_none() {
                    target.children.push(child.clone());
                }
            }
        }
        tracing::debug!("Backfilled Standard style from document defaults");
    }
}

/// Replace pending markers with the final names. References that never
/// resolve keep their original value.
fn resolve_pending(names: &DocNames, part: Part, element: &mut Element) {
    element.visit_mut(&mut |e: &mut Element| {
        for attribute in &mut e.attributes {
            let Some((kind, family, old)) = parse_pending(&attribute.value) else {
                continue;
            };
            let resolved = match names.lookup(part, kind, family, old) {
                Some(new) => new.to_string(),
                None => {
                    tracing::warn!(part = %part, reference = %old, "Reference to undefined name left unchanged");
                    old.to_string()
                }
            };
            attribute.value = resolved;
        }
    });
}

/// Family placeholder of a pending reference that matches any family.
const ANY_FAMILY: &str = "*";

fn pending_marker(kind: RefKind, family: Option<&str>, old: &str) -> String {
    let family = family.unwrap_or(ANY_FAMILY);
    format!("{PENDING}{}{PENDING}{family}{PENDING}{old}", kind.index())
}

fn parse_pending(value: &str) -> Option<(RefKind, Option<&str>, &str)> {
    let (index, rest) = value.strip_prefix(PENDING)?.split_once(PENDING)?;
    let (family, old) = rest.split_once(PENDING)?;
    let kind = RefKind::from_index(index.parse().ok()?)?;
    Some((kind, (family != ANY_FAMILY).then_some(family), old))
}
