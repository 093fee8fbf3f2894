//! Cross-reference kinds and the attributes that carry them.

use super::styles::DocNames;
use crate::attribute_access::{Accessor, AttributeAccess};
use crate::context::Context;
use crate::document::Part;
use crate::schema::{Ns, SchemaConfig};
use crate::Result;
use odmerge_xml::local_name;
use std::collections::HashMap;
use std::rc::Rc;

/// What a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefKind {
    /// Paragraph, text, table, graphic, list and data styles.
    Style,
    MasterPage,
    PageLayout,
    Font,
    /// Gradients, hatches, markers, dashes, fill images and opacities,
    /// named by `draw:name`.
    Drawing,
}

impl RefKind {
    pub const ALL: [RefKind; 5] = [
        RefKind::Style,
        RefKind::MasterPage,
        RefKind::PageLayout,
        RefKind::Font,
        RefKind::Drawing,
    ];

    pub(crate) fn index(self) -> u8 {
        match self {
            RefKind::Style => 0,
            RefKind::MasterPage => 1,
            RefKind::PageLayout => 2,
            RefKind::Font => 3,
            RefKind::Drawing => 4,
        }
    }

    pub(crate) fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }
}

/// Local names of the drawing definitions kept in `office:styles`.
pub const DRAWING_DEFINITIONS: [&str; 7] = [
    "gradient",
    "hatch",
    "marker",
    "stroke-dash",
    "fill-image",
    "opacity",
    "transparency",
];

/// How the family of a referenced definition is determined.
///
/// Names are unique per family, so `P1` may be both a paragraph and a text
/// style. Definitions of the non-style kinds all use the empty family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Family {
    /// The family of the definition the reference appears in.
    Owner,
    Fixed(&'static str),
    /// `text:style-name`, which depends on the referencing element.
    TextElement,
    /// `table:style-name`, which depends on the referencing element.
    TableElement,
    /// Unknown; any family matches.
    Any,
}

fn text_style_family(local: &str) -> &'static str {
    match local {
        "p" | "h" | "index-source-style" | "index-title-template" => "paragraph",
        l if l.ends_with("-entry-template") => "paragraph",
        "list" | "numbered-paragraph" | "ordered-list" | "unordered-list" => "list",
        "section" | "index-title" | "table-of-content" | "alphabetical-index" | "illustration-index"
        | "table-index" | "object-index" | "user-index" | "bibliography" => "section",
        "ruby" => "ruby",
        _ => "text",
    }
}

fn table_style_family(local: &str) -> Option<&'static str> {
    match local {
        "table" => Some("table"),
        "table-column" => Some("table-column"),
        "table-row" => Some("table-row"),
        "table-cell" | "covered-table-cell" => Some("table-cell"),
        _ => None,
    }
}

/// One referencing attribute, optionally restricted to a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefRule {
    pub tag: Option<String>,
    pub attribute: String,
    pub kind: RefKind,
    pub family: Family,
}

impl RefRule {
    /// Family of the definition referenced from an element tagged
    /// `element`, inside a definition of family `owner` if any. `None`
    /// matches any family.
    pub fn family_for<'a>(&self, element: &str, owner: Option<&'a str>) -> Option<&'a str> {
        match &self.family {
            Family::Owner => owner,
            Family::Fixed(family) => Some(*family),
            Family::TextElement => Some(text_style_family(local_name(element))),
            Family::TableElement => table_style_family(local_name(element)),
            Family::Any => None,
        }
    }
}

/// Every attribute that refers to a named definition.
#[derive(Debug, Clone)]
pub struct RefRules {
    rules: Vec<RefRule>,
    by_attribute: HashMap<String, Vec<usize>>,
    parent: String,
}

impl RefRules {
    pub fn new(schema: &SchemaConfig) -> Self {
        let rule = |tag: Option<String>, ns: Ns, local: &str, kind: RefKind, family: Family| RefRule {
            tag,
            attribute: schema.tag(ns, local),
            kind,
            family,
        };
        let style = |ns: Ns, local: &str, family: Family| rule(None, ns, local, RefKind::Style, family);
        let fixed = |ns: Ns, local: &str, family: &'static str| style(ns, local, Family::Fixed(family));
        let drawing = |local: &str, family: &'static str| {
            rule(None, Ns::Draw, local, RefKind::Drawing, Family::Fixed(family))
        };
        let plain = |ns: Ns, local: &str, kind: RefKind| rule(None, ns, local, kind, Family::Fixed(""));

        let rules = vec![
            style(Ns::Style, "parent-style-name", Family::Owner),
            rule(
                Some(schema.tag(Ns::Style, "style")),
                Ns::Style,
                "next-style-name",
                RefKind::Style,
                Family::Fixed("paragraph"),
            ),
            rule(
                Some(schema.tag(Ns::Style, "master-page")),
                Ns::Style,
                "next-style-name",
                RefKind::MasterPage,
                Family::Fixed(""),
            ),
            fixed(Ns::Style, "data-style-name", "data"),
            fixed(Ns::Style, "percentage-data-style-name", "data"),
            fixed(Ns::Style, "list-style-name", "list"),
            style(Ns::Style, "apply-style-name", Family::Owner),
            fixed(Ns::Style, "leader-text-style", "text"),
            style(Ns::Text, "style-name", Family::TextElement),
            fixed(Ns::Text, "cond-style-name", "paragraph"),
            fixed(Ns::Text, "visited-style-name", "text"),
            fixed(Ns::Text, "citation-style-name", "text"),
            fixed(Ns::Text, "citation-body-style-name", "paragraph"),
            fixed(Ns::Text, "main-entry-style-name", "text"),
            fixed(Ns::Text, "default-style-name", "paragraph"),
            style(Ns::Draw, "style-name", Family::Any),
            fixed(Ns::Draw, "text-style-name", "text"),
            style(Ns::Table, "style-name", Family::TableElement),
            fixed(Ns::Table, "default-cell-style-name", "table-cell"),
            plain(Ns::Style, "master-page-name", RefKind::MasterPage),
            plain(Ns::Style, "font-name", RefKind::Font),
            plain(Ns::Style, "font-name-asian", RefKind::Font),
            plain(Ns::Style, "font-name-complex", RefKind::Font),
            RefRule {
                tag: None,
                attribute: schema.page_layout_name_attr(),
                kind: RefKind::PageLayout,
                family: Family::Fixed(""),
            },
            drawing("fill-gradient-name", "gradient"),
            drawing("fill-hatch-name", "hatch"),
            drawing("fill-image-name", "fill-image"),
            drawing("marker-start", "marker"),
            drawing("marker-end", "marker"),
            drawing("stroke-dash", "stroke-dash"),
            drawing("opacity-name", "opacity"),
            drawing("transparency-name", "transparency"),
        ];

        let mut by_attribute: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            by_attribute.entry(rule.attribute.clone()).or_default().push(index);
        }

        Self {
            rules,
            by_attribute,
            parent: schema.tag(Ns::Style, "parent-style-name"),
        }
    }

    /// Rule for `attribute` on an element tagged `tag`.
    pub fn rule_for(&self, tag: &str, attribute: &str) -> Option<&RefRule> {
        self.by_attribute.get(attribute)?.iter().find_map(|&index| {
            let rule = &self.rules[index];
            match &rule.tag {
                Some(t) if t != tag => None,
                _ => Some(rule),
            }
        })
    }

    /// Kind referenced by `attribute` on an element tagged `tag`.
    pub fn kind_of(&self, tag: &str, attribute: &str) -> Option<RefKind> {
        self.rule_for(tag, attribute).map(|rule| rule.kind)
    }

    /// The parent-style attribute, whose target must already be defined.
    pub fn parent_attribute(&self) -> &str {
        &self.parent
    }

    /// Rename transform applying the mappings of one document to every
    /// referencing attribute of `part`.
    pub fn rename_access(&self, part: Part, names: &DocNames) -> AttributeAccess {
        let names = Rc::new(names.clone());
        let accessors: Vec<Box<dyn Accessor>> = self
            .rules
            .iter()
            .map(|rule| {
                Box::new(ReferenceRename {
                    rule: rule.clone(),
                    part,
                    names: names.clone(),
                }) as Box<dyn Accessor>
            })
            .collect();
        AttributeAccess::new("concatenate-rename", part, 80, accessors)
    }
}

/// Rewrites one referencing attribute through a document's name mappings.
struct ReferenceRename {
    rule: RefRule,
    part: Part,
    names: Rc<DocNames>,
}

impl Accessor for ReferenceRename {
    fn target(&self) -> Option<&str> {
        self.rule.tag.as_deref()
    }

    fn attribute(&self) -> &str {
        &self.rule.attribute
    }

    fn use_value(&mut self, old: Option<&str>, ctx: &mut Context) -> Result<Option<String>> {
        self.use_value_on("", old, ctx)
    }

    fn use_value_on(&mut self, tag: &str, old: Option<&str>, _ctx: &mut Context) -> Result<Option<String>> {
        let Some(name) = old else {
            return Ok(None);
        };
        let family = self.rule.family_for(tag, None);
        Ok(self
            .names
            .lookup(self.part, self.rule.kind, family, name)
            .map(str::to_string))
    }
}
