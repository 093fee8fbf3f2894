/*
 * transforms/field_replace.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Variable field substitution.
 */

use crate::context::Context;
use crate::document::Part;
use crate::schema::{Ns, SchemaConfig};
use crate::transform::Transform;
use crate::Result;
use odmerge_xml::Element;
use std::collections::HashMap;

/// Supplies replacement values for named variable fields.
pub trait FieldSource {
    /// Value for the field `name`, or `None` to leave it untouched.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// A fixed name to value table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMap(pub HashMap<String, String>);

impl StaticMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl FieldSource for StaticMap {
    fn lookup(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Looks values up through a function.
pub struct CallbackLookup<F>(pub F);

impl<F> FieldSource for CallbackLookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, name: &str) -> Option<String> {
        (self.0)(name)
    }
}

/// Replace the content of every `text:variable-set`, `text:variable-get` and
/// `text:variable-input` below `root` whose name the source knows.
///
/// Returns the number of fields replaced.
pub fn replace_fields(root: &mut Element, source: &dyn FieldSource, schema: &SchemaConfig) -> usize {
    let kinds = [
        schema.tag(Ns::Text, "variable-set"),
        schema.tag(Ns::Text, "variable-get"),
        schema.tag(Ns::Text, "variable-input"),
    ];
    let name_attr = schema.tag(Ns::Text, "name");
    let mut replaced = 0;

    root.visit_mut(&mut |element: &mut Element| {
        if kinds.contains(&element.tag) {
            if let Some(value) = element.get(&name_attr).and_then(|name| source.lookup(name)) {
                element.set_text(value);
                replaced += 1;
            }
        }
    });
    replaced
}

/// Standalone field substitution over the content body.
pub struct FieldReplace {
    source: Box<dyn FieldSource>,
    priority: i32,
}

impl FieldReplace {
    pub fn new(source: Box<dyn FieldSource>) -> Self {
        Self {
            source,
            priority: 100,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Transform for FieldReplace {
    fn name(&self) -> &str {
        "field-replace"
    }

    fn part(&self) -> Part {
        Part::Content
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
        let schema = ctx.schema();
        let body = schema.body_mut(root)?;
        let replaced = replace_fields(body, self.source.as_ref(), schema);
        tracing::debug!(replaced, "Replaced fields");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Generation;
    use odmerge_xml::parse;

    const CONTENT: &str = r#"<office:document-content xmlns:office="http://openoffice.org/2000/office" xmlns:text="http://openoffice.org/2000/text"><office:body>
<text:p>Dear <text:variable-set text:name="salutation">Mr</text:variable-set> <text:variable-get text:name="lastname"><text:span>Doe</text:span></text:variable-get>,</text:p>
<text:p><text:variable-set text:name="city">Wien</text:variable-set></text:p>
</office:body></office:document-content>"#;

    fn values(root: &Element) -> Vec<String> {
        root.iter()
            .filter(|e| e.get("{http://openoffice.org/2000/text}name").is_some())
            .map(Element::text_content)
            .collect()
    }

    #[test]
    fn test_static_map_replacement() {
        let schema = SchemaConfig::new(Generation::OpenOffice1);
        let mut root = parse(CONTENT).unwrap();
        let source: StaticMap = [("salutation", "Frau"), ("lastname", "Musterfrau")]
            .into_iter()
            .collect();
        let replaced = replace_fields(&mut root, &source, &schema);
        assert_eq!(replaced, 2);
        assert_eq!(values(&root), vec!["Frau", "Musterfrau", "Wien"]);
    }

    #[test]
    fn test_callback_replacement_through_transform() {
        let schema = SchemaConfig::new(Generation::OpenOffice1);
        let mut ctx = Context::new(schema);
        let mut root = parse(CONTENT).unwrap();
        let lookup = CallbackLookup(|name: &str| (name == "city").then(|| "Niemandsdorf".to_string()));
        FieldReplace::new(Box::new(lookup))
            .apply(&mut root, &mut ctx)
            .unwrap();
        assert_eq!(values(&root), vec!["Mr", "Doe", "Niemandsdorf"]);
    }
}
