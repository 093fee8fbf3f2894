/*
 * transforms/body.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Ordered partition of a document body.
 */

use crate::schema::SchemaConfig;
use odmerge_xml::Element;

/// The three sections of a body, in the order the format requires:
/// declarations, then page-anchored shapes, then the text flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyParts {
    pub declarations: Vec<Element>,
    pub shapes: Vec<Element>,
    pub flow: Vec<Element>,
}

impl BodyParts {
    /// Move the children of `body` into their sections.
    ///
    /// The section only ever advances: once a child does not belong to the
    /// current section, later children are never put back into it.
    pub fn divide(body: &mut Element, schema: &SchemaConfig) -> Self {
        let declarations = schema.declaration_tags();
        let shapes = schema.shape_tags();
        let mut parts = Self::default();
        let mut section = 0;

        for child in std::mem::take(&mut body.children) {
            if section == 0 && !declarations.contains(&child.tag) {
                section = 1;
            }
            if section == 1 && !shapes.contains(&child.tag) {
                section = 2;
            }
            match section {
                0 => parts.declarations.push(child),
                1 => parts.shapes.push(child),
                _ => parts.flow.push(child),
            }
        }
        parts
    }

    /// Put the sections back into `body`, replacing its children.
    pub fn reassemble(self, body: &mut Element) {
        let mut children = self.declarations;
        children.extend(self.shapes);
        children.extend(self.flow);
        body.children = children;
    }

    /// The replicated sections (shapes and flow).
    pub fn content_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.shapes.iter_mut().chain(self.flow.iter_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.shapes.is_empty() && self.flow.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Generation, Ns};
    use odmerge_xml::parse;

    fn tags(elements: &[Element]) -> Vec<&str> {
        elements.iter().map(|e| odmerge_xml::local_name(&e.tag)).collect()
    }

    #[test]
    fn test_divide_and_reassemble() {
        let schema = SchemaConfig::new(Generation::OpenOffice1);
        let mut body = parse(
            r#"<office:body xmlns:office="http://openoffice.org/2000/office" xmlns:text="http://openoffice.org/2000/text" xmlns:draw="http://openoffice.org/2000/drawing"><text:variable-decls/><text:sequence-decls/><draw:text-box/><draw:rect/><text:p/><draw:rect/><text:h/></office:body>"#,
        )
        .unwrap();
        let original = body.clone();

        let parts = BodyParts::divide(&mut body, &schema);
        assert!(body.children.is_empty());
        assert_eq!(tags(&parts.declarations), vec!["variable-decls", "sequence-decls"]);
        assert_eq!(tags(&parts.shapes), vec!["text-box", "rect"]);
        assert_eq!(tags(&parts.flow), vec!["p", "rect", "h"]);

        parts.reassemble(&mut body);
        assert_eq!(body, original);
    }

    #[test]
    fn test_tracked_changes_stay_in_prelude() {
        let schema = SchemaConfig::new(Generation::OpenDocument);
        let mut body = parse(
            r#"<office:text xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0"><text:tracked-changes/><text:variable-decls><text:variable-decl text:name="a"/></text:variable-decls><text:sequence-decls/><table:calculation-settings/><text:p/></office:text>"#,
        )
        .unwrap();
        let parts = BodyParts::divide(&mut body, &schema);
        assert_eq!(
            tags(&parts.declarations),
            vec!["tracked-changes", "variable-decls", "sequence-decls", "calculation-settings"]
        );
        assert_eq!(tags(&parts.flow), vec!["p"]);
    }

    #[test]
    fn test_flow_first_body_has_no_shapes() {
        let schema = SchemaConfig::new(Generation::OpenOffice1);
        let mut body = Element::new(schema.tag(Ns::Office, "body"))
            .with_child(Element::new(schema.tag(Ns::Text, "p")))
            .with_child(Element::new(schema.tag(Ns::Draw, "rect")));
        let parts = BodyParts::divide(&mut body, &schema);
        assert!(parts.declarations.is_empty());
        assert!(parts.shapes.is_empty());
        assert_eq!(parts.flow.len(), 2);
    }
}
