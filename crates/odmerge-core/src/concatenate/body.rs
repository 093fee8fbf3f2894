/*
 * concatenate/body.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Body-level helpers for concatenation.
 */

use super::styles::{ensure_container, root_order};
use crate::schema::{Ns, SchemaConfig};
use crate::Result;
use odmerge_xml::{Element, local_name};

/// Identity of a declaration: its `name` attribute, or the `id` of a
/// tracked-change region.
fn declared_name(element: &Element) -> Option<&str> {
    let by_local = |local: &str| {
        element
            .attributes
            .iter()
            .find(|a| local_name(&a.name) == local)
            .map(|a| a.value.as_str())
    };
    by_local("name").or_else(|| by_local("id"))
}

/// Merge declaration containers into `output`.
///
/// Containers with the same tag are combined; within a container the first
/// declaration of a name wins. New containers are inserted in the order the
/// format prescribes.
pub(crate) fn append_declarations(output: &mut Vec<Element>, incoming: Vec<Element>, schema: &SchemaConfig) {
    let order = schema.declaration_tags();
    let rank = |tag: &str| order.iter().position(|t| t == tag).unwrap_or(order.len());

    for container in incoming {
        match output.iter_mut().find(|c| c.tag == container.tag) {
            Some(existing) => {
                for declaration in container.children {
                    let duplicate = declared_name(&declaration).is_some_and(|name| {
                        existing
                            .children
                            .iter()
                            .any(|d| declared_name(d) == Some(name))
                    });
                    if duplicate {
                        tracing::trace!(tag = %declaration.tag, "Skipping repeated declaration");
                    } else {
                        existing.children.push(declaration);
                    }
                }
            }
            None => {
                let own = rank(&container.tag);
                let at = output
                    .iter()
                    .position(|c| rank(&c.tag) > own)
                    .unwrap_or(output.len());
                output.insert(at, container);
            }
        }
    }
}

/// Give the first paragraph of a document its own copy of its style bound
/// to the document's first master page, so the document keeps its page
/// layout after being appended.
///
/// Returns the name of the new style, or `None` when the document has no
/// usable first paragraph, style or master page, or the style already
/// selects a master page.
pub(crate) fn set_pagestyle(
    schema: &SchemaConfig,
    content: &mut Element,
    styles: &Element,
) -> Result<Option<String>> {
    let p_tag = schema.tag(Ns::Text, "p");
    let h_tag = schema.tag(Ns::Text, "h");
    let style_attr = schema.tag(Ns::Text, "style-name");
    let name_attr = schema.tag(Ns::Style, "name");
    let master_attr = schema.tag(Ns::Style, "master-page-name");
    let style_tag = schema.tag(Ns::Style, "style");
    let auto_tag = schema.tag(Ns::Office, "automatic-styles");

    let body = schema.body(content)?;
    let Some(first) = body.children.iter().find(|c| c.tag == p_tag || c.tag == h_tag) else {
        tracing::warn!("Appended document has no leading paragraph, page style not isolated");
        return Ok(None);
    };
    let style = first.get(&style_attr).unwrap_or("Standard").to_string();

    let find = |container: Option<&Element>| {
        container?
            .children
            .iter()
            .find(|s| s.tag == style_tag && s.get(&name_attr) == Some(style.as_str()))
            .cloned()
    };
    let Some(mut definition) = find(content.find(&auto_tag))
        .or_else(|| find(styles.find(&schema.tag(Ns::Office, "styles"))))
    else {
        tracing::warn!(style = %style, "Style of first paragraph not found, page style not isolated");
        return Ok(None);
    };
    if definition.get(&master_attr).is_some_and(|m| !m.is_empty()) {
        return Ok(None);
    }

    let master_page_tag = schema.tag(Ns::Style, "master-page");
    let master = styles
        .find(&schema.tag(Ns::Office, "master-styles"))
        .and_then(|m| m.children_with_tag(&master_page_tag).next())
        .and_then(|m| m.get(&name_attr))
        .map(str::to_string);
    let Some(master) = master else {
        tracing::warn!("Appended document has no master page, page style not isolated");
        return Ok(None);
    };

    let name = format!("{style}_Concat");
    definition.set(name_attr, name.clone());
    definition.remove(&schema.tag(Ns::Style, "display-name"));
    definition.set(master_attr, master.clone());
    ensure_container(content, &auto_tag, &root_order(schema))
        .children
        .push(definition);

    let body = schema.body_mut(content)?;
    if let Some(first) = body.children.iter_mut().find(|c| c.tag == p_tag || c.tag == h_tag) {
        first.set(style_attr, name.clone());
    }
    tracing::debug!(style = %name, master_page = %master, "Isolated page style of appended document");
    Ok(Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Generation;
    use odmerge_xml::parse;

    const NS: &str = r#"xmlns:office="http://openoffice.org/2000/office" xmlns:style="http://openoffice.org/2000/style" xmlns:text="http://openoffice.org/2000/text""#;

    fn schema() -> SchemaConfig {
        SchemaConfig::new(Generation::OpenOffice1)
    }

    #[test]
    fn test_declarations_first_name_wins() {
        let schema = schema();
        let decls = |names: &[&str]| {
            let xml: String = names
                .iter()
                .map(|n| format!(r#"<text:variable-decl text:name="{n}"/>"#))
                .collect();
            parse(&format!(r#"<text:variable-decls {NS}>{xml}</text:variable-decls>"#)).unwrap()
        };
        let sequence = parse(&format!(r#"<text:sequence-decls {NS}/>"#)).unwrap();

        let mut output = vec![decls(&["a", "b"])];
        append_declarations(&mut output, vec![sequence, decls(&["b", "c"])], &schema);

        let tags: Vec<_> = output.iter().map(|c| local_name(&c.tag)).collect();
        assert_eq!(tags, vec!["variable-decls", "sequence-decls"]);
        let names: Vec<_> = output[0].children.iter().filter_map(declared_name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tracked_change_regions_deduplicated_by_id() {
        let schema = schema();
        let changes = |ids: &[&str]| {
            let xml: String = ids
                .iter()
                .map(|id| format!(r#"<text:changed-region text:id="{id}"/>"#))
                .collect();
            parse(&format!(r#"<text:tracked-changes {NS}>{xml}</text:tracked-changes>"#)).unwrap()
        };
        let decls = parse(&format!(r#"<text:variable-decls {NS}/>"#)).unwrap();

        let mut output = vec![decls];
        append_declarations(&mut output, vec![changes(&["ct1", "ct2"])], &schema);
        append_declarations(&mut output, vec![changes(&["ct2", "ct3"])], &schema);

        let tags: Vec<_> = output.iter().map(|c| local_name(&c.tag)).collect();
        assert_eq!(tags, vec!["tracked-changes", "variable-decls"]);
        let ids: Vec<_> = output[0].children.iter().filter_map(declared_name).collect();
        assert_eq!(ids, vec!["ct1", "ct2", "ct3"]);
    }

    #[test]
    fn test_set_pagestyle_clones_first_style() {
        let schema = schema();
        let mut content = parse(&format!(
            r#"<office:document-content {NS}><office:automatic-styles><style:style style:name="P15" style:family="paragraph" style:parent-style-name="Standard"/></office:automatic-styles><office:body><text:p text:style-name="P15">x</text:p></office:body></office:document-content>"#
        ))
        .unwrap();
        let styles = parse(&format!(
            r#"<office:document-styles {NS}><office:master-styles><style:master-page style:name="Standard"/></office:master-styles></office:document-styles>"#
        ))
        .unwrap();

        let name = set_pagestyle(&schema, &mut content, &styles).unwrap();
        assert_eq!(name.as_deref(), Some("P15_Concat"));

        let auto = content.find(&schema.tag(Ns::Office, "automatic-styles")).unwrap();
        let clone = &auto.children[1];
        assert_eq!(clone.get(&schema.tag(Ns::Style, "master-page-name")), Some("Standard"));
        assert_eq!(clone.get(&schema.tag(Ns::Style, "parent-style-name")), Some("Standard"));
        let p = content.find_descendant(&schema.tag(Ns::Text, "p")).unwrap();
        assert_eq!(p.get(&schema.tag(Ns::Text, "style-name")), Some("P15_Concat"));
    }

    #[test]
    fn test_set_pagestyle_without_master_page_is_skipped() {
        let schema = schema();
        let mut content = parse(&format!(
            r#"<office:document-content {NS}><office:body><text:p>x</text:p></office:body></office:document-content>"#
        ))
        .unwrap();
        let styles = parse(&format!(
            r#"<office:document-styles {NS}><office:styles><style:style style:name="Standard" style:family="paragraph"/></office:styles></office:document-styles>"#
        ))
        .unwrap();
        let before = content.clone();
        assert_eq!(set_pagestyle(&schema, &mut content, &styles).unwrap(), None);
        assert_eq!(content, before);
    }
}
