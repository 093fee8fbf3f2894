/*
 * transforms/text.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Plain-text and tree dumps of document parts.
 */

use crate::schema::{Ns, SchemaConfig};
use odmerge_xml::{Element, local_name, namespace_uri};
use std::fmt::Write;

/// Text of every paragraph and heading, one per line, in document order.
pub fn as_text(root: &Element, schema: &SchemaConfig) -> String {
    let blocks = [schema.tag(Ns::Text, "p"), schema.tag(Ns::Text, "h")];
    let mut out = String::new();
    collect_blocks(root, &blocks, &mut out);
    out
}

fn collect_blocks(element: &Element, blocks: &[String], out: &mut String) {
    if blocks.contains(&element.tag) {
        out.push_str(&element.text_content());
        out.push('\n');
        return;
    }
    for child in &element.children {
        collect_blocks(child, blocks, out);
    }
}

/// Indented `prefix:tag attr="value"` outline of a tree, four spaces per level.
pub fn pretty(root: &Element, schema: &SchemaConfig) -> String {
    let mut out = String::new();
    write_pretty(root, schema, 0, &mut out);
    out
}

fn write_pretty(element: &Element, schema: &SchemaConfig, depth: usize, out: &mut String) {
    out.push_str(&"    ".repeat(depth));
    out.push_str(&short_name(&element.tag, schema));
    for attr in &element.attributes {
        let _ = write!(out, " {}=\"{}\"", short_name(&attr.name, schema), attr.value);
    }
    out.push('\n');
    for child in &element.children {
        write_pretty(child, schema, depth + 1, out);
    }
}

fn short_name(name: &str, schema: &SchemaConfig) -> String {
    let Some(uri) = namespace_uri(name) else {
        return name.to_string();
    };
    match schema.namespace_table().iter().find(|(_, u)| *u == uri) {
        Some((prefix, _)) => format!("{}:{}", prefix, local_name(name)),
        None => name.to_string(),
    }
}
