/*
 * transforms/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in part transforms.
 */

//! Built-in transforms.
//!
//! - [`Editinfo`] and [`Autoupdate`] touch meta.xml and settings.xml
//! - [`FieldReplace`] substitutes variable fields in the body
//! - [`AddPagebreakStyle`] and [`AddPagebreak`] append forced page breaks
//! - [`BodyParts`] splits a body into its ordered sections
//! - [`text`] renders a content tree as plain text or an indented dump

pub mod body;
pub mod field_replace;
pub mod meta;
pub mod pagebreak;
pub mod settings;
pub mod text;

pub use body::BodyParts;
pub use field_replace::{CallbackLookup, FieldReplace, FieldSource, StaticMap, replace_fields};
pub use meta::{DEFAULT_GENERATOR, Editinfo};
pub use pagebreak::{
    AddPagebreak, AddPagebreakStyle, PagebreakStyle, ensure_pagebreak_style, pagebreak_paragraph,
    pagebreak_style_key,
};
pub use settings::Autoupdate;
