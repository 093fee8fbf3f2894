//! Namespace-resolving XML element trees for office document parts.
//!
//! This crate wraps [`quick-xml`] to provide a mutable tree of [`Element`]s in
//! the style of ElementTree: every element carries a fully qualified tag
//! (`{namespace-uri}local-name`), its attributes, its children, the text
//! directly inside it and the text following it (its *tail*).
//!
//! # Overview
//!
//! The main types are:
//! - [`Element`]: a tagged node with attributes, children, text and tail
//! - [`Attribute`]: a qualified attribute name with its value
//! - [`CanonicalForm`]: a name-erased structural key used for deduplication
//!
//! # Example
//!
//! ```rust
//! use odmerge_xml::{parse, qualified};
//!
//! let root = parse(r#"<t:doc xmlns:t="urn:t"><t:p t:name="a">hi</t:p></t:doc>"#).unwrap();
//!
//! let p = root.find(&qualified("urn:t", "p")).unwrap();
//! assert_eq!(p.get(&qualified("urn:t", "name")), Some("a"));
//! assert_eq!(p.text.as_deref(), Some("hi"));
//! ```
//!
//! Serialization writes the namespace declarations recorded while parsing and
//! declares any namespace that is used but unknown from a caller-supplied
//! prefix table:
//!
//! ```rust
//! use odmerge_xml::{parse, to_string};
//!
//! let root = parse(r#"<a:root xmlns:a="urn:a"/>"#).unwrap();
//! let xml = to_string(&root, &[]).unwrap();
//! assert!(xml.ends_with(r#"<a:root xmlns:a="urn:a"/>"#));
//! ```

pub mod canonical;
pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

pub use canonical::CanonicalForm;
pub use error::{Error, Result};
pub use parser::{parse, parse_bytes};
pub use types::{Attribute, Element, XML_NAMESPACE, local_name, namespace_uri, qualified};
pub use writer::{to_bytes, to_string};
