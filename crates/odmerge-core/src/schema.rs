/*
 * schema.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Namespace tables and well-known tags for both document generations.
 */

//! Schema configuration.
//!
//! Two generations of the text document format are supported: the
//! OpenOffice.org 1.x format (`application/vnd.sun.xml.writer`) and
//! OpenDocument (`application/vnd.oasis.opendocument.text`). They share
//! prefixes and local names but differ in namespace URIs and in a handful of
//! structural details (the body container, property elements, page layouts).
//! A [`SchemaConfig`] captures one generation and is passed explicitly to
//! everything that builds or looks up tags.

use crate::{EngineError, Result};
use odmerge_xml::{Element, qualified};

/// Mimetype of OpenOffice.org 1.x text documents.
pub const OOO1_MIMETYPE: &str = "application/vnd.sun.xml.writer";

/// Mimetype of OpenDocument text documents.
pub const OPENDOCUMENT_MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

/// Document format generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    OpenOffice1,
    OpenDocument,
}

impl Generation {
    pub fn from_mimetype(mimetype: &str) -> Result<Self> {
        match mimetype.trim() {
            OOO1_MIMETYPE => Ok(Self::OpenOffice1),
            OPENDOCUMENT_MIMETYPE => Ok(Self::OpenDocument),
            other => Err(EngineError::UnsupportedMimetype(other.to_string())),
        }
    }

    pub fn mimetype(self) -> &'static str {
        match self {
            Self::OpenOffice1 => OOO1_MIMETYPE,
            Self::OpenDocument => OPENDOCUMENT_MIMETYPE,
        }
    }
}

/// Namespaces known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ns {
    Chart,
    Config,
    Dc,
    Dr3d,
    Draw,
    Fo,
    Form,
    Math,
    Meta,
    Number,
    Office,
    Script,
    Style,
    Svg,
    Table,
    Text,
    Xlink,
    Manifest,
    Ooo,
    Ooow,
    Oooc,
    Dom,
    Xforms,
    Xsd,
    Xsi,
}

impl Ns {
    /// Namespaces present in both generations.
    pub const COMMON: [Ns; 18] = [
        Ns::Chart,
        Ns::Config,
        Ns::Dc,
        Ns::Dr3d,
        Ns::Draw,
        Ns::Fo,
        Ns::Form,
        Ns::Math,
        Ns::Meta,
        Ns::Number,
        Ns::Office,
        Ns::Script,
        Ns::Style,
        Ns::Svg,
        Ns::Table,
        Ns::Text,
        Ns::Xlink,
        Ns::Manifest,
    ];

    /// Namespaces only declared by OpenDocument files.
    pub const OPENDOCUMENT_ONLY: [Ns; 7] = [
        Ns::Ooo,
        Ns::Ooow,
        Ns::Oooc,
        Ns::Dom,
        Ns::Xforms,
        Ns::Xsd,
        Ns::Xsi,
    ];

    /// Conventional prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            Ns::Chart => "chart",
            Ns::Config => "config",
            Ns::Dc => "dc",
            Ns::Dr3d => "dr3d",
            Ns::Draw => "draw",
            Ns::Fo => "fo",
            Ns::Form => "form",
            Ns::Math => "math",
            Ns::Meta => "meta",
            Ns::Number => "number",
            Ns::Office => "office",
            Ns::Script => "script",
            Ns::Style => "style",
            Ns::Svg => "svg",
            Ns::Table => "table",
            Ns::Text => "text",
            Ns::Xlink => "xlink",
            Ns::Manifest => "manifest",
            Ns::Ooo => "ooo",
            Ns::Ooow => "ooow",
            Ns::Oooc => "oooc",
            Ns::Dom => "dom",
            Ns::Xforms => "xforms",
            Ns::Xsd => "xsd",
            Ns::Xsi => "xsi",
        }
    }

    /// Namespace URI in the given generation.
    pub fn uri(self, generation: Generation) -> &'static str {
        match generation {
            Generation::OpenOffice1 => self.ooo1_uri(),
            Generation::OpenDocument => self.opendocument_uri(),
        }
    }

    fn ooo1_uri(self) -> &'static str {
        match self {
            Ns::Chart => "http://openoffice.org/2000/chart",
            Ns::Config => "http://openoffice.org/2001/config",
            Ns::Dr3d => "http://openoffice.org/2000/dr3d",
            Ns::Draw => "http://openoffice.org/2000/drawing",
            Ns::Form => "http://openoffice.org/2000/form",
            Ns::Meta => "http://openoffice.org/2000/meta",
            Ns::Number => "http://openoffice.org/2000/datastyle",
            Ns::Office => "http://openoffice.org/2000/office",
            Ns::Script => "http://openoffice.org/2000/script",
            Ns::Style => "http://openoffice.org/2000/style",
            Ns::Svg => "http://www.w3.org/2000/svg",
            Ns::Table => "http://openoffice.org/2000/table",
            Ns::Text => "http://openoffice.org/2000/text",
            Ns::Manifest => "http://openoffice.org/2001/manifest",
            other => other.shared_uri(),
        }
    }

    fn opendocument_uri(self) -> &'static str {
        match self {
            Ns::Chart => "urn:oasis:names:tc:opendocument:xmlns:chart:1.0",
            Ns::Config => "urn:oasis:names:tc:opendocument:xmlns:config:1.0",
            Ns::Dr3d => "urn:oasis:names:tc:opendocument:xmlns:dr3d:1.0",
            Ns::Draw => "urn:oasis:names:tc:opendocument:xmlns:drawing:1.0",
            Ns::Fo => "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0",
            Ns::Form => "urn:oasis:names:tc:opendocument:xmlns:form:1.0",
            Ns::Meta => "urn:oasis:names:tc:opendocument:xmlns:meta:1.0",
            Ns::Number => "urn:oasis:names:tc:opendocument:xmlns:datastyle:1.0",
            Ns::Office => "urn:oasis:names:tc:opendocument:xmlns:office:1.0",
            Ns::Script => "urn:oasis:names:tc:opendocument:xmlns:script:1.0",
            Ns::Style => "urn:oasis:names:tc:opendocument:xmlns:style:1.0",
            Ns::Svg => "urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0",
            Ns::Table => "urn:oasis:names:tc:opendocument:xmlns:table:1.0",
            Ns::Text => "urn:oasis:names:tc:opendocument:xmlns:text:1.0",
            Ns::Manifest => "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0",
            other => other.shared_uri(),
        }
    }

    /// URIs that do not depend on the generation.
    fn shared_uri(self) -> &'static str {
        match self {
            Ns::Dc => "http://purl.org/dc/elements/1.1/",
            Ns::Fo => "http://www.w3.org/1999/XSL/Format",
            Ns::Math => "http://www.w3.org/1998/Math/MathML",
            Ns::Xlink => "http://www.w3.org/1999/xlink",
            Ns::Ooo => "http://openoffice.org/2004/office",
            Ns::Ooow => "http://openoffice.org/2004/writer",
            Ns::Oooc => "http://openoffice.org/2004/calc",
            Ns::Dom => "http://www.w3.org/2001/xml-events",
            Ns::Xforms => "http://www.w3.org/2002/xforms",
            Ns::Xsd => "http://www.w3.org/2001/XMLSchema",
            Ns::Xsi => "http://www.w3.org/2001/XMLSchema-instance",
            // Generation-specific namespaces are matched before falling back here.
            _ => "",
        }
    }
}

/// Active namespace table plus the tags derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaConfig {
    generation: Generation,
    table: Vec<(&'static str, &'static str)>,
}

impl SchemaConfig {
    pub fn new(generation: Generation) -> Self {
        let mut namespaces: Vec<Ns> = Ns::COMMON.to_vec();
        if generation == Generation::OpenDocument {
            namespaces.extend(Ns::OPENDOCUMENT_ONLY);
        }
        let table = namespaces
            .into_iter()
            .map(|ns| (ns.prefix(), ns.uri(generation)))
            .collect();
        Self { generation, table }
    }

    /// Configuration for the generation identified by a document mimetype.
    pub fn from_mimetype(mimetype: &str) -> Result<Self> {
        Generation::from_mimetype(mimetype).map(Self::new)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn mimetype(&self) -> &'static str {
        self.generation.mimetype()
    }

    /// `(prefix, uri)` pairs, used when serializing undeclared namespaces.
    pub fn namespace_table(&self) -> &[(&'static str, &'static str)] {
        &self.table
    }

    /// Qualified tag or attribute name: `{uri}local`.
    pub fn tag(&self, ns: Ns, local: &str) -> String {
        qualified(ns.uri(self.generation), local)
    }

    /// Container holding the text flow: `office:body`, or `office:text`
    /// inside it for OpenDocument.
    pub fn body_tag(&self) -> String {
        match self.generation {
            Generation::OpenOffice1 => self.tag(Ns::Office, "body"),
            Generation::OpenDocument => self.tag(Ns::Office, "text"),
        }
    }

    /// Locate the text flow container below a content root.
    ///
    /// `root` may be the document root, `office:body`, or the container itself.
    pub fn body<'a>(&self, root: &'a Element) -> Result<&'a Element> {
        let body_tag = self.body_tag();
        if root.tag == body_tag {
            return Ok(root);
        }
        let office_body = self.tag(Ns::Office, "body");
        let outer = if root.tag == office_body {
            root
        } else {
            root.find(&office_body)
                .ok_or_else(|| EngineError::schema_in("content.xml", "missing <office:body>"))?
        };
        if outer.tag == body_tag {
            return Ok(outer);
        }
        outer
            .find(&body_tag)
            .ok_or_else(|| EngineError::schema_in("content.xml", "missing <office:text>"))
    }

    /// Mutable variant of [`SchemaConfig::body`].
    pub fn body_mut<'a>(&self, root: &'a mut Element) -> Result<&'a mut Element> {
        let body_tag = self.body_tag();
        if root.tag == body_tag {
            return Ok(root);
        }
        let office_body = self.tag(Ns::Office, "body");
        let outer = if root.tag == office_body {
            root
        } else {
            root.find_mut(&office_body)
                .ok_or_else(|| EngineError::schema_in("content.xml", "missing <office:body>"))?
        };
        if outer.tag == body_tag {
            return Ok(outer);
        }
        outer
            .find_mut(&body_tag)
            .ok_or_else(|| EngineError::schema_in("content.xml", "missing <office:text>"))
    }

    /// Font declaration container.
    pub fn font_decls_tag(&self) -> String {
        match self.generation {
            Generation::OpenOffice1 => self.tag(Ns::Office, "font-decls"),
            Generation::OpenDocument => self.tag(Ns::Office, "font-face-decls"),
        }
    }

    /// Font declaration element.
    pub fn font_decl_tag(&self) -> String {
        match self.generation {
            Generation::OpenOffice1 => self.tag(Ns::Style, "font-decl"),
            Generation::OpenDocument => self.tag(Ns::Style, "font-face"),
        }
    }

    /// Property element carrying paragraph formatting.
    pub fn paragraph_properties_tag(&self) -> String {
        match self.generation {
            Generation::OpenOffice1 => self.tag(Ns::Style, "properties"),
            Generation::OpenDocument => self.tag(Ns::Style, "paragraph-properties"),
        }
    }

    /// Page layout definition element.
    pub fn page_layout_tag(&self) -> String {
        match self.generation {
            Generation::OpenOffice1 => self.tag(Ns::Style, "page-master"),
            Generation::OpenDocument => self.tag(Ns::Style, "page-layout"),
        }
    }

    /// Attribute of a master page naming its page layout.
    pub fn page_layout_name_attr(&self) -> String {
        match self.generation {
            Generation::OpenOffice1 => self.tag(Ns::Style, "page-master-name"),
            Generation::OpenDocument => self.tag(Ns::Style, "page-layout-name"),
        }
    }

    /// Body-level declaration containers, in document order. They precede
    /// everything else in the body and are merged rather than replicated.
    pub fn declaration_tags(&self) -> Vec<String> {
        vec![
            self.tag(Ns::Office, "forms"),
            self.tag(Ns::Text, "tracked-changes"),
            self.tag(Ns::Text, "variable-decls"),
            self.tag(Ns::Text, "sequence-decls"),
            self.tag(Ns::Text, "user-field-decls"),
            self.tag(Ns::Text, "dde-connection-decls"),
            self.tag(Ns::Text, "alphabetical-index-auto-mark-file"),
            self.tag(Ns::Table, "calculation-settings"),
            self.tag(Ns::Table, "content-validations"),
            self.tag(Ns::Table, "label-ranges"),
        ]
    }

    /// Drawing shapes that can be anchored to a page at body level.
    pub fn shape_tags(&self) -> Vec<String> {
        [
            "text-box",
            "frame",
            "rect",
            "line",
            "polyline",
            "polygon",
            "path",
            "circle",
            "ellipse",
            "connector",
            "caption",
            "measure",
            "custom-shape",
            "image",
            "object",
            "g",
        ]
        .iter()
        .map(|local| self.tag(Ns::Draw, local))
        .collect()
    }

    /// Tag of the frame element that owns a frame's `draw:name`.
    pub fn frame_tag(&self) -> String {
        match self.generation {
            Generation::OpenOffice1 => self.tag(Ns::Draw, "text-box"),
            Generation::OpenDocument => self.tag(Ns::Draw, "frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odmerge_xml::parse;

    #[test]
    fn test_from_mimetype() {
        let sxw = SchemaConfig::from_mimetype("application/vnd.sun.xml.writer").unwrap();
        assert_eq!(sxw.generation(), Generation::OpenOffice1);
        assert_eq!(
            sxw.tag(Ns::Text, "p"),
            "{http://openoffice.org/2000/text}p"
        );

        let odt = SchemaConfig::from_mimetype("application/vnd.oasis.opendocument.text\n").unwrap();
        assert_eq!(
            odt.tag(Ns::Text, "p"),
            "{urn:oasis:names:tc:opendocument:xmlns:text:1.0}p"
        );

        let err = SchemaConfig::from_mimetype("text/plain").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedMimetype(_)));
    }

    #[test]
    fn test_namespace_tables() {
        let sxw = SchemaConfig::new(Generation::OpenOffice1);
        let odt = SchemaConfig::new(Generation::OpenDocument);
        assert_eq!(sxw.namespace_table().len(), 18);
        assert_eq!(odt.namespace_table().len(), 25);
        assert!(odt.namespace_table().contains(&(
            "fo",
            "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0"
        )));
        assert!(sxw.namespace_table().contains(&("fo", "http://www.w3.org/1999/XSL/Format")));
        assert!(
            sxw.namespace_table()
                .iter()
                .all(|(_, uri)| !uri.is_empty())
        );
        assert!(
            odt.namespace_table()
                .iter()
                .all(|(_, uri)| !uri.is_empty())
        );
    }

    #[test]
    fn test_body_lookup_per_generation() {
        let sxw = SchemaConfig::new(Generation::OpenOffice1);
        let root = parse(
            r#"<office:document-content xmlns:office="http://openoffice.org/2000/office"><office:body/></office:document-content>"#,
        )
        .unwrap();
        assert_eq!(sxw.body(&root).unwrap().tag, sxw.tag(Ns::Office, "body"));

        let odt = SchemaConfig::new(Generation::OpenDocument);
        let root = parse(
            r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"><office:body><office:text/></office:body></office:document-content>"#,
        )
        .unwrap();
        assert_eq!(odt.body(&root).unwrap().tag, odt.tag(Ns::Office, "text"));
    }

    #[test]
    fn test_missing_body_is_schema_violation() {
        let sxw = SchemaConfig::new(Generation::OpenOffice1);
        let mut root = parse(
            r#"<office:document-content xmlns:office="http://openoffice.org/2000/office"/>"#,
        )
        .unwrap();
        let err = sxw.body_mut(&mut root).unwrap_err();
        assert!(matches!(err, EngineError::SchemaViolation { .. }));
    }
}
