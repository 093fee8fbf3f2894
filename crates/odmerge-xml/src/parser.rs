//! XML parser that builds namespace-resolved [`Element`] trees.

use crate::{Attribute, Element, Error, Result, XML_NAMESPACE, qualified};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};

/// Parse XML from a string, producing the root [`Element`].
///
/// Element and attribute names are resolved against the `xmlns` declarations
/// in scope and stored as `{uri}local`. Comments, processing instructions and
/// the XML declaration are dropped; all character data (whitespace included)
/// is kept.
///
/// # Example
///
/// ```rust
/// use odmerge_xml::parse;
///
/// let root = parse(r#"<o:doc xmlns:o="urn:o"/>"#).unwrap();
/// assert_eq!(root.tag, "{urn:o}doc");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed or uses an undeclared prefix.
pub fn parse(content: &str) -> Result<Element> {
    let mut parser = XmlParser::new(content);
    parser.parse()
}

/// Parse XML from raw part bytes, which must be UTF-8.
pub fn parse_bytes(bytes: &[u8]) -> Result<Element> {
    parse(std::str::from_utf8(bytes)?)
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Stack of elements being built.
    stack: Vec<BuildNode>,

    /// Namespace declarations in scope, one frame per open element.
    scopes: Vec<Vec<(String, String)>>,
}

/// A node being constructed during parsing.
struct BuildNode {
    /// Name exactly as written in the start tag, for end-tag matching.
    raw_name: String,

    element: Element,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            stack: Vec::new(),
            scopes: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<Element> {
        let mut root: Option<Element> = None;

        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let node = self.open_element(&e)?;
                    self.stack.push(node);
                }
                Ok(Event::End(e)) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let node = self.stack.pop().ok_or_else(|| Error::XmlSyntax {
                        message: format!("Unexpected closing tag </{}>", end_name),
                        position: Some(self.reader.buffer_position()),
                    })?;
                    self.scopes.pop();

                    if node.raw_name != end_name {
                        return Err(Error::MismatchedEndTag {
                            expected: node.raw_name,
                            found: end_name,
                        });
                    }
                    self.attach(node.element, &mut root)?;
                }
                Ok(Event::Empty(e)) => {
                    let node = self.open_element(&e)?;
                    self.scopes.pop();
                    self.attach(node.element, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(&e)?;
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).to_string();
                    self.push_text(text);
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: node.raw_name.clone(),
            });
        }

        root.ok_or(Error::EmptyDocument)
    }

    /// Build the element for a start (or empty) tag and push its namespace scope.
    fn open_element(&mut self, e: &BytesStart<'_>) -> Result<BuildNode> {
        let raw_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|err| Error::XmlSyntax {
                    message: format!("Invalid attribute value: {}", err),
                    position: Some(self.reader.buffer_position()),
                })?
                .into_owned();

            if key == "xmlns" {
                declarations.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((prefix.to_string(), value));
            } else {
                raw_attributes.push((key, value));
            }
        }
        self.scopes.push(declarations.clone());

        let tag = self.resolve(&raw_name, &raw_name, true)?;
        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (key, value) in raw_attributes {
            attributes.push(Attribute {
                name: self.resolve(&key, &raw_name, false)?,
                value,
            });
        }

        Ok(BuildNode {
            raw_name,
            element: Element {
                tag,
                attributes,
                namespaces: declarations,
                ..Element::default()
            },
        })
    }

    /// Resolve a raw `prefix:local` name to `{uri}local`.
    ///
    /// Unprefixed attributes stay unqualified; unprefixed elements pick up the
    /// default namespace when one is declared.
    fn resolve(&self, raw: &str, element: &str, is_element: bool) -> Result<String> {
        let (prefix, local) = match raw.find(':') {
            Some(pos) => (&raw[..pos], &raw[pos + 1..]),
            None if is_element => ("", raw),
            None => return Ok(raw.to_string()),
        };

        match self.lookup(prefix) {
            Some(uri) => Ok(qualified(uri, local)),
            None if prefix.is_empty() => Ok(local.to_string()),
            None => Err(Error::UnboundPrefix {
                prefix: prefix.to_string(),
                element: element.to_string(),
            }),
        }
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    fn attach(&mut self, element: Element, root: &mut Option<Element>) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => parent.element.children.push(element),
            None => {
                if root.is_some() {
                    return Err(Error::MultipleRoots);
                }
                *root = Some(element);
            }
        }
        Ok(())
    }

    fn handle_text(&mut self, e: &BytesText<'_>) -> Result<()> {
        let text = e.unescape().map_err(|err| Error::XmlSyntax {
            message: format!("Invalid text content: {}", err),
            position: Some(self.reader.buffer_position()),
        })?;
        self.push_text(text.into_owned());
        Ok(())
    }

    /// Attach character data as text of the open element or tail of its last child.
    fn push_text(&mut self, text: String) {
        let Some(node) = self.stack.last_mut() else {
            // Whitespace around the root element.
            return;
        };
        let slot = match node.element.children.last_mut() {
            Some(child) => &mut child.tail,
            None => &mut node.element.text,
        };
        match slot {
            Some(existing) => existing.push_str(&text),
            None => *slot = Some(text),
        }
    }
}
