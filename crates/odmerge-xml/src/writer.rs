//! Serialization of [`Element`] trees back to XML text.

use crate::{Element, Result, XML_NAMESPACE, local_name, namespace_uri};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Serialize a tree to a UTF-8 string with an XML declaration.
///
/// `known` is a `(prefix, uri)` table used for namespaces that the tree uses
/// but never declares (elements created programmatically, for example). URIs
/// missing from both the tree and the table get generated `ns<n>` prefixes.
pub fn to_string(root: &Element, known: &[(&str, &str)]) -> Result<String> {
    let bytes = to_bytes(root, known)?;
    // The writer only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Serialize a tree to UTF-8 bytes with an XML declaration.
pub fn to_bytes(root: &Element, known: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut out = XmlWriter {
        writer: Writer::new(Vec::new()),
        known,
        scopes: Vec::new(),
        generated: 0,
    };
    out.writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.writer.write_event(Event::Text(BytesText::new("\n")))?;
    out.write_element(root)?;
    Ok(out.writer.into_inner())
}

struct XmlWriter<'k> {
    writer: Writer<Vec<u8>>,
    known: &'k [(&'k str, &'k str)],
    scopes: Vec<Vec<(String, String)>>,
    generated: usize,
}

impl XmlWriter<'_> {
    fn write_element(&mut self, element: &Element) -> Result<()> {
        self.scopes.push(element.namespaces.clone());

        let name = self.prefixed(&element.tag, true);
        let attributes: Vec<(String, &str)> = element
            .attributes
            .iter()
            .map(|a| (self.prefixed(&a.name, false), a.value.as_str()))
            .collect();

        let mut start = BytesStart::new(name.clone());
        if let Some(frame) = self.scopes.last() {
            for (prefix, uri) in frame {
                if prefix.is_empty() {
                    start.push_attribute(("xmlns", uri.as_str()));
                } else {
                    start.push_attribute((format!("xmlns:{}", prefix).as_str(), uri.as_str()));
                }
            }
        }
        for (key, value) in &attributes {
            start.push_attribute((key.as_str(), *value));
        }

        if element.children.is_empty() && element.text.is_none() {
            self.writer.write_event(Event::Empty(start))?;
        } else {
            self.writer.write_event(Event::Start(start))?;
            if let Some(text) = &element.text {
                self.writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            for child in &element.children {
                self.write_element(child)?;
                if let Some(tail) = &child.tail {
                    self.writer.write_event(Event::Text(BytesText::new(tail)))?;
                }
            }
            self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        }

        self.scopes.pop();
        Ok(())
    }

    /// Turn `{uri}local` into `prefix:local`, declaring the prefix on the
    /// current element when it is not yet in scope.
    fn prefixed(&mut self, name: &str, is_element: bool) -> String {
        let Some(uri) = namespace_uri(name) else {
            return name.to_string();
        };
        let local = local_name(name);
        if uri == XML_NAMESPACE {
            return format!("xml:{}", local);
        }

        let prefix = match self.prefix_in_scope(uri, is_element) {
            Some(prefix) => prefix,
            None => self.declare(uri),
        };
        if prefix.is_empty() {
            local.to_string()
        } else {
            format!("{}:{}", prefix, local)
        }
    }

    fn bound(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn prefix_in_scope(&self, uri: &str, is_element: bool) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .filter(|(p, u)| u == uri && (is_element || !p.is_empty()))
            .map(|(p, _)| p)
            .find(|p| self.bound(p) == Some(uri))
            .cloned()
    }

    fn declare(&mut self, uri: &str) -> String {
        let preferred = self
            .known
            .iter()
            .find(|(_, u)| *u == uri)
            .map(|(p, _)| p.to_string())
            .filter(|p| !p.is_empty() && self.bound(p).is_none());

        let prefix = match preferred {
            Some(prefix) => prefix,
            None => loop {
                let candidate = format!("ns{}", self.generated);
                self.generated += 1;
                if self.bound(&candidate).is_none() {
                    break candidate;
                }
            },
        };

        if let Some(frame) = self.scopes.last_mut() {
            frame.push((prefix.clone(), uri.to_string()));
        }
        prefix
    }
}
