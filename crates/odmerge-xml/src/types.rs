//! Core types for namespace-resolved element trees.

/// The namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Build a qualified name (`{uri}local`) from a namespace URI and a local name.
pub fn qualified(uri: &str, local: &str) -> String {
    format!("{{{}}}{}", uri, local)
}

/// Namespace URI of a qualified name, if it has one.
pub fn namespace_uri(name: &str) -> Option<&str> {
    let rest = name.strip_prefix('{')?;
    rest.find('}').map(|end| &rest[..end])
}

/// Local part of a qualified name (the whole name when unqualified).
pub fn local_name(name: &str) -> &str {
    match name.find('}') {
        Some(end) if name.starts_with('{') => &name[end + 1..],
        _ => name,
    }
}

/// An attribute with its qualified name and unescaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name (`{uri}local`, or a bare local name for unprefixed attributes).
    pub name: String,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

/// An XML element.
///
/// Text is stored the ElementTree way: `text` is the character data before the
/// first child, and each child's `tail` is the character data that follows it
/// inside this element. Namespace declarations found while parsing are kept
/// on the element that carried them so that serialization can reproduce the
/// original prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Qualified tag (`{uri}local`).
    pub tag: String,

    /// Attributes in document order.
    pub attributes: Vec<Attribute>,

    /// Child elements in document order.
    pub children: Vec<Element>,

    /// Text before the first child.
    pub text: Option<String>,

    /// Text after this element's end tag, up to the next sibling.
    pub tail: Option<String>,

    /// `(prefix, uri)` declarations made on this element.
    pub namespaces: Vec<(String, String)>,
}

impl Element {
    /// Create a new empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Get an attribute value by qualified name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing the value in place if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Remove an attribute, returning its old value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    /// First direct child with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// First direct child with the given tag, mutably.
    pub fn find_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.tag == tag)
    }

    /// Index of the first direct child with the given tag.
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.children.iter().position(|c| c.tag == tag)
    }

    /// All direct children with the given tag. The children borrow from
    /// `self` only, so `tag` may be a temporary.
    pub fn children_with_tag<'a>(&'a self, tag: &str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Iterate over this element and all of its descendants in document order.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First element with the given tag in document order (this element included).
    pub fn find_descendant(&self, tag: &str) -> Option<&Element> {
        self.iter().find(|e| e.tag == tag)
    }

    /// Mutable variant of [`Element::find_descendant`].
    pub fn find_descendant_mut(&mut self, tag: &str) -> Option<&mut Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_descendant_mut(tag))
    }

    /// Visit this element and every descendant top-down, in document order.
    ///
    /// The first error returned by `f` stops the walk.
    pub fn walk_mut<E, F>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut Element) -> Result<(), E>,
    {
        f(self)?;
        for child in &mut self.children {
            child.walk_mut(f)?;
        }
        Ok(())
    }

    /// Infallible variant of [`Element::walk_mut`].
    pub fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Element),
    {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    /// Replace the whole content of this element with a single text node.
    pub fn set_text(&mut self, value: impl Into<String>) {
        self.children.clear();
        self.text = Some(value.into());
    }

    /// Concatenated character data of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
            if let Some(tail) = &child.tail {
                out.push_str(tail);
            }
        }
    }
}

/// Pre-order iterator over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("{u}root")
            .with_child(
                Element::new("{u}a")
                    .with_attribute("{u}name", "first")
                    .with_child(Element::new("{u}b")),
            )
            .with_child(Element::new("{u}b").with_attribute("{u}name", "second"))
    }

    #[test]
    fn test_qualified_name_helpers() {
        let name = qualified("urn:x", "p");
        assert_eq!(name, "{urn:x}p");
        assert_eq!(namespace_uri(&name), Some("urn:x"));
        assert_eq!(local_name(&name), "p");
        assert_eq!(namespace_uri("plain"), None);
        assert_eq!(local_name("plain"), "plain");
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut e = Element::new("x")
            .with_attribute("a", "1")
            .with_attribute("b", "2");
        e.set("a", "3");
        assert_eq!(e.attributes[0].value, "3");
        assert_eq!(e.attributes.len(), 2);
        assert_eq!(e.remove("a"), Some("3".to_string()));
        assert_eq!(e.get("a"), None);
    }

    #[test]
    fn test_iter_is_document_order() {
        let root = sample();
        let tags: Vec<_> = root.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["{u}root", "{u}a", "{u}b", "{u}b"]);
    }

    #[test]
    fn test_find_descendant_mut() {
        let mut root = sample();
        root.find_descendant_mut("{u}b").unwrap().set("{u}hit", "yes");
        assert_eq!(root.children[0].children[0].get("{u}hit"), Some("yes"));
        assert_eq!(root.children[1].get("{u}hit"), None);
    }

    #[test]
    fn test_walk_mut_visits_every_element() {
        let mut root = sample();
        let mut count = 0;
        root.walk_mut(&mut |e: &mut Element| -> Result<(), ()> {
            count += 1;
            e.set("seen", count.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 4);
        assert_eq!(root.children[1].get("seen"), Some("4"));
    }

    #[test]
    fn test_visit_mut_visits_every_element() {
        let mut root = sample();
        let mut tags = Vec::new();
        root.visit_mut(&mut |e: &mut Element| {
            tags.push(e.tag.clone());
            e.set("seen", "yes");
        });
        assert_eq!(tags, vec!["{u}root", "{u}a", "{u}b", "{u}b"]);
        assert!(root.iter().all(|e| e.get("seen") == Some("yes")));
    }

    fn first_b(root: &Element) -> Option<&Element> {
        root.children_with_tag(&format!("{{{}}}{}", "u", "b")).next()
    }

    #[test]
    fn test_children_with_tag_outlives_tag() {
        let root = sample();
        let found = first_b(&root);
        assert_eq!(found.and_then(|b| b.get("{u}name")), Some("second"));
    }

    #[test]
    fn test_text_content_includes_tails() {
        let mut root = Element::new("p");
        root.text = Some("a".to_string());
        let mut span = Element::new("span");
        span.text = Some("b".to_string());
        span.tail = Some("c".to_string());
        root.children.push(span);
        assert_eq!(root.text_content(), "abc");
    }
}
