//! Name-erased structural keys for element subtrees.

use crate::Element;

/// A hashable, order-normalized view of an element subtree.
///
/// Two definitions that differ only in the value of their naming attribute
/// produce equal canonical forms, which is what style deduplication needs.
/// Attributes are sorted by name; whitespace-only text is ignored and other
/// text is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalForm {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<CanonicalForm>,
}

impl CanonicalForm {
    /// Canonical form of `element`, leaving out every attribute named
    /// `ignore` at any depth.
    pub fn of(element: &Element, ignore: &str) -> Self {
        let mut attributes: Vec<(String, String)> = element
            .attributes
            .iter()
            .filter(|a| a.name != ignore)
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        attributes.sort();

        Self {
            tag: element.tag.clone(),
            attributes,
            text: significant(element.text.as_deref()),
            tail: significant(element.tail.as_deref()),
            children: element
                .children
                .iter()
                .map(|child| Self::of(child, ignore))
                .collect(),
        }
    }
}

impl Element {
    /// Shorthand for [`CanonicalForm::of`].
    pub fn canonical_form(&self, ignore: &str) -> CanonicalForm {
        CanonicalForm::of(self, ignore)
    }
}

fn significant(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
