//! Error types for XML parsing and serialization.

use thiserror::Error;

/// Result type alias for odmerge-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing a part.
#[derive(Debug, Error)]
pub enum Error {
    /// XML syntax error from quick-xml.
    #[error("XML syntax error: {message}{}", .position.map(|p| format!(" at byte {}", p)).unwrap_or_default())]
    XmlSyntax {
        message: String,
        /// Byte offset where the error occurred.
        position: Option<u64>,
    },

    /// The part is not valid UTF-8.
    #[error("XML content is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// A prefix was used without a matching `xmlns:` declaration.
    #[error("Undeclared namespace prefix '{prefix}' on <{element}>")]
    UnboundPrefix { prefix: String, element: String },

    /// Mismatched end tag.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag { expected: String, found: String },

    /// Unexpected end of input.
    #[error("Unexpected end of input, expected closing tag </{expected}>")]
    UnexpectedEof { expected: String },

    /// Empty document (no root element).
    #[error("Empty XML document: no root element found")]
    EmptyDocument,

    /// Multiple root elements.
    #[error("Invalid XML: multiple root elements")]
    MultipleRoots,

    /// Output could not be written.
    #[error("Failed to write XML: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlSyntax {
            message: err.to_string(),
            position: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlSyntax {
            message: format!("Attribute error: {}", err),
            position: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display_with_position() {
        let err = Error::XmlSyntax {
            message: "bad".to_string(),
            position: Some(12),
        };
        assert_eq!(err.to_string(), "XML syntax error: bad at byte 12");
    }

    #[test]
    fn test_unbound_prefix_display() {
        let err = Error::UnboundPrefix {
            prefix: "text".to_string(),
            element: "text:p".to_string(),
        };
        assert!(err.to_string().contains("'text'"));
        assert!(err.to_string().contains("<text:p>"));
    }
}
