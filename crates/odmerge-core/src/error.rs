//! Error types for odmerge-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// An element or attribute the format requires is missing, or a
    /// definition refers forward to something not yet declared.
    #[error("Schema violation{}: {message}", .part.as_ref().map(|p| format!(" in {}", p)).unwrap_or_default())]
    SchemaViolation {
        part: Option<String>,
        message: String,
    },

    /// A generated unique name collided with an existing definition.
    #[error("Name collision in {domain}: '{name}' is already defined")]
    NameCollision { domain: String, name: String },

    /// A transform read a context key that no earlier transform wrote.
    #[error("Context key not found: {0}")]
    ContextKeyMissing(String),

    /// A value that must be an integer is not.
    #[error("Invalid value for {key}: '{value}' is not an integer")]
    InvalidValue { key: String, value: String },

    #[error("Unsupported document mimetype: {0}")]
    UnsupportedMimetype(String),

    /// The document has no member for a part a transform needs.
    #[error("Document part not found: {0}")]
    MissingPart(String),

    #[error("XML error: {0}")]
    Xml(#[from] odmerge_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl EngineError {
    /// Schema violation without a known part.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            part: None,
            message: message.into(),
        }
    }

    /// Schema violation located in a document part.
    pub fn schema_in(part: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            part: Some(part.into()),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
