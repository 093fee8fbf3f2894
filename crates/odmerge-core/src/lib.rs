//! Transform and merge engine for office documents
//!
//! This crate runs priority-ordered pipelines of tree transforms over the
//! XML parts of OpenOffice.org 1.x and OpenDocument text documents, and
//! builds mail-merge and concatenation on top of them.
//!
//! # Architecture
//!
//! - [`SchemaConfig`] - namespace table and well-known tags of one format
//!   generation, chosen from the document mimetype
//! - [`DocumentStore`] - part-level document I/O ([`OdfPackage`] for zip
//!   files, [`MemoryDocument`] for in-memory parts)
//! - [`Transform`] / [`Transformer`] - the pipeline
//! - [`Context`] - key-value store shared by the transforms of one run
//! - [`attribute_access`] - attribute readers, writers and renamers applied
//!   in one document-order walk
//! - [`Mailmerge`] and [`Concatenate`] - the merge operations
//!
//! # Example
//!
//! ```ignore
//! use odmerge_core::{EngineConfig, OdfPackage, DocumentStore, pipeline};
//! use odmerge_core::transforms::{FieldSource, StaticMap};
//!
//! let mut doc = OdfPackage::open_for_write("letter.odt", "out.odt")?;
//! let records: Vec<Box<dyn FieldSource>> = vec![
//!     Box::new(StaticMap::new().with("firstname", "Erika")),
//!     Box::new(StaticMap::new().with("firstname", "Eric")),
//! ];
//! let config = EngineConfig::default();
//! let transforms = pipeline::mailmerge_transforms(doc.schema(), records, &config);
//! pipeline::run_pipeline(&mut doc, transforms)?;
//! doc.close()?;
//! ```

pub mod attribute_access;
pub mod concatenate;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod mailmerge;
pub mod pipeline;
pub mod schema;
pub mod transform;
pub mod transforms;

// Re-export commonly used types
pub use attribute_access::{Accessor, AttributeAccess};
pub use concatenate::{Concatenate, SourceDocument};
pub use config::EngineConfig;
pub use context::{Context, Value};
pub use document::{DocumentStore, MemoryDocument, OdfPackage, Part};
pub use error::{EngineError, Result};
pub use mailmerge::Mailmerge;
pub use pipeline::run_pipeline;
pub use schema::{Generation, Ns, OOO1_MIMETYPE, OPENDOCUMENT_MIMETYPE, SchemaConfig};
pub use transform::{PartTrees, Transform, Transformer};
