/*
 * document.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Document containers: zip packages and in-memory documents.
 */

//! Document I/O.
//!
//! The engine reads and writes whole XML parts through the
//! [`DocumentStore`] trait. [`OdfPackage`] is the zip-backed implementation
//! used for real files; [`MemoryDocument`] keeps parts as strings and is
//! what tests and embedders use.

use crate::schema::SchemaConfig;
use crate::{EngineError, Result};
use odmerge_xml::Element;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive member holding the mimetype. Always stored first and uncompressed.
pub const MIMETYPE_MEMBER: &str = "mimetype";

/// The XML parts a transform can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Part {
    Content,
    Styles,
    Meta,
    Settings,
}

impl Part {
    pub const ALL: [Part; 4] = [Part::Content, Part::Styles, Part::Meta, Part::Settings];

    /// Archive member name.
    pub fn file_name(self) -> &'static str {
        match self {
            Part::Content => "content.xml",
            Part::Styles => "styles.xml",
            Part::Meta => "meta.xml",
            Part::Settings => "settings.xml",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Part> {
        Part::ALL.into_iter().find(|p| p.file_name() == name)
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Source and sink of document parts.
pub trait DocumentStore {
    /// Schema generation of this document.
    fn schema(&self) -> &SchemaConfig;

    /// Parse a part into a tree.
    ///
    /// # Errors
    ///
    /// [`EngineError::MissingPart`] when the document has no such member.
    fn read_part(&mut self, part: Part) -> Result<Element>;

    /// Serialize a tree as the new content of a part.
    fn write_part(&mut self, part: Part, root: &Element) -> Result<()>;
}

/// A zip package on disk.
///
/// The input archive is read fully into memory on open, so the output path
/// may be the same as the input path.
pub struct OdfPackage {
    schema: SchemaConfig,
    source: Option<ZipArchive<Cursor<Vec<u8>>>>,
    output: Option<PathBuf>,
    written: Vec<(Part, Vec<u8>)>,
}

impl OdfPackage {
    /// Open an existing package for reading only.
    pub fn open_for_read(path: impl AsRef<Path>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(fs::read(path.as_ref())?))?;
        let mimetype = read_member(&mut archive, MIMETYPE_MEMBER)?;
        let schema = SchemaConfig::from_mimetype(&String::from_utf8_lossy(&mimetype))?;
        tracing::debug!(
            path = %path.as_ref().display(),
            mimetype = schema.mimetype(),
            "Opened document"
        );
        Ok(Self {
            schema,
            source: Some(archive),
            output: None,
            written: Vec::new(),
        })
    }

    /// Open `input` and write the transformed package to `output` on
    /// [`OdfPackage::close`]. Members that are never rewritten are copied.
    pub fn open_for_write(input: impl AsRef<Path>, output: impl Into<PathBuf>) -> Result<Self> {
        let mut package = Self::open_for_read(input)?;
        package.output = Some(output.into());
        Ok(package)
    }

    /// Start a new package with no input archive.
    pub fn create(output: impl Into<PathBuf>, mimetype: &str) -> Result<Self> {
        Ok(Self {
            schema: SchemaConfig::from_mimetype(mimetype)?,
            source: None,
            output: Some(output.into()),
            written: Vec::new(),
        })
    }

    /// Write the output archive. A no-op for read-only packages.
    pub fn close(mut self) -> Result<()> {
        let Some(output) = self.output.take() else {
            return Ok(());
        };

        let file = fs::File::create(&output)?;
        let mut zip = ZipWriter::new(file);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(MIMETYPE_MEMBER, stored)?;
        zip.write_all(self.schema.mimetype().as_bytes())?;

        for (part, bytes) in &self.written {
            zip.start_file(part.file_name(), deflated)?;
            zip.write_all(bytes)?;
        }

        if let Some(archive) = self.source.as_mut() {
            for index in 0..archive.len() {
                let mut member = archive.by_index(index)?;
                let name = member.name().to_string();
                let rewritten = Part::from_file_name(&name)
                    .is_some_and(|p| self.written.iter().any(|(w, _)| *w == p));
                if name == MIMETYPE_MEMBER || rewritten {
                    continue;
                }
                if member.is_dir() {
                    zip.add_directory(name, deflated)?;
                    continue;
                }
                let mut bytes = Vec::new();
                member.read_to_end(&mut bytes)?;
                zip.start_file(name, deflated)?;
                zip.write_all(&bytes)?;
            }
        }

        zip.finish()?;
        tracing::debug!(path = %output.display(), parts = self.written.len(), "Wrote document");
        Ok(())
    }
}

impl DocumentStore for OdfPackage {
    fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    fn read_part(&mut self, part: Part) -> Result<Element> {
        if let Some((_, bytes)) = self.written.iter().find(|(p, _)| *p == part) {
            return Ok(odmerge_xml::parse_bytes(bytes)?);
        }
        let archive = self
            .source
            .as_mut()
            .ok_or_else(|| EngineError::MissingPart(part.file_name().to_string()))?;
        let bytes = read_member(archive, part.file_name())?;
        Ok(odmerge_xml::parse_bytes(&bytes)?)
    }

    fn write_part(&mut self, part: Part, root: &Element) -> Result<()> {
        if self.output.is_none() {
            return Err(EngineError::Io(std::io::Error::other(format!(
                "cannot write {}: document was opened read-only",
                part
            ))));
        }
        let bytes = odmerge_xml::to_bytes(root, self.schema.namespace_table())?;
        match self.written.iter_mut().find(|(p, _)| *p == part) {
            Some(slot) => slot.1 = bytes,
            None => self.written.push((part, bytes)),
        }
        Ok(())
    }
}

fn read_member(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<Vec<u8>> {
    let mut member = match archive.by_name(name) {
        Ok(member) => member,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(EngineError::MissingPart(name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    member.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// A document whose parts live in memory as XML strings.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    schema: SchemaConfig,
    parts: BTreeMap<Part, String>,
}

impl MemoryDocument {
    pub fn new(schema: SchemaConfig) -> Self {
        Self {
            schema,
            parts: BTreeMap::new(),
        }
    }

    pub fn from_mimetype(mimetype: &str) -> Result<Self> {
        SchemaConfig::from_mimetype(mimetype).map(Self::new)
    }

    /// Builder-style part setter.
    pub fn with_part(mut self, part: Part, xml: impl Into<String>) -> Self {
        self.parts.insert(part, xml.into());
        self
    }

    /// Current XML of a part.
    pub fn part_xml(&self, part: Part) -> Option<&str> {
        self.parts.get(&part).map(String::as_str)
    }
}

impl DocumentStore for MemoryDocument {
    fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    fn read_part(&mut self, part: Part) -> Result<Element> {
        let xml = self
            .parts
            .get(&part)
            .ok_or_else(|| EngineError::MissingPart(part.file_name().to_string()))?;
        Ok(odmerge_xml::parse(xml)?)
    }

    fn write_part(&mut self, part: Part, root: &Element) -> Result<()> {
        let xml = odmerge_xml::to_string(root, self.schema.namespace_table())?;
        self.parts.insert(part, xml);
        Ok(())
    }
}
