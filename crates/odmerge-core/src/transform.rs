/*
 * transform.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Transform trait and the priority-ordered transformer.
 */

//! Transform pipeline infrastructure.
//!
//! - [`Transform`] - the trait implemented by every part transformation
//! - [`Transformer`] - priority buckets of transforms applied to one document
//!
//! # Architecture
//!
//! Each transform targets one document part (content, styles, meta or
//! settings) and has an integer priority. The transformer loads only the
//! parts some registered transform needs, runs the transforms in ascending
//! priority (ties keep registration order), and writes back the parts whose
//! trees changed. Transforms communicate through the shared [`Context`].
//!
//! # Example
//!
//! ```ignore
//! use odmerge_core::{Transformer, run_pipeline};
//! use odmerge_core::attribute_access::{get_meta, set_meta};
//!
//! let mut transformer = Transformer::new();
//! transformer.insert(Box::new(get_meta(doc.schema())));
//! transformer.insert(Box::new(set_meta(doc.schema())));
//! let ctx = transformer.transform(&mut doc)?;
//! ```

use crate::context::Context;
use crate::document::{DocumentStore, Part};
use crate::{EngineError, Result};
use odmerge_xml::Element;
use std::collections::{BTreeMap, BTreeSet};

/// Default priority of content transforms.
pub const DEFAULT_PRIORITY: i32 = 100;

/// A transformation of one (or, for composite transforms, several) parts.
pub trait Transform {
    /// Human-readable name, used for logging.
    fn name(&self) -> &str;

    /// The part this transform is applied to.
    fn part(&self) -> Part;

    /// Lower priorities run earlier.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Every part the transform needs loaded.
    fn parts(&self) -> Vec<Part> {
        vec![self.part()]
    }

    /// Apply the transformation to the tree of [`Transform::part`].
    ///
    /// # Errors
    ///
    /// A missing required element is a schema violation and aborts the run.
    fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()>;

    /// Apply the transformation given every loaded part. Transforms that
    /// touch more than one part override this.
    fn apply_all(&mut self, trees: &mut PartTrees, ctx: &mut Context) -> Result<()> {
        let root = trees.get_mut(self.part())?;
        self.apply(root, ctx)
    }
}

/// The loaded trees of one document, keyed by part.
#[derive(Debug, Default, Clone)]
pub struct PartTrees {
    trees: BTreeMap<Part, Element>,
}

impl PartTrees {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, part: Part, root: Element) {
        self.trees.insert(part, root);
    }

    pub fn get(&self, part: Part) -> Option<&Element> {
        self.trees.get(&part)
    }

    pub fn get_mut(&mut self, part: Part) -> Result<&mut Element> {
        self.trees
            .get_mut(&part)
            .ok_or_else(|| EngineError::MissingPart(part.file_name().to_string()))
    }

    /// Remove a tree so it can be mutated alongside another one.
    pub fn take(&mut self, part: Part) -> Result<Element> {
        self.trees
            .remove(&part)
            .ok_or_else(|| EngineError::MissingPart(part.file_name().to_string()))
    }

    pub fn parts(&self) -> impl Iterator<Item = Part> + '_ {
        self.trees.keys().copied()
    }
}

/// Applies registered transforms to a document in priority order.
pub struct Transformer {
    buckets: BTreeMap<i32, Vec<Box<dyn Transform>>>,
}

impl Transformer {
    /// Create a new empty transformer.
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    /// Register a transform under its priority. Within a priority,
    /// transforms run in registration order.
    pub fn insert(&mut self, transform: Box<dyn Transform>) {
        self.buckets
            .entry(transform.priority())
            .or_default()
            .push(transform);
    }

    /// Register several transforms.
    pub fn extend(&mut self, transforms: impl IntoIterator<Item = Box<dyn Transform>>) {
        for transform in transforms {
            self.insert(transform);
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Names of all transforms in execution order.
    pub fn transform_names(&self) -> Vec<&str> {
        self.buckets
            .values()
            .flatten()
            .map(|t| t.name())
            .collect()
    }

    /// Parts needed by at least one registered transform.
    pub fn required_parts(&self) -> BTreeSet<Part> {
        self.buckets
            .values()
            .flatten()
            .flat_map(|t| t.parts())
            .collect()
    }

    /// Run every transform against `doc` with a fresh context.
    pub fn transform(&mut self, doc: &mut dyn DocumentStore) -> Result<Context> {
        let ctx = Context::new(doc.schema().clone());
        self.transform_with(doc, ctx)
    }

    /// Run every transform against `doc`, starting from `ctx`.
    ///
    /// Parts are only written back once every transform has succeeded, and
    /// only if their tree changed.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Execution stops on error and
    /// nothing is written.
    pub fn transform_with(
        &mut self,
        doc: &mut dyn DocumentStore,
        mut ctx: Context,
    ) -> Result<Context> {
        let mut trees = PartTrees::new();
        let mut originals = BTreeMap::new();
        for part in self.required_parts() {
            let root = doc.read_part(part)?;
            originals.insert(part, root.clone());
            trees.insert(part, root);
        }

        for transform in self.buckets.values_mut().flatten() {
            tracing::debug!(
                transform = transform.name(),
                part = %transform.part(),
                priority = transform.priority(),
                "Running transform"
            );
            transform.apply_all(&mut trees, &mut ctx)?;
        }

        for (part, original) in originals {
            match trees.get(part) {
                Some(root) if *root != original => {
                    tracing::debug!(part = %part, "Writing changed part");
                    doc.write_part(part, root)?;
                }
                _ => {}
            }
        }

        Ok(ctx)
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::schema::OOO1_MIMETYPE;
    use std::cell::RefCell;
    use std::rc::Rc;

    const META: &str = r#"<office:document-meta xmlns:office="http://openoffice.org/2000/office"><office:meta/></office:document-meta>"#;

    /// Records its id when applied and optionally tags the root.
    struct RecordingTransform {
        id: usize,
        priority: i32,
        mutate: bool,
        order: Rc<RefCell<Vec<usize>>>,
    }

    impl Transform for RecordingTransform {
        fn name(&self) -> &str {
            "recording"
        }

        fn part(&self) -> Part {
            Part::Meta
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
            self.order.borrow_mut().push(self.id);
            ctx.set(Context::key("Recording", "last"), self.id as i64);
            if self.mutate {
                root.set("touched", self.id.to_string());
            }
            Ok(())
        }
    }

    /// A transform that fails.
    struct FailingTransform;

    impl Transform for FailingTransform {
        fn name(&self) -> &str {
            "failing"
        }

        fn part(&self) -> Part {
            Part::Meta
        }

        fn apply(&mut self, _root: &mut Element, _ctx: &mut Context) -> Result<()> {
            Err(EngineError::schema("failed intentionally"))
        }
    }

    fn recording(
        id: usize,
        priority: i32,
        mutate: bool,
        order: &Rc<RefCell<Vec<usize>>>,
    ) -> Box<dyn Transform> {
        Box::new(RecordingTransform {
            id,
            priority,
            mutate,
            order: order.clone(),
        })
    }

    fn doc() -> MemoryDocument {
        MemoryDocument::from_mimetype(OOO1_MIMETYPE)
            .unwrap()
            .with_part(Part::Meta, META)
    }

    #[test]
    fn test_empty_transformer() {
        let transformer = Transformer::new();
        assert!(transformer.is_empty());
        assert_eq!(transformer.len(), 0);
        assert!(transformer.required_parts().is_empty());
    }

    #[test]
    fn test_priority_then_insertion_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut transformer = Transformer::new();
        transformer.insert(recording(1, 100, false, &order));
        transformer.insert(recording(2, 20, false, &order));
        transformer.insert(recording(3, 100, false, &order));
        transformer.insert(recording(4, 20, false, &order));
        assert_eq!(transformer.len(), 4);

        let ctx = transformer.transform(&mut doc()).unwrap();
        assert_eq!(*order.borrow(), vec![2, 4, 1, 3]);
        assert_eq!(ctx.get_int("Recording:last").unwrap(), 3);
    }

    #[test]
    fn test_only_changed_parts_are_written() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut unchanged = doc();
        let mut transformer = Transformer::new();
        transformer.insert(recording(1, 100, false, &order));
        transformer.transform(&mut unchanged).unwrap();
        assert_eq!(unchanged.part_xml(Part::Meta), Some(META));

        let mut changed = doc();
        let mut transformer = Transformer::new();
        transformer.insert(recording(1, 100, true, &order));
        transformer.transform(&mut changed).unwrap();
        assert!(changed.part_xml(Part::Meta).unwrap().contains(r#"touched="1""#));
    }

    #[test]
    fn test_failure_stops_run_and_writes_nothing() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut document = doc();
        let mut transformer = Transformer::new();
        transformer.insert(recording(1, 10, true, &order));
        transformer.insert(Box::new(FailingTransform));
        transformer.insert(recording(2, 200, true, &order));

        assert!(transformer.transform(&mut document).is_err());
        assert_eq!(*order.borrow(), vec![1]);
        assert_eq!(document.part_xml(Part::Meta), Some(META));
    }

    #[test]
    fn test_missing_required_part() {
        let mut document = MemoryDocument::from_mimetype(OOO1_MIMETYPE).unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut transformer = Transformer::new();
        transformer.insert(recording(1, 10, false, &order));
        let err = transformer.transform(&mut document).unwrap_err();
        assert!(matches!(err, EngineError::MissingPart(_)));
    }
}
