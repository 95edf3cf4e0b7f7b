//! Patch composition: registry + tree → flat, non-overlapping edit list.
//!
//! The tree is walked postorder with children visited in reverse sibling order,
//! so the edits coming back from any one visit are ordered by descending start
//! offset. A node's directive decides what happens to the edits of its
//! subtree:
//!
//! - no directive: subtree edits pass through unchanged;
//! - [`Directive::Literal`]: subtree edits are discarded and the node yields a
//!   single edit with the literal text;
//! - [`Directive::Transform`]: subtree edits inside the node are spliced into
//!   a working copy of the node's original text, the transform runs on the
//!   result, and the node yields a single edit with the transform's output.
//!
//! All offsets are in the original buffer's coordinates.

use crate::directive::{Directive, Splice, Transform, TransformError};
use crate::edit::Edit;
use crate::location::{LocationError, Span};
use crate::registry::Registry;
use crate::source::SourceFile;
use crate::tree::{NodeId, SyntaxTree};
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("node {node} has an unusable span: {source}")]
    Span {
        node: NodeId,
        #[source]
        source: LocationError,
    },

    #[error("transform on node {node} failed: {source}")]
    Transform {
        node: NodeId,
        #[source]
        source: TransformError,
    },

    #[error("edit [{edit_start}, {edit_end}) starts before node {node} at [{start}, {end})")]
    EscapesNode {
        node: NodeId,
        start: usize,
        end: usize,
        edit_start: usize,
        edit_end: usize,
    },

    #[error("edit [{edit_start}, {edit_end}) overlaps an edit starting at {next_start} inside node {node}")]
    Overlap {
        node: NodeId,
        edit_start: usize,
        edit_end: usize,
        next_start: usize,
    },
}

/// Resolves the registry's directives against one file's tree.
pub struct Compositor<'a> {
    source: &'a SourceFile,
    tree: &'a SyntaxTree,
    registry: &'a Registry,
}

impl<'a> Compositor<'a> {
    pub fn new(source: &'a SourceFile, tree: &'a SyntaxTree, registry: &'a Registry) -> Self {
        Self {
            source,
            tree,
            registry,
        }
    }

    /// Edits for the whole file: every top-level unit, last unit first.
    pub fn compose(&self) -> Result<Vec<Edit>, ComposeError> {
        let mut edits = Vec::new();
        for &unit in self.tree.roots().iter().rev() {
            self.visit(unit, &mut edits)?;
        }
        trace!(units = self.tree.roots().len(), edits = edits.len(), "composed file");
        Ok(edits)
    }

    fn visit(&self, node: NodeId, out: &mut Vec<Edit>) -> Result<(), ComposeError> {
        match self.registry.get(node) {
            None => {
                for &child in self.tree.children(node).iter().rev() {
                    self.visit(child, out)?;
                }
            }
            Some(Directive::Literal(text)) => {
                let (span, original) = self.resolve(node)?;
                out.push(Edit::new(span.start, span.end, text.clone(), original));
            }
            Some(Directive::Transform(transform)) => {
                self.visit_transform(node, transform, out)?;
            }
        }
        Ok(())
    }

    fn visit_transform(
        &self,
        node: NodeId,
        transform: &Transform,
        out: &mut Vec<Edit>,
    ) -> Result<(), ComposeError> {
        let (span, original) = self.resolve(node)?;

        let mut nested = Vec::new();
        for &child in self.tree.children(node).iter().rev() {
            self.visit(child, &mut nested)?;
        }

        let mut text = original.to_string();
        let mut splices = Vec::new();
        // Start of the last edit spliced in; everything before it is still
        // original text at its original local offset.
        let mut floor = span.end;

        for edit in nested {
            if edit.byte_start >= span.end {
                out.push(edit);
                continue;
            }
            if edit.byte_start < span.start {
                return Err(ComposeError::EscapesNode {
                    node,
                    start: span.start,
                    end: span.end,
                    edit_start: edit.byte_start,
                    edit_end: edit.byte_end,
                });
            }
            if edit.byte_end > floor {
                return Err(ComposeError::Overlap {
                    node,
                    edit_start: edit.byte_start,
                    edit_end: edit.byte_end,
                    next_start: floor,
                });
            }

            let local = (edit.byte_start - span.start)..(edit.byte_end - span.start);
            splices.push(Splice {
                start: local.start,
                end: local.end,
                len: edit.new_text.len(),
            });
            text.replace_range(local, &edit.new_text);
            floor = edit.byte_start;
        }
        splices.reverse();

        let new_text = transform
            .apply_spliced(&text, &splices)
            .map_err(|source| ComposeError::Transform { node, source })?;
        out.push(Edit::new(span.start, span.end, new_text, original));
        Ok(())
    }

    fn resolve(&self, node: NodeId) -> Result<(Span, &'a str), ComposeError> {
        let span = self
            .source
            .span_of(self.tree, node)
            .map_err(|source| ComposeError::Span { node, source })?;
        let text = self
            .source
            .slice(span)
            .map_err(|source| ComposeError::Span { node, source })?;
        Ok((span, text))
    }
}
