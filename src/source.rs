//! The immutable text of one file together with its location index.

use crate::location::{LocationError, LocationIndex, Span};
use crate::tree::{NodeId, SyntaxTree};
use std::path::{Path, PathBuf};

/// One file's original text. Built once per file, read-only afterwards.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: Option<PathBuf>,
    text: String,
    index: LocationIndex,
}

impl SourceFile {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LocationIndex::new(&text);
        Self {
            path: None,
            text,
            index,
        }
    }

    pub fn with_path(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let mut source = Self::new(text);
        source.path = Some(path.into());
        source
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    /// Byte span of a node, resolved from its `(line, column)` pair.
    pub fn span_of(&self, tree: &SyntaxTree, node: NodeId) -> Result<Span, LocationError> {
        let (start, end) = tree.location(node);
        self.index.span(start, end)
    }

    /// Original text covered by `span`.
    pub fn slice(&self, span: Span) -> Result<&str, LocationError> {
        if span.end < span.start {
            return Err(LocationError::InvertedSpan {
                start: span.start,
                end: span.end,
            });
        }
        if span.end > self.text.len() {
            return Err(LocationError::OffsetOutOfBounds {
                offset: span.end,
                len: self.text.len(),
            });
        }
        for offset in [span.start, span.end] {
            if !self.text.is_char_boundary(offset) {
                return Err(LocationError::NotCharBoundary { offset });
            }
        }
        Ok(&self.text[span.as_range()])
    }

    /// Exact original text of a node.
    pub fn node_text(&self, tree: &SyntaxTree, node: NodeId) -> Result<&str, LocationError> {
        self.slice(self.span_of(tree, node)?)
    }

    /// Column offset of the node's first byte within its line.
    pub fn indent_of(&self, tree: &SyntaxTree, node: NodeId) -> Result<usize, LocationError> {
        let span = self.span_of(tree, node)?;
        self.index.indent_of(span.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;
    use crate::tree::NodeKind;

    #[test]
    fn node_text_follows_location() {
        let source = SourceFile::new("fn f() {\n    g(1);\n}\n");
        let mut b = SyntaxTree::builder();
        let root = b.root(NodeKind::Function, Position::new(1, 1), Position::new(3, 2));
        let call = b.child(root, NodeKind::Call, Position::new(2, 5), Position::new(2, 9));
        let tree = b.finish();

        assert_eq!(source.node_text(&tree, call).unwrap(), "g(1)");
        assert_eq!(source.indent_of(&tree, call).unwrap(), 4);
        assert_eq!(
            source.node_text(&tree, root).unwrap(),
            "fn f() {\n    g(1);\n}"
        );
    }

    #[test]
    fn slice_rejects_split_characters() {
        let source = SourceFile::new("é!");
        assert!(matches!(
            source.slice(Span::new(1, 3)),
            Err(LocationError::NotCharBoundary { offset: 1 })
        ));
        assert_eq!(source.slice(Span::new(0, 2)).unwrap(), "é");
    }

    #[test]
    fn slice_rejects_out_of_bounds() {
        let source = SourceFile::new("abc");
        assert!(matches!(
            source.slice(Span::new(1, 9)),
            Err(LocationError::OffsetOutOfBounds { offset: 9, len: 3 })
        ));
    }
}
