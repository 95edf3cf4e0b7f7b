//! Line/column to byte-offset mapping for a single source buffer.
//!
//! The index is built once from the original, unmodified text. Every span and
//! edit downstream is expressed in that buffer's offsets, so the index must
//! never be rebuilt from rewritten text.

use serde::Serialize;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// A 1-based `(line, column)` source position. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open `[start, end)` byte range into the original buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Closed-open containment: `other` lies entirely within `self`.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("position {position} is not a valid 1-based location")]
    InvalidPosition { position: Position },

    #[error("line {line} is past the last line of the buffer ({line_count} lines)")]
    LineOutOfBounds { line: usize, line_count: usize },

    #[error("offset {offset} is past the end of the buffer (length {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("span end {end} precedes span start {start}")]
    InvertedSpan { start: usize, end: usize },

    #[error("offset {offset} falls inside a multi-byte character")]
    NotCharBoundary { offset: usize },
}

/// Table of line-start offsets for one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LocationIndex {
    /// Scan `text` once, recording the offset after every newline as the
    /// start of the next line.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Number of lines, counting a trailing empty line after a final newline.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Length in bytes of the indexed buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Absolute offset of a 1-based position.
    ///
    /// The column is added as a plain byte offset from the line start; a
    /// column running past the end of its line is accepted as long as the
    /// result stays within the buffer.
    pub fn offset(&self, position: Position) -> Result<usize, LocationError> {
        if position.line == 0 || position.column == 0 {
            return Err(LocationError::InvalidPosition { position });
        }

        let line_start = *self.line_starts.get(position.line - 1).ok_or(
            LocationError::LineOutOfBounds {
                line: position.line,
                line_count: self.line_count(),
            },
        )?;

        let offset = line_start + (position.column - 1);
        if offset > self.len {
            return Err(LocationError::OffsetOutOfBounds {
                offset,
                len: self.len,
            });
        }

        Ok(offset)
    }

    /// Inverse of [`offset`](Self::offset).
    pub fn position(&self, offset: usize) -> Result<Position, LocationError> {
        if offset > self.len {
            return Err(LocationError::OffsetOutOfBounds {
                offset,
                len: self.len,
            });
        }

        // Last line whose start is <= offset.
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];

        Ok(Position {
            line,
            column: offset - line_start + 1,
        })
    }

    /// Resolve a `(start, end)` position pair to a byte span.
    pub fn span(&self, start: Position, end: Position) -> Result<Span, LocationError> {
        let start = self.offset(start)?;
        let end = self.offset(end)?;
        if end < start {
            return Err(LocationError::InvertedSpan { start, end });
        }
        Ok(Span { start, end })
    }

    /// Number of bytes between the start of the offset's line and the offset.
    pub fn indent_of(&self, offset: usize) -> Result<usize, LocationError> {
        self.position(offset).map(|p| p.column - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_offsets() {
        let index = LocationIndex::new("fn main() {}\n");
        assert_eq!(index.offset(Position::new(1, 1)).unwrap(), 0);
        assert_eq!(index.offset(Position::new(1, 4)).unwrap(), 3);
    }

    #[test]
    fn later_line_offsets() {
        let text = "ab\ncde\n\nfg";
        let index = LocationIndex::new(text);

        assert_eq!(index.line_count(), 4);
        assert_eq!(index.offset(Position::new(2, 1)).unwrap(), 3);
        assert_eq!(index.offset(Position::new(2, 3)).unwrap(), 5);
        assert_eq!(index.offset(Position::new(3, 1)).unwrap(), 7);
        assert_eq!(index.offset(Position::new(4, 2)).unwrap(), 9);
        assert_eq!(&text[9..10], "g");
    }

    #[test]
    fn end_of_buffer_is_addressable() {
        let index = LocationIndex::new("abc");
        assert_eq!(index.offset(Position::new(1, 4)).unwrap(), 3);
        assert!(matches!(
            index.offset(Position::new(1, 5)),
            Err(LocationError::OffsetOutOfBounds { offset: 4, len: 3 })
        ));
    }

    #[test]
    fn zero_coordinates_are_rejected() {
        let index = LocationIndex::new("abc");
        assert!(matches!(
            index.offset(Position::new(0, 1)),
            Err(LocationError::InvalidPosition { .. })
        ));
        assert!(matches!(
            index.offset(Position::new(1, 0)),
            Err(LocationError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn line_past_end_is_rejected() {
        let index = LocationIndex::new("one\ntwo");
        assert!(matches!(
            index.offset(Position::new(3, 1)),
            Err(LocationError::LineOutOfBounds {
                line: 3,
                line_count: 2
            })
        ));
    }

    #[test]
    fn position_inverts_offset() {
        let text = "let x = 1;\n    let y = 2;\nlet z = 3;\n";
        let index = LocationIndex::new(text);

        for offset in 0..=text.len() {
            let pos = index.position(offset).unwrap();
            assert_eq!(index.offset(pos).unwrap(), offset, "offset {offset}");
        }
    }

    #[test]
    fn newline_belongs_to_its_line() {
        let index = LocationIndex::new("ab\ncd");
        assert_eq!(index.position(2).unwrap(), Position::new(1, 3));
        assert_eq!(index.position(3).unwrap(), Position::new(2, 1));
    }

    #[test]
    fn span_resolution() {
        let index = LocationIndex::new("f(1, 2)\ng()");
        let span = index
            .span(Position::new(2, 1), Position::new(2, 4))
            .unwrap();
        assert_eq!(span, Span::new(8, 11));
        assert_eq!(span.len(), 3);
    }

    #[test]
    fn inverted_span_is_rejected() {
        let index = LocationIndex::new("abcdef");
        assert!(matches!(
            index.span(Position::new(1, 4), Position::new(1, 2)),
            Err(LocationError::InvertedSpan { start: 3, end: 1 })
        ));
    }

    #[test]
    fn indent_of_nested_line() {
        let index = LocationIndex::new("fn f() {\n    for x in y {}\n}");
        assert_eq!(index.indent_of(13).unwrap(), 4);
        assert_eq!(index.indent_of(0).unwrap(), 0);
    }

    #[test]
    fn span_containment() {
        let outer = Span::new(2, 10);
        assert!(outer.contains(&Span::new(2, 10)));
        assert!(outer.contains(&Span::new(4, 6)));
        assert!(!outer.contains(&Span::new(1, 6)));
        assert!(!outer.contains(&Span::new(8, 11)));
    }
}
