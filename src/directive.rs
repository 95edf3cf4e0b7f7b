//! Replacement directives: what to do with one node's text.
//!
//! A directive is either a literal string or a [`Transform`], a pure function
//! from the node's current text (with descendant edits already spliced in) to
//! its final text. Transforms are plain data so they can be compared,
//! serialized into edit plans, and carry discovery-time context such as an
//! indent as named fields.

use crate::sg::fill_template;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Directive {
    /// Replace the node's text wholesale; nested directives are discarded.
    Literal(String),
    /// Rewrite the node's child-patched text.
    Transform(Transform),
}

impl Directive {
    pub fn literal(text: impl Into<String>) -> Self {
        Directive::Literal(text.into())
    }

    /// Delete the node's text.
    pub fn delete() -> Self {
        Directive::Literal(String::new())
    }
}

impl From<Transform> for Directive {
    fn from(transform: Transform) -> Self {
        Directive::Transform(transform)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("text to replace not found: {needle:?}")]
    NotFound { needle: String },

    #[error("template hole ${name} does not fall on the node's text")]
    HoleOutOfRange { name: String },
}

/// A named range of the node's original text, relative to the node start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hole {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// A descendant edit spliced into a node's text before its transform runs:
/// `[start, end)` of the original node-local text became `len` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splice {
    pub start: usize,
    pub end: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Transform {
    /// `line`, a newline, `indent` spaces, then the text.
    Prefix { line: String, indent: usize },
    /// The text followed by `suffix`.
    Suffix { suffix: String },
    /// Replace the first occurrence of `from`.
    ReplaceFirst { from: String, to: String },
    /// Replace the first occurrence of `from` that is a whole identifier.
    RenameIdent { from: String, to: String },
    /// Fill `template`, taking each `$NAME` from the current text of its
    /// hole. Holes are located through the splices, so descendant rewrites
    /// inside a hole show up in the output.
    Template { template: String, holes: Vec<Hole> },
    /// Apply each transform in order. Only the first step sees the splices.
    Chain { steps: Vec<Transform> },
}

impl Transform {
    pub fn prefix(line: impl Into<String>, indent: usize) -> Self {
        Transform::Prefix {
            line: line.into(),
            indent,
        }
    }

    pub fn rename_ident(from: impl Into<String>, to: impl Into<String>) -> Self {
        Transform::RenameIdent {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn apply(&self, text: &str) -> Result<String, TransformError> {
        self.apply_spliced(text, &[])
    }

    /// Apply to child-patched `text`; `splices` are the patches, in
    /// ascending order.
    pub fn apply_spliced(&self, text: &str, splices: &[Splice]) -> Result<String, TransformError> {
        match self {
            Transform::Prefix { line, indent } => {
                Ok(format!("{line}\n{}{text}", " ".repeat(*indent)))
            }
            Transform::Suffix { suffix } => Ok(format!("{text}{suffix}")),
            Transform::ReplaceFirst { from, to } => {
                let at = text.find(from.as_str()).ok_or_else(|| TransformError::NotFound {
                    needle: from.clone(),
                })?;
                Ok(splice_str(text, at, from.len(), to))
            }
            Transform::RenameIdent { from, to } => {
                let at = find_ident(text, from).ok_or_else(|| TransformError::NotFound {
                    needle: from.clone(),
                })?;
                Ok(splice_str(text, at, from.len(), to))
            }
            Transform::Template { template, holes } => {
                let mut values = Vec::with_capacity(holes.len());
                for hole in holes {
                    let start = map_offset(splices, hole.start, false);
                    let end = map_offset(splices, hole.end, true);
                    let value = text.get(start..end).ok_or_else(|| TransformError::HoleOutOfRange {
                        name: hole.name.clone(),
                    })?;
                    values.push((hole.name.as_str(), value));
                }
                Ok(fill_template(template, |name| {
                    values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
                }))
            }
            Transform::Chain { steps } => {
                let mut text = text.to_string();
                for (i, step) in steps.iter().enumerate() {
                    let splices: &[Splice] = if i == 0 { splices } else { &[] };
                    text = step.apply_spliced(&text, splices)?;
                }
                Ok(text)
            }
        }
    }
}

/// Where original node-local offset `at` ended up after `splices`.
///
/// Splices ending at or before `at` shift it by their growth; splices
/// starting at or after `at` leave it alone, so an insertion at a hole's
/// start lands inside it and one at its end lands after it. When a splice
/// strictly covers `at`, it snaps to the splice's new start, or its new end
/// if `end` is set.
fn map_offset(splices: &[Splice], at: usize, end: bool) -> usize {
    let mut shifted = at as isize;
    for s in splices {
        if s.start >= at {
            break;
        }
        if s.end > at {
            let start = s.start as isize + (shifted - at as isize);
            return (if end { start + s.len as isize } else { start }) as usize;
        }
        shifted += s.len as isize - (s.end - s.start) as isize;
    }
    shifted as usize
}

fn splice_str(text: &str, at: usize, len: usize, with: &str) -> String {
    let mut out = String::with_capacity(text.len() - len + with.len());
    out.push_str(&text[..at]);
    out.push_str(with);
    out.push_str(&text[at + len..]);
    out
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Byte offset of the first occurrence of `ident` not embedded in a longer
/// identifier.
fn find_ident(text: &str, ident: &str) -> Option<usize> {
    if ident.is_empty() {
        return None;
    }
    text.match_indices(ident).map(|(at, _)| at).find(|&at| {
        let before = text[..at].chars().next_back();
        let after = text[at + ident.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}
