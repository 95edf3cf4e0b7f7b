use crate::cache;
use crate::sg::errors::AstGrepError;
use crate::sg::lang::rust;
use ast_grep_core::meta_var::MetaVariable;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, NodeMatch};
use ast_grep_language::SupportLang;
use std::collections::HashMap;

/// One captured metavariable: its byte range in the source and its text.
///
/// A `$$$NAME` capture spans its first to last matched node, separators
/// included. An empty `$$$NAME` capture has an empty range at `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub byte_start: usize,
    pub byte_end: usize,
    pub text: String,
}

/// A match from an ast-grep pattern with captured metavariables.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Byte range of the entire match
    pub byte_start: usize,
    pub byte_end: usize,
    /// The matched text
    pub text: String,
    /// Captured metavariables by name
    pub captures: HashMap<String, Capture>,
}

impl PatternMatch {
    /// Captured metavariable by name.
    pub fn capture(&self, name: &str) -> Result<&Capture, AstGrepError> {
        self.captures
            .get(name)
            .ok_or_else(|| AstGrepError::MetavarNotFound {
                name: name.to_string(),
            })
    }
}

/// Split a leading `$NAME` or `$$$NAME` off `s` (which starts with `$`).
/// Returns the length consumed and the name. `$_`-prefixed names never
/// capture and are not treated as variables.
fn split_var(s: &str) -> Option<(usize, &str)> {
    let dollars = s.bytes().take_while(|&b| b == b'$').count();
    if dollars != 1 && dollars != 3 {
        return None;
    }
    let rest = &s[dollars..];
    let len = rest
        .bytes()
        .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
        .count();
    let name = &rest[..len];
    match name.bytes().next() {
        Some(b) if b.is_ascii_uppercase() => Some((dollars + len, name)),
        _ => None,
    }
}

/// Metavariable names referenced by a template, in order of first use.
pub fn template_vars(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut rest = template;
    while let Some(at) = rest.find('$') {
        let tail = &rest[at..];
        let skip = match split_var(tail) {
            Some((len, name)) => {
                if !names.contains(&name) {
                    names.push(name);
                }
                len
            }
            None => tail.bytes().take_while(|&b| b == b'$').count(),
        };
        rest = &tail[skip..];
    }
    names
}

/// Replace every `$NAME` and `$$$NAME` in `template` for which `lookup`
/// has a value. Substitution is a single left-to-right pass, so captured
/// text is never itself rescanned for variables.
pub fn fill_template<'v>(template: &str, lookup: impl Fn(&str) -> Option<&'v str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        let skip = match split_var(tail) {
            Some((len, name)) => {
                match lookup(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&tail[..len]),
                }
                len
            }
            None => {
                let dollars = tail.bytes().take_while(|&b| b == b'$').count();
                out.push_str(&tail[..dollars]);
                dollars
            }
        };
        rest = &tail[skip..];
    }
    out.push_str(rest);
    out
}

/// Pattern matcher over one Rust source using ast-grep's metavariable syntax.
///
/// # Metavariable Syntax
///
/// - `$NAME` - Matches a single node and captures it
/// - `$$$NAME` - Matches zero or more nodes (variadic)
/// - `$_` - Matches any single node (anonymous)
pub struct PatternMatcher<'a> {
    source: &'a str,
    sg: AstGrep<StrDoc<SupportLang>>,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            sg: AstGrep::new(source, rust()),
        }
    }

    /// Find all matches for a pattern, in document order.
    pub fn find_all(&self, pattern: &str) -> Result<Vec<PatternMatch>, AstGrepError> {
        let pat = cache::get_or_compile_pattern(pattern, rust())?;
        let root = self.sg.root();

        Ok(root
            .find_all(&pat)
            .map(|m| self.node_match_to_pattern_match(m))
            .collect())
    }

    fn node_match_to_pattern_match(&self, m: NodeMatch<StrDoc<SupportLang>>) -> PatternMatch {
        let range = m.get_node().range();
        let env = m.get_env();

        let mut captures = HashMap::new();
        for var in env.get_matched_variables() {
            let (name, range) = match var {
                MetaVariable::Capture(name, _) => match env.get_match(&name) {
                    Some(node) => (name, node.range()),
                    None => continue,
                },
                MetaVariable::MultiCapture(name) => {
                    let nodes = env.get_multiple_matches(&name);
                    let range = match (nodes.first(), nodes.last()) {
                        (Some(first), Some(last)) => first.range().start..last.range().end,
                        _ => 0..0,
                    };
                    (name, range)
                }
                _ => continue,
            };
            let capture = Capture {
                byte_start: range.start,
                byte_end: range.end,
                text: self.source[range].to_string(),
            };
            captures.insert(name, capture);
        }

        PatternMatch {
            byte_start: range.start,
            byte_end: range.end,
            text: self.source[range].to_string(),
            captures,
        }
    }
}
