use crate::directive::{Directive, Hole, Transform};
use crate::finders::{FindError, Finder, Found};
use crate::location::Span;
use crate::sg::{template_vars, PatternMatch, PatternMatcher};
use crate::source::SourceFile;
use crate::tree::{NodeId, SyntaxTree};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

pub const KIND: &str = "template";

/// Rewrites ast-grep pattern matches with a `$NAME` template.
///
/// Each match is attached to the outermost node of the unit whose span is
/// exactly the match's span. Matches outside the unit are skipped, and
/// matches that line up with no node are logged and skipped.
///
/// The template is filled at composition time from the node's rewritten
/// text, so a match nested inside a captured metavariable is rewritten too.
/// Every variable the template names must be bound by the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateFinder {
    pub pattern: String,
    pub template: String,
}

impl Finder for TemplateFinder {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn find(&self, source: &SourceFile, tree: &SyntaxTree, unit: NodeId) -> Result<Found, FindError> {
        let unit_span = source.span_of(tree, unit)?;
        let matcher = PatternMatcher::new(source.text());
        let matches = matcher.find_all(&self.pattern)?;
        let vars = template_vars(&self.template);

        let mut by_span: HashMap<Span, NodeId> = HashMap::new();
        for node in tree.descendants(unit) {
            by_span.entry(source.span_of(tree, node)?).or_insert(node);
        }

        let mut found = Vec::new();
        for m in matches {
            let span = Span::new(m.byte_start, m.byte_end);
            if span.start < unit_span.start || span.end > unit_span.end {
                continue;
            }
            match by_span.get(&span) {
                Some(&node) => found.push((node, self.directive(&m, &vars)?)),
                None => warn!(
                    pattern = %self.pattern,
                    text = %m.text,
                    start = span.start,
                    end = span.end,
                    "match does not line up with a tree node, skipping"
                ),
            }
        }

        Ok(found)
    }
}

impl TemplateFinder {
    fn directive(&self, m: &PatternMatch, vars: &[&str]) -> Result<Directive, FindError> {
        let mut holes = Vec::with_capacity(vars.len());
        for &name in vars {
            let capture = m.capture(name)?;
            // An empty variadic capture has no position; any empty hole
            // fills it.
            let (start, end) = if capture.byte_start == capture.byte_end {
                (0, 0)
            } else {
                (capture.byte_start - m.byte_start, capture.byte_end - m.byte_start)
            };
            holes.push(Hole {
                name: name.to_string(),
                start,
                end,
            });
        }
        Ok(Directive::from(Transform::Template {
            template: self.template.clone(),
            holes,
        }))
    }
}
