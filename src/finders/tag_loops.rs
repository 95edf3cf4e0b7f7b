use crate::directive::{Directive, Transform};
use crate::finders::{FindError, Finder, Found};
use crate::pattern::Pattern;
use crate::source::SourceFile;
use crate::tree::{NodeId, NodeKind, SyntaxTree};
use serde::Deserialize;

pub const KIND: &str = "tag-loops";

/// Turns a marker call at the top of a loop body into an attribute on the
/// loop itself.
///
/// Every top-level `marker()` statement in the loop body is deleted, and a
/// loop that had at least one gets `attribute` on its own line above it, at
/// the loop's indentation. Marker macros (`marker!()`) count as well.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagLoops {
    pub marker: String,
    pub attribute: String,
}

fn no_arg_call() -> Pattern {
    Pattern::kind(NodeKind::Call).children([
        Pattern::kind(NodeKind::Identifier).capture("callee"),
        Pattern::kind(NodeKind::Arguments).children([]),
    ])
}

impl TagLoops {
    fn is_marker(&self, tree: &SyntaxTree, pattern: &Pattern, node: NodeId) -> Result<bool, FindError> {
        let call = match tree.kind(node) {
            NodeKind::ExpressionStatement => match tree.children(node) {
                [inner] => *inner,
                _ => return Ok(false),
            },
            _ => node,
        };
        let Some(bindings) = pattern.match_node(tree, call) else {
            return Ok(false);
        };
        let callee = bindings.get("callee")?;
        Ok(tree.name(callee) == Some(self.marker.as_str()))
    }
}

impl Finder for TagLoops {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn find(&self, source: &SourceFile, tree: &SyntaxTree, unit: NodeId) -> Result<Found, FindError> {
        let pattern = no_arg_call();
        let mut found = Vec::new();

        for node in tree.descendants(unit) {
            if *tree.kind(node) != NodeKind::Loop {
                continue;
            }
            let Some(&body) = tree.children(node).last() else {
                continue;
            };

            let mut tagged = false;
            for &stmt in tree.children(body) {
                if self.is_marker(tree, &pattern, stmt)? {
                    tagged = true;
                    found.push((stmt, Directive::delete()));
                }
            }

            if tagged {
                let indent = source.indent_of(tree, node)?;
                found.push((node, Transform::prefix(self.attribute.as_str(), indent).into()));
            }
        }

        Ok(found)
    }
}
