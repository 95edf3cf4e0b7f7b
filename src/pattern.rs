//! Declarative node-shape patterns matched against a [`SyntaxTree`].
//!
//! A pattern names a required node kind, optionally constrains the node's
//! children in order, and may attach a capture name to any sub-pattern.
//! Trailing children can be left unconstrained with [`Pattern::prefix`]; since
//! that is a property of the child list rather than a sub-pattern, "rest" can
//! only ever appear last.
//!
//! ```
//! use tree_rewriter::pattern::Pattern;
//! use tree_rewriter::tree::NodeKind;
//!
//! // receiver.method(...)
//! let method_call = Pattern::kind(NodeKind::Call).prefix([
//!     Pattern::kind(NodeKind::MemberAccess)
//!         .capture("access")
//!         .prefix([Pattern::kind(NodeKind::Identifier).capture("receiver")]),
//! ]);
//! # let _ = method_call;
//! ```

use crate::tree::{Descendants, NodeId, NodeKind, SyntaxTree};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("capture '{name}' is not bound by this match{}", suggestion_suffix(.suggestion))]
    UnboundCapture {
        name: String,
        suggestion: Option<String>,
    },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

/// Which node kinds a pattern accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindPattern {
    Any,
    Is(NodeKind),
}

impl KindPattern {
    fn accepts(&self, kind: &NodeKind) -> bool {
        match self {
            KindPattern::Any => true,
            KindPattern::Is(expected) => expected == kind,
        }
    }
}

/// Ordered child constraints. With `rest` set, the sub-patterns only have to
/// match a prefix of the children; otherwise the child count must be exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildPatterns {
    items: Vec<Pattern>,
    rest: bool,
}

/// A recursive node-shape pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    kind: KindPattern,
    capture: Option<String>,
    children: Option<ChildPatterns>,
}

impl Pattern {
    /// Match nodes of `kind`, with any children.
    pub fn kind(kind: NodeKind) -> Self {
        Self {
            kind: KindPattern::Is(kind),
            capture: None,
            children: None,
        }
    }

    /// Match any node.
    pub fn any() -> Self {
        Self {
            kind: KindPattern::Any,
            capture: None,
            children: None,
        }
    }

    /// Bind the matched node to `name`.
    pub fn capture(mut self, name: impl Into<String>) -> Self {
        self.capture = Some(name.into());
        self
    }

    /// Require exactly these children, in order.
    pub fn children(mut self, items: impl IntoIterator<Item = Pattern>) -> Self {
        self.children = Some(ChildPatterns {
            items: items.into_iter().collect(),
            rest: false,
        });
        self
    }

    /// Require these leading children, followed by zero or more
    /// unconstrained children.
    pub fn prefix(mut self, items: impl IntoIterator<Item = Pattern>) -> Self {
        self.children = Some(ChildPatterns {
            items: items.into_iter().collect(),
            rest: true,
        });
        self
    }

    /// Match this pattern anchored at `node`.
    pub fn match_node(&self, tree: &SyntaxTree, node: NodeId) -> Option<Bindings> {
        let mut bindings = Bindings::default();
        if self.bind(tree, node, &mut bindings) {
            Some(bindings)
        } else {
            None
        }
    }

    /// Every node under `root` (inclusive) matching this pattern, in preorder.
    pub fn find_all<'a>(&'a self, tree: &'a SyntaxTree, root: NodeId) -> Matches<'a> {
        Matches {
            pattern: self,
            tree,
            nodes: tree.descendants(root),
        }
    }

    fn bind(&self, tree: &SyntaxTree, node: NodeId, bindings: &mut Bindings) -> bool {
        if !self.kind.accepts(tree.kind(node)) {
            return false;
        }

        if let Some(ChildPatterns { items, rest }) = &self.children {
            let children = tree.children(node);
            let count_ok = if *rest {
                children.len() >= items.len()
            } else {
                children.len() == items.len()
            };
            if !count_ok {
                return false;
            }
            for (sub, &child) in items.iter().zip(children) {
                if !sub.bind(tree, child, bindings) {
                    return false;
                }
            }
        }

        if let Some(name) = &self.capture {
            bindings.captures.insert(name.clone(), node);
        }
        true
    }
}

/// Capture name → matched node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    captures: HashMap<String, NodeId>,
}

impl Bindings {
    /// Look up a capture. Referencing a name the pattern did not bind is a
    /// caller error.
    pub fn get(&self, name: &str) -> Result<NodeId, MatchError> {
        self.captures
            .get(name)
            .copied()
            .ok_or_else(|| MatchError::UnboundCapture {
                name: name.to_string(),
                suggestion: self.closest(name),
            })
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    fn closest(&self, name: &str) -> Option<String> {
        self.captures
            .keys()
            .map(|k| (strsim::jaro_winkler(name, k), k))
            .filter(|(score, _)| *score > 0.8)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, k)| k.clone())
    }
}

/// Lazy iterator returned by [`Pattern::find_all`].
pub struct Matches<'a> {
    pattern: &'a Pattern,
    tree: &'a SyntaxTree,
    nodes: Descendants<'a>,
}

impl Iterator for Matches<'_> {
    type Item = (NodeId, Bindings);

    fn next(&mut self) -> Option<Self::Item> {
        for node in self.nodes.by_ref() {
            if let Some(bindings) = self.pattern.match_node(self.tree, node) {
                return Some((node, bindings));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;

    fn p(column: usize) -> Position {
        Position::new(1, column)
    }

    /// `self.complete(); go();`
    fn sample() -> (SyntaxTree, NodeId, NodeId) {
        let mut b = SyntaxTree::builder();
        let block = b.root(NodeKind::Block, p(1), p(25));

        let call = b.child(block, NodeKind::Call, p(1), p(16));
        let access = b.child(call, NodeKind::MemberAccess, p(1), p(14));
        b.set_name(access, "complete");
        let recv = b.child(access, NodeKind::Identifier, p(1), p(5));
        b.set_name(recv, "self");
        let field = b.child(access, NodeKind::Identifier, p(6), p(14));
        b.set_name(field, "complete");
        b.child(call, NodeKind::Arguments, p(14), p(16));

        let go = b.child(block, NodeKind::Call, p(18), p(22));
        let callee = b.child(go, NodeKind::Identifier, p(18), p(20));
        b.set_name(callee, "go");
        b.child(go, NodeKind::Arguments, p(20), p(22));

        (b.finish(), call, go)
    }

    fn method_call() -> Pattern {
        Pattern::kind(NodeKind::Call).prefix([Pattern::kind(NodeKind::MemberAccess)
            .capture("access")
            .prefix([Pattern::kind(NodeKind::Identifier).capture("receiver")])])
    }

    #[test]
    fn anchored_match_binds_captures() {
        let (tree, call, _) = sample();
        let bindings = method_call().match_node(&tree, call).unwrap();

        let receiver = bindings.get("receiver").unwrap();
        assert_eq!(tree.name(receiver), Some("self"));
        let access = bindings.get("access").unwrap();
        assert_eq!(tree.name(access), Some("complete"));
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn kind_mismatch_fails() {
        let (tree, _, go) = sample();
        assert!(method_call().match_node(&tree, go).is_none());
    }

    #[test]
    fn exact_children_require_exact_count() {
        let (tree, call, _) = sample();
        let only_access = Pattern::kind(NodeKind::Call)
            .children([Pattern::kind(NodeKind::MemberAccess)]);
        assert!(only_access.match_node(&tree, call).is_none());

        let both = Pattern::kind(NodeKind::Call).children([
            Pattern::kind(NodeKind::MemberAccess),
            Pattern::kind(NodeKind::Arguments),
        ]);
        assert!(both.match_node(&tree, call).is_some());
    }

    #[test]
    fn empty_children_match_leaves_only() {
        let (tree, call, _) = sample();
        let no_args = Pattern::kind(NodeKind::Arguments).children([]);
        let args = tree.children(call)[1];
        assert!(no_args.match_node(&tree, args).is_some());
        assert!(Pattern::kind(NodeKind::Call)
            .children([])
            .match_node(&tree, call)
            .is_none());
    }

    #[test]
    fn rest_accepts_any_trailing_children() {
        let (tree, call, _) = sample();
        let pattern = Pattern::kind(NodeKind::Call).prefix([]);
        assert!(pattern.match_node(&tree, call).is_some());
    }

    #[test]
    fn find_all_is_preorder_and_includes_root() {
        let (tree, call, go) = sample();
        let root = tree.roots()[0];

        let calls: Vec<_> = Pattern::kind(NodeKind::Call)
            .find_all(&tree, root)
            .map(|(n, _)| n)
            .collect();
        assert_eq!(calls, vec![call, go]);

        let blocks: Vec<_> = Pattern::kind(NodeKind::Block)
            .find_all(&tree, root)
            .map(|(n, _)| n)
            .collect();
        assert_eq!(blocks, vec![root]);
    }

    #[test]
    fn any_matches_every_node() {
        let (tree, _, _) = sample();
        let root = tree.roots()[0];
        assert_eq!(Pattern::any().find_all(&tree, root).count(), tree.len());
    }

    #[test]
    fn unbound_capture_suggests_close_name() {
        let (tree, call, _) = sample();
        let bindings = method_call().match_node(&tree, call).unwrap();

        let err = bindings.get("reciever").unwrap_err();
        assert_eq!(
            err,
            MatchError::UnboundCapture {
                name: "reciever".to_string(),
                suggestion: Some("receiver".to_string()),
            }
        );
        assert!(err.to_string().contains("did you mean 'receiver'"));

        let err = bindings.get("zzz").unwrap_err();
        assert!(matches!(
            err,
            MatchError::UnboundCapture {
                suggestion: None,
                ..
            }
        ));
    }
}
