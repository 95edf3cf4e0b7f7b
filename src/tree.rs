//! Arena-backed syntax tree consumed by the rewriting engine.
//!
//! The engine never creates or destroys nodes while rewriting; a front-end
//! (see [`crate::ts`]) or a test builds the tree once per file and the rest of
//! the pipeline only reads it. Node identity is the arena index, which is what
//! the replacement registry keys on.

use crate::location::Position;
use serde::Serialize;
use std::fmt;

/// Stable identity of a node within one [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Call,
    Arguments,
    MemberAccess,
    Identifier,
    Parameter,
    Parameters,
    Function,
    Loop,
    Aggregate,
    Impl,
    Block,
    ExpressionStatement,
    Attribute,
    /// Any grammar kind without a dedicated variant, by its grammar name.
    Other(String),
}

impl NodeKind {
    /// Map a tree-sitter-rust node kind onto a [`NodeKind`].
    pub fn from_grammar(kind: &str) -> Self {
        match kind {
            "call_expression" | "macro_invocation" => NodeKind::Call,
            "arguments" | "token_tree" => NodeKind::Arguments,
            "field_expression" => NodeKind::MemberAccess,
            "identifier" | "field_identifier" | "type_identifier" | "self" => {
                NodeKind::Identifier
            }
            "parameter" | "self_parameter" => NodeKind::Parameter,
            "parameters" => NodeKind::Parameters,
            "function_item" => NodeKind::Function,
            "for_expression" | "while_expression" | "loop_expression" => NodeKind::Loop,
            "struct_item" | "enum_item" | "union_item" => NodeKind::Aggregate,
            "impl_item" => NodeKind::Impl,
            "block" | "declaration_list" => NodeKind::Block,
            "expression_statement" => NodeKind::ExpressionStatement,
            "attribute_item" => NodeKind::Attribute,
            other => NodeKind::Other(other.to_string()),
        }
    }

    /// Whether nodes of this kind carry a name capability.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            NodeKind::Identifier
                | NodeKind::MemberAccess
                | NodeKind::Parameter
                | NodeKind::Function
                | NodeKind::Aggregate
                | NodeKind::Impl
        )
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    start: Position,
    end: Position,
    name: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An immutable tree, possibly with several top-level units.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    roots: Vec<NodeId>,
}

impl SyntaxTree {
    pub fn builder() -> TreeBuilder {
        TreeBuilder::default()
    }

    /// Top-level units in declaration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Ordered children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Start and end positions (end exclusive).
    pub fn location(&self, id: NodeId) -> (Position, Position) {
        let node = self.node(id);
        (node.start, node.end)
    }

    /// Name capability: present for named kinds when the front-end found one.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id);
        if node.kind.is_named() {
            node.name.as_deref()
        } else {
            None
        }
    }

    /// The sibling immediately before `id`, if any.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = match self.parent(id) {
            Some(parent) => self.children(parent),
            None => &self.roots,
        };
        let pos = siblings.iter().position(|&s| s == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// Children of `id` having the given kind.
    pub fn children_of_kind<'a>(
        &'a self,
        id: NodeId,
        kind: &'a NodeKind,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.kind(child) == kind)
    }

    /// Preorder traversal of `id` and all its descendants.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// Lazy preorder iterator returned by [`SyntaxTree::descendants`].
pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Incremental tree construction. Children are appended in sibling order.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: SyntaxTree,
}

impl TreeBuilder {
    /// Add a new top-level unit.
    pub fn root(&mut self, kind: NodeKind, start: Position, end: Position) -> NodeId {
        let id = self.push(kind, start, end, None);
        self.tree.roots.push(id);
        id
    }

    /// Append a child to `parent`.
    pub fn child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        start: Position,
        end: Position,
    ) -> NodeId {
        let id = self.push(kind, start, end, Some(parent));
        self.tree.nodes[parent.index()].children.push(id);
        id
    }

    /// Attach a name to an already-added node.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> &mut Self {
        self.tree.nodes[id.index()].name = Some(name.into());
        self
    }

    pub fn finish(self) -> SyntaxTree {
        self.tree
    }

    fn push(
        &mut self,
        kind: NodeKind,
        start: Position,
        end: Position,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.tree.nodes.len() as u32);
        self.tree.nodes.push(NodeData {
            kind,
            start,
            end,
            name: None,
            parent,
            children: Vec::new(),
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(column: usize) -> Position {
        Position::new(1, column)
    }

    fn call_tree() -> (SyntaxTree, NodeId, NodeId, NodeId) {
        // f(1, 2)
        let mut b = SyntaxTree::builder();
        let call = b.root(NodeKind::Call, pos(1), pos(8));
        let callee = b.child(call, NodeKind::Identifier, pos(1), pos(2));
        b.set_name(callee, "f");
        let args = b.child(call, NodeKind::Arguments, pos(2), pos(8));
        (b.finish(), call, callee, args)
    }

    #[test]
    fn builder_links_parents_and_children() {
        let (tree, call, callee, args) = call_tree();
        assert_eq!(tree.roots(), &[call]);
        assert_eq!(tree.children(call), &[callee, args]);
        assert_eq!(tree.parent(args), Some(call));
        assert_eq!(tree.parent(call), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn name_is_a_capability_of_named_kinds() {
        let mut b = SyntaxTree::builder();
        let args = b.root(NodeKind::Arguments, pos(1), pos(3));
        b.set_name(args, "ignored");
        let ident = b.child(args, NodeKind::Identifier, pos(2), pos(3));
        b.set_name(ident, "x");
        let tree = b.finish();

        assert_eq!(tree.name(args), None);
        assert_eq!(tree.name(ident), Some("x"));
    }

    #[test]
    fn descendants_are_preorder() {
        let mut b = SyntaxTree::builder();
        let root = b.root(NodeKind::Block, pos(1), pos(20));
        let a = b.child(root, NodeKind::ExpressionStatement, pos(2), pos(8));
        let a1 = b.child(a, NodeKind::Call, pos(2), pos(7));
        let c = b.child(root, NodeKind::ExpressionStatement, pos(9), pos(15));
        let tree = b.finish();

        let order: Vec<_> = tree.descendants(root).collect();
        assert_eq!(order, vec![root, a, a1, c]);
    }

    #[test]
    fn prev_sibling_walks_back() {
        let (tree, call, callee, args) = call_tree();
        assert_eq!(tree.prev_sibling(args), Some(callee));
        assert_eq!(tree.prev_sibling(callee), None);
        assert_eq!(tree.prev_sibling(call), None);
    }

    #[test]
    fn grammar_kind_mapping() {
        assert_eq!(NodeKind::from_grammar("call_expression"), NodeKind::Call);
        assert_eq!(NodeKind::from_grammar("for_expression"), NodeKind::Loop);
        assert_eq!(NodeKind::from_grammar("struct_item"), NodeKind::Aggregate);
        assert_eq!(
            NodeKind::from_grammar("let_declaration"),
            NodeKind::Other("let_declaration".to_string())
        );
    }
}
