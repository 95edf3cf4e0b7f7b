use crate::driver::Frontend;
use crate::location::Position;
use crate::source::SourceFile;
use crate::tree::{NodeId, NodeKind, SyntaxTree, TreeBuilder};
use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use tracing::warn;
use tree_sitter::{Node, Parser, Point, Tree};

/// Tree-sitter parser wrapper for Rust source code.
pub struct RustParser {
    parser: Parser,
}

impl RustParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        // Get the tree-sitter Language from ast-grep-language
        let ts_lang = SupportLang::Rust.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| TreeSitterError::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed)
    }

    /// Parse source code and return the tree along with the source.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, TreeSitterError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

impl Frontend for RustParser {
    type Error = TreeSitterError;

    fn build_tree(&mut self, source: &SourceFile) -> Result<SyntaxTree, TreeSitterError> {
        let parsed = self.parse_with_source(source.text())?;
        if parsed.has_errors() {
            warn!(
                path = ?source.path(),
                errors = parsed.error_count(),
                "source has syntax errors, rewriting around them"
            );
        }
        Ok(parsed.to_syntax_tree())
    }
}

/// A parsed source file with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    /// Get the root node of the tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Number of ERROR and MISSING nodes in the tree.
    pub fn error_count(&self) -> usize {
        count_error_nodes(self.tree.root_node())
    }

    /// Extract text for a node's byte range.
    pub fn node_text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }

    /// Lower the concrete tree into a [`SyntaxTree`] of named nodes.
    pub fn to_syntax_tree(&self) -> SyntaxTree {
        let mut builder = SyntaxTree::builder();
        let root = self.root_node();
        let id = builder.root(
            NodeKind::from_grammar(root.kind()),
            position(root.start_position()),
            position(root.end_position()),
        );
        self.lower_children(&mut builder, id, root);
        builder.finish()
    }

    fn lower_children(&self, builder: &mut TreeBuilder, parent: NodeId, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let kind = NodeKind::from_grammar(child.kind());
            let named = kind.is_named();
            let id = builder.child(
                parent,
                kind,
                position(child.start_position()),
                position(child.end_position()),
            );
            if named {
                if let Some(name) = self.name_of(child) {
                    builder.set_name(id, name);
                }
            }
            self.lower_children(builder, id, child);
        }
    }

    /// Name capability for the node kinds that carry one.
    fn name_of(&self, node: Node<'_>) -> Option<&'a str> {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "self" => {
                Some(self.node_text(node))
            }
            "self_parameter" => Some("self"),
            "field_expression" => node.child_by_field_name("field").map(|f| self.node_text(f)),
            "parameter" => node
                .child_by_field_name("pattern")
                .map(|p| self.node_text(p)),
            "impl_item" => node
                .child_by_field_name("type")
                .map(|t| strip_generics(self.node_text(t))),
            _ => node
                .child_by_field_name("name")
                .map(|n| self.node_text(n)),
        }
    }
}

/// `Foo<T>` → `Foo`.
fn strip_generics(type_text: &str) -> &str {
    type_text
        .split_once('<')
        .map_or(type_text, |(head, _)| head)
        .trim()
}

/// Tree-sitter points are 0-based; engine positions are 1-based.
fn position(point: Point) -> Position {
    Position::new(point.row + 1, point.column + 1)
}

fn count_error_nodes(node: Node<'_>) -> usize {
    let own = usize::from(node.is_error() || node.is_missing());
    if !node.has_error() {
        return own;
    }

    let mut cursor = node.walk();
    let nested: usize = node
        .children(&mut cursor)
        .map(count_error_nodes)
        .sum();
    own + nested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    fn lower(source: &str) -> SyntaxTree {
        let mut parser = RustParser::new().unwrap();
        parser.parse_with_source(source).unwrap().to_syntax_tree()
    }

    #[test]
    fn parse_valid_rust() {
        let mut parser = RustParser::new().unwrap();
        let source = "fn main() { println!(\"hello\"); }";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(!parsed.has_errors());
        assert_eq!(parsed.error_count(), 0);
        assert_eq!(parsed.root_node().kind(), "source_file");
    }

    #[test]
    fn parse_invalid_rust() {
        let mut parser = RustParser::new().unwrap();
        let parsed = parser.parse_with_source("fn main( { }").unwrap();

        assert!(parsed.has_errors());
        assert!(parsed.error_count() > 0);
    }

    #[test]
    fn lowering_keeps_one_unit_with_items() {
        let tree = lower("fn a() {}\nstruct B;\n");
        assert_eq!(tree.roots().len(), 1);

        let root = tree.roots()[0];
        assert_eq!(tree.kind(root), &NodeKind::Other("source_file".to_string()));
        let kinds: Vec<_> = tree.children(root).iter().map(|&c| tree.kind(c)).collect();
        assert_eq!(kinds, vec![&NodeKind::Function, &NodeKind::Aggregate]);
    }

    #[test]
    fn lowered_spans_match_source_text() {
        let text = "fn helper() -> i32 {\n    compute(1, 2)\n}\n";
        let tree = lower(text);
        let source = SourceFile::new(text);

        let (call, _) = Pattern::kind(NodeKind::Call)
            .find_all(&tree, tree.roots()[0])
            .next()
            .unwrap();
        assert_eq!(source.node_text(&tree, call).unwrap(), "compute(1, 2)");

        let (func, _) = Pattern::kind(NodeKind::Function)
            .find_all(&tree, tree.roots()[0])
            .next()
            .unwrap();
        assert_eq!(tree.name(func), Some("helper"));
        assert_eq!(
            source.node_text(&tree, func).unwrap(),
            "fn helper() -> i32 {\n    compute(1, 2)\n}"
        );
    }

    #[test]
    fn names_for_methods_and_impls() {
        let tree = lower("impl<T> Wrapper<T> {\n    fn get(&self, index: usize) {}\n}\n");
        let root = tree.roots()[0];

        let (imp, _) = Pattern::kind(NodeKind::Impl)
            .find_all(&tree, root)
            .next()
            .unwrap();
        assert_eq!(tree.name(imp), Some("Wrapper"));

        let params: Vec<_> = Pattern::kind(NodeKind::Parameter)
            .find_all(&tree, root)
            .map(|(p, _)| tree.name(p).unwrap_or_default().to_string())
            .collect();
        assert_eq!(params, vec!["self", "index"]);
    }

    #[test]
    fn member_access_is_named_by_field() {
        let tree = lower("fn f() { self.complete(); }");
        let (access, _) = Pattern::kind(NodeKind::MemberAccess)
            .find_all(&tree, tree.roots()[0])
            .next()
            .unwrap();
        assert_eq!(tree.name(access), Some("complete"));
    }

    #[test]
    fn strip_generics_keeps_head() {
        assert_eq!(strip_generics("Foo<T>"), "Foo");
        assert_eq!(strip_generics("Bar"), "Bar");
    }
}
