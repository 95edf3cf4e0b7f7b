use crate::directive::Transform;
use crate::finders::{FindError, Finder, Found};
use crate::source::SourceFile;
use crate::tree::{NodeId, NodeKind, SyntaxTree};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const KIND: &str = "rename-parameters";

/// Renames parameters of every function called `function`.
///
/// Only the parameter declaration is rewritten; uses inside the body are left
/// alone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenameParameters {
    pub function: String,
    /// Old parameter name → new name.
    pub renames: BTreeMap<String, String>,
}

impl Finder for RenameParameters {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn find(&self, _: &SourceFile, tree: &SyntaxTree, unit: NodeId) -> Result<Found, FindError> {
        let mut found = Vec::new();

        let functions = tree
            .descendants(unit)
            .filter(|&n| *tree.kind(n) == NodeKind::Function)
            .filter(|&n| tree.name(n) == Some(self.function.as_str()));

        for function in functions {
            for params in tree.children_of_kind(function, &NodeKind::Parameters) {
                for param in tree.children_of_kind(params, &NodeKind::Parameter) {
                    let Some(old) = tree.name(param) else {
                        continue;
                    };
                    if let Some(new) = self.renames.get(old) {
                        found.push((param, Transform::rename_ident(old, new.as_str()).into()));
                    }
                }
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Directive;
    use crate::ts::RustParser;

    fn finder() -> RenameParameters {
        RenameParameters {
            function: "visit".to_string(),
            renames: BTreeMap::from([
                ("node".to_string(), "n".to_string()),
                ("ctx".to_string(), "cx".to_string()),
            ]),
        }
    }

    #[test]
    fn renames_matching_parameters_only() {
        let text = "fn visit(node: &Node, depth: usize, ctx: &mut Ctx) {}\nfn other(node: &Node) {}\n";
        let source = SourceFile::new(text);
        let mut parser = RustParser::new().unwrap();
        let tree = parser.parse_with_source(text).unwrap().to_syntax_tree();

        let found = finder().find(&source, &tree, tree.roots()[0]).unwrap();
        let texts: Vec<_> = found
            .iter()
            .map(|(n, _)| source.node_text(&tree, *n).unwrap())
            .collect();
        assert_eq!(texts, vec!["node: &Node", "ctx: &mut Ctx"]);
        assert_eq!(
            found[0].1,
            Directive::Transform(Transform::rename_ident("node", "n"))
        );
    }

    #[test]
    fn self_parameter_is_never_renamed() {
        let text = "impl A { fn visit(&self, node: u8) {} }";
        let source = SourceFile::new(text);
        let mut parser = RustParser::new().unwrap();
        let tree = parser.parse_with_source(text).unwrap().to_syntax_tree();

        let found = finder().find(&source, &tree, tree.roots()[0]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(source.node_text(&tree, found[0].0).unwrap(), "node: u8");
    }
}
