use crate::directive::Directive;
use crate::finders::{FindError, Finder, Found};
use crate::pattern::Pattern;
use crate::source::SourceFile;
use crate::tree::{NodeId, NodeKind, SyntaxTree};
use serde::Deserialize;

pub const KIND: &str = "method-call";

/// Replaces every `receiver.method(...)` call with `replacement`.
///
/// Only plain identifier receivers (including `self`) are considered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodCallFinder {
    pub receiver: String,
    pub method: String,
    pub replacement: String,
}

fn method_call() -> Pattern {
    Pattern::kind(NodeKind::Call).prefix([Pattern::kind(NodeKind::MemberAccess)
        .capture("access")
        .prefix([Pattern::kind(NodeKind::Identifier).capture("receiver")])])
}

impl Finder for MethodCallFinder {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn find(&self, _: &SourceFile, tree: &SyntaxTree, unit: NodeId) -> Result<Found, FindError> {
        let pattern = method_call();
        let mut found = Vec::new();

        for (call, bindings) in pattern.find_all(tree, unit) {
            let access = bindings.get("access")?;
            let receiver = bindings.get("receiver")?;
            if tree.name(access) == Some(self.method.as_str())
                && tree.name(receiver) == Some(self.receiver.as_str())
            {
                found.push((call, Directive::literal(self.replacement.as_str())));
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::RustParser;

    fn run(finder: &MethodCallFinder, text: &str) -> Vec<String> {
        let source = SourceFile::new(text);
        let mut parser = RustParser::new().unwrap();
        let tree = parser.parse_with_source(text).unwrap().to_syntax_tree();
        finder
            .find(&source, &tree, tree.roots()[0])
            .unwrap()
            .into_iter()
            .map(|(node, _)| source.node_text(&tree, node).unwrap().to_string())
            .collect()
    }

    fn complete_finder() -> MethodCallFinder {
        MethodCallFinder {
            receiver: "self".to_string(),
            method: "complete".to_string(),
            replacement: "self.finish()".to_string(),
        }
    }

    #[test]
    fn finds_self_method_calls() {
        let text = "impl W {\n    fn go(&mut self) {\n        self.complete();\n        other.complete();\n        self.reset(1);\n    }\n}\n";
        assert_eq!(run(&complete_finder(), text), vec!["self.complete()"]);
    }

    #[test]
    fn ignores_chained_receivers() {
        let text = "fn f() { self.inner.complete(); }";
        assert!(run(&complete_finder(), text).is_empty());
    }
}
