use crate::directive::{Directive, Transform};
use crate::finders::{FindError, Finder, Found};
use crate::source::SourceFile;
use crate::tree::{NodeId, NodeKind, SyntaxTree};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

pub const KIND: &str = "derive-from-methods";

/// A method whose presence in an `impl` earns the implementing type a derive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodTag {
    pub method: String,
    pub derive: String,
    /// When non-empty, the method's trailing non-`self` parameters must have
    /// exactly these names.
    #[serde(default)]
    pub params: Vec<String>,
}

/// Adds derives to types based on the methods their impls define.
///
/// Derives are emitted in the order the tags are listed. If every tag applies
/// and `combined` is set, the single combined derive is used instead. An
/// existing `#[derive(...)]` on the type is extended in place; otherwise a new
/// attribute line is added above the type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeriveFromMethods {
    pub methods: Vec<MethodTag>,
    #[serde(default)]
    pub combined: Option<String>,
}

impl DeriveFromMethods {
    fn matches(&self, tag: &MethodTag, tree: &SyntaxTree, function: NodeId) -> bool {
        if tree.name(function) != Some(tag.method.as_str()) {
            return false;
        }
        if tag.params.is_empty() {
            return true;
        }

        let names: Vec<&str> = tree
            .children_of_kind(function, &NodeKind::Parameters)
            .flat_map(|params| tree.children_of_kind(params, &NodeKind::Parameter))
            .filter_map(|param| tree.name(param))
            .filter(|&name| name != "self")
            .collect();
        names.len() >= tag.params.len()
            && names[names.len() - tag.params.len()..]
                .iter()
                .zip(&tag.params)
                .all(|(have, want)| *have == want.as_str())
    }

    /// Tag indices (into `methods`) per implementing type name.
    fn collect_tags(&self, tree: &SyntaxTree, unit: NodeId) -> HashMap<String, BTreeSet<usize>> {
        let mut tags: HashMap<String, BTreeSet<usize>> = HashMap::new();

        for imp in tree.descendants(unit) {
            if *tree.kind(imp) != NodeKind::Impl {
                continue;
            }
            let Some(type_name) = tree.name(imp) else {
                continue;
            };
            for body in tree.children_of_kind(imp, &NodeKind::Block) {
                for function in tree.children_of_kind(body, &NodeKind::Function) {
                    for (i, tag) in self.methods.iter().enumerate() {
                        if self.matches(tag, tree, function) {
                            tags.entry(type_name.to_string()).or_default().insert(i);
                        }
                    }
                }
            }
        }

        tags
    }

    fn derives(&self, tags: &BTreeSet<usize>) -> Vec<&str> {
        if let Some(combined) = &self.combined {
            if tags.len() == self.methods.len() {
                return vec![combined.as_str()];
            }
        }
        tags.iter().map(|&i| self.methods[i].derive.as_str()).collect()
    }
}

/// The `#[derive(...)]` attribute directly attached to `item`, skipping other
/// attributes and comments.
fn existing_derive(source: &SourceFile, tree: &SyntaxTree, item: NodeId) -> Result<Option<NodeId>, FindError> {
    let mut cursor = tree.prev_sibling(item);
    while let Some(prev) = cursor {
        match tree.kind(prev) {
            NodeKind::Attribute => {
                if is_derive(source.node_text(tree, prev)?) {
                    return Ok(Some(prev));
                }
            }
            NodeKind::Other(kind) if kind == "line_comment" || kind == "block_comment" => {}
            _ => break,
        }
        cursor = tree.prev_sibling(prev);
    }
    Ok(None)
}

fn is_derive(attribute: &str) -> bool {
    attribute
        .strip_prefix("#[")
        .is_some_and(|rest| rest.trim_start().starts_with("derive("))
}

/// Insert `derives` into an existing `#[derive(...)]`, skipping any already
/// listed. Returns `None` when nothing would change.
fn extend_derive(attribute: &str, derives: &[&str]) -> Option<String> {
    let open = attribute.find('(')?;
    let close = attribute.rfind(')')?;
    if close < open {
        return None;
    }
    let list = &attribute[open + 1..close];
    let present: Vec<&str> = list.split(',').map(str::trim).collect();
    let missing: Vec<&str> = derives
        .iter()
        .copied()
        .filter(|d| !present.contains(d))
        .collect();
    if missing.is_empty() {
        return None;
    }

    let head = list.trim_end().trim_end_matches(',').trim_end();
    let joined = missing.join(", ");
    let new_list = if head.trim().is_empty() {
        joined
    } else {
        format!("{head}, {joined}")
    };
    Some(format!(
        "{}{}{}",
        &attribute[..=open],
        new_list,
        &attribute[close..]
    ))
}

impl Finder for DeriveFromMethods {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn find(&self, source: &SourceFile, tree: &SyntaxTree, unit: NodeId) -> Result<Found, FindError> {
        let tags = self.collect_tags(tree, unit);
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for item in tree.descendants(unit) {
            if *tree.kind(item) != NodeKind::Aggregate {
                continue;
            }
            let Some(item_tags) = tree.name(item).and_then(|name| tags.get(name)) else {
                continue;
            };
            let derives = self.derives(item_tags);

            match existing_derive(source, tree, item)? {
                Some(attr) => {
                    if let Some(text) = extend_derive(source.node_text(tree, attr)?, &derives) {
                        found.push((attr, Directive::Literal(text)));
                    }
                }
                None => {
                    let line = format!("#[derive({})]", derives.join(", "));
                    let indent = source.indent_of(tree, item)?;
                    found.push((item, Transform::prefix(line, indent).into()));
                }
            }
        }

        Ok(found)
    }
}
