//! Node → directive mapping filled in by finder routines.

use crate::directive::Directive;
use crate::tree::NodeId;
use std::collections::HashMap;
use tracing::debug;

/// Directives keyed by node identity.
///
/// Registration order decides conflicts: registering a second directive for a
/// node replaces the first. Replacements are counted and logged so that
/// overlapping rules can be diagnosed.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: HashMap<NodeId, Directive>,
    conflicts: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `directive` for `node`, returning the directive it replaced.
    pub fn register(&mut self, node: NodeId, directive: Directive) -> Option<Directive> {
        let previous = self.entries.insert(node, directive);
        if let Some(prev) = &previous {
            self.conflicts += 1;
            debug!(%node, replaced = ?prev, "directive conflict, later registration wins");
        } else {
            debug!(%node, "directive registered");
        }
        previous
    }

    pub fn get(&self, node: NodeId) -> Option<&Directive> {
        self.entries.get(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many registrations overwrote an earlier directive.
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }
}

impl Extend<(NodeId, Directive)> for Registry {
    fn extend<I: IntoIterator<Item = (NodeId, Directive)>>(&mut self, iter: I) {
        for (node, directive) in iter {
            self.register(node, directive);
        }
    }
}

impl FromIterator<(NodeId, Directive)> for Registry {
    fn from_iter<I: IntoIterator<Item = (NodeId, Directive)>>(iter: I) -> Self {
        let mut registry = Registry::new();
        registry.extend(iter);
        registry
    }
}
