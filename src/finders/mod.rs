//! Finder routines: discover nodes to rewrite and the directive for each.
//!
//! A finder looks at one top-level unit of a tree and returns
//! `(node, directive)` pairs; the driver merges the output of every finder
//! into one [`Registry`](crate::registry::Registry). Finders are plain data
//! deserialized from rule files, so each one is also a rule kind.

pub mod derive_tags;
pub mod method_call;
pub mod rename_params;
pub mod tag_loops;
pub mod template;

use crate::directive::Directive;
use crate::location::LocationError;
use crate::pattern::MatchError;
use crate::sg::AstGrepError;
use crate::source::SourceFile;
use crate::tree::{NodeId, SyntaxTree};
use thiserror::Error;

pub use derive_tags::{DeriveFromMethods, MethodTag};
pub use method_call::MethodCallFinder;
pub use rename_params::RenameParameters;
pub use tag_loops::TagLoops;
pub use template::TemplateFinder;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FindError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("bad node location: {0}")]
    Location(#[from] LocationError),

    #[error(transparent)]
    Pattern(#[from] AstGrepError),
}

/// Directives discovered by one finder over one unit.
pub type Found = Vec<(NodeId, Directive)>;

pub trait Finder {
    /// Rule kind, as written in rule files.
    fn kind(&self) -> &'static str;

    fn find(&self, source: &SourceFile, tree: &SyntaxTree, unit: NodeId)
        -> Result<Found, FindError>;
}

/// Every built-in rule kind with a one-line summary.
pub const BUILTIN_KINDS: &[(&str, &str)] = &[
    (
        method_call::KIND,
        "replace `receiver.method(...)` calls with literal text",
    ),
    (
        rename_params::KIND,
        "rename parameters of functions with a given name",
    ),
    (
        tag_loops::KIND,
        "drop marker calls from loop bodies and tag the loop with an attribute",
    ),
    (
        derive_tags::KIND,
        "add derives to types whose impls define the configured methods",
    ),
    (
        template::KIND,
        "rewrite ast-grep pattern matches through a $NAME template",
    ),
];
