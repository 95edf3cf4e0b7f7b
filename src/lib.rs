//! Tree Rewriter: source-preserving, tree-guided rewriting for Rust
//!
//! Rewrites are driven by a syntax tree but expressed as edits to the original
//! text, so everything a rule does not touch (comments, spacing, formatting)
//! survives byte for byte.
//!
//! # Architecture
//!
//! Finder routines ([`finders`]) walk a [`SyntaxTree`] and register a
//! [`Directive`] for each node they want changed: either a literal
//! replacement, or a [`Transform`] of the node's text after its descendants
//! have been rewritten. The [`Compositor`] walks the tree postorder and folds
//! nested directives into one flat list of non-overlapping byte-span
//! [`Edit`]s, and [`apply_edits`] splices them into the original buffer.
//!
//! # Example
//!
//! ```no_run
//! use tree_rewriter::finders::MethodCallFinder;
//! use tree_rewriter::Rewriter;
//!
//! let rewriter = Rewriter::new().rule(
//!     "finish",
//!     MethodCallFinder {
//!         receiver: "self".to_string(),
//!         method: "complete".to_string(),
//!         replacement: "self.finish()".to_string(),
//!     },
//! );
//!
//! let rewrite = rewriter.rewrite_text("fn f() { self.complete(); }")?;
//! assert_eq!(rewrite.text, "fn f() { self.finish(); }");
//! # Ok::<(), tree_rewriter::RewriteError>(())
//! ```

pub mod cache;
pub mod compose;
pub mod config;
pub mod directive;
pub mod driver;
pub mod edit;
pub mod finders;
pub mod location;
pub mod pattern;
pub mod pool;
pub mod registry;
pub mod safety;
pub mod sg;
pub mod source;
pub mod tree;
pub mod ts;

// Re-exports
pub use compose::{ComposeError, Compositor};
pub use config::{load_from_path, load_from_str, ConfigError, RewriteConfig};
pub use directive::{Directive, Hole, Splice, Transform, TransformError};
pub use driver::{
    buckets, FileOutcome, FileReport, Frontend, Rewrite, RewriteError, Rewriter, Rule,
};
pub use edit::{apply_edits, Edit, EditError, EditVerification};
pub use finders::{FindError, Finder};
pub use location::{LocationError, LocationIndex, Position, Span};
pub use pattern::{Bindings, MatchError, Pattern};
pub use registry::Registry;
pub use safety::{SafetyError, WorkspaceGuard};
pub use source::SourceFile;
pub use tree::{NodeId, NodeKind, SyntaxTree};
pub use ts::{RustParser, TreeSitterError};
