//! ast-grep integration for pattern-based discovery of rewrite targets.
//!
//! Patterns use ast-grep's metavariable syntax (`$NAME`, `$$$ARGS`, `$_`).
//! Matches are reported as byte ranges plus captured text; the template
//! finder maps them back onto tree nodes.

pub mod errors;
pub mod lang;
pub mod matcher;

pub use errors::AstGrepError;
pub use lang::{rust, SupportLang};
pub use matcher::{fill_template, template_vars, Capture, PatternMatch, PatternMatcher};
