//! Tree-sitter front-end for Rust sources.
//!
//! Parses with the Rust grammar shipped by ast-grep-language and lowers the
//! concrete syntax tree into the engine's [`SyntaxTree`](crate::tree::SyntaxTree),
//! keeping only named nodes.

pub mod errors;
pub mod parser;

pub use errors::TreeSitterError;
pub use parser::{ParsedSource, RustParser};
