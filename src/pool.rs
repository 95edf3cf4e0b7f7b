//! Thread-local parser pooling.
//!
//! One-off rewrites of in-memory text reuse a per-thread [`RustParser`]
//! instead of building a new one per call. Batch rewriting through the driver
//! does not use the pool: each bucket gets its own front-end.

use crate::ts::{RustParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static RUST_PARSER: RefCell<Option<RustParser>> = const { RefCell::new(None) };
}

/// Execute `f` with this thread's pooled parser, creating it on first use.
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut RustParser) -> R,
{
    RUST_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let parser = match slot.as_mut() {
            Some(parser) => parser,
            None => slot.insert(RustParser::new()?),
        };
        Ok(f(parser))
    })
}
