//! Thread-local compilation cache for ast-grep patterns.
//!
//! Template rules are run once per file, so the same pattern string is
//! compiled over and over across a batch. Compiled patterns are kept per
//! thread, capped at 256 entries; the cache is cleared when full.

use crate::sg::errors::AstGrepError;
use ast_grep_core::Pattern;
use ast_grep_language::SupportLang;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Keyed by "<lang>:<pattern>" so the same text in two languages never collides.
    static PATTERN_CACHE: RefCell<HashMap<String, Pattern>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled pattern from cache, or compile and cache it.
///
/// Invalid patterns are reported, never cached.
pub fn get_or_compile_pattern(pattern_str: &str, lang: SupportLang) -> Result<Pattern, AstGrepError> {
    let cache_key = format!("{lang:?}:{pattern_str}");

    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(p) = cache.get(&cache_key) {
            return Ok(p.clone());
        }

        let compiled =
            Pattern::try_new(pattern_str, lang).map_err(|e| AstGrepError::InvalidPattern {
                pattern: pattern_str.to_string(),
                message: e.to_string(),
            })?;

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        cache.insert(cache_key, compiled.clone());
        Ok(compiled)
    })
}

/// Clear the pattern cache.
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Number of compiled patterns held by this thread.
pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sg::rust;

    #[test]
    fn repeated_patterns_compile_once() {
        clear_cache();
        get_or_compile_pattern("$A.clone()", rust()).unwrap();
        get_or_compile_pattern("$A.clone()", rust()).unwrap();
        get_or_compile_pattern("$A.to_owned()", rust()).unwrap();
        assert_eq!(cache_size(), 2);
    }
}
