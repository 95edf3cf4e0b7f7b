//! Rust language handle for ast-grep.
//!
//! The same grammar backs the tree-sitter front-end, so byte ranges reported
//! by ast-grep line up with the spans of lowered tree nodes.

pub use ast_grep_language::SupportLang;

/// Get the Rust language for ast-grep operations.
pub fn rust() -> SupportLang {
    SupportLang::Rust
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast_grep_core::AstGrep;

    #[test]
    fn root_kind_matches_front_end() {
        let sg = AstGrep::new("fn main() {}", rust());
        assert_eq!(sg.root().kind(), "source_file");
    }

    #[test]
    fn method_call_metavars() {
        let sg = AstGrep::new("let a = foo.clone(); let b = bar.to_string();", rust());
        let root = sg.root();

        assert_eq!(root.find_all("$EXPR.clone()").count(), 1);
        assert_eq!(root.find_all("$EXPR.to_string()").count(), 1);
        assert_eq!(root.find_all("$EXPR.into()").count(), 0);
    }

    #[test]
    fn variadic_arguments() {
        let sg = AstGrep::new("fn f() { log(1, 2, 3); log(); }", rust());
        assert_eq!(sg.root().find_all("log($$$ARGS)").count(), 2);
    }
}
