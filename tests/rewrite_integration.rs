//! End-to-end rewriting of real Rust source through the tree-sitter front-end.

use std::fs;
use std::path::PathBuf;
use tree_rewriter::{load_from_str, RewriteError, Rewriter, RustParser};

fn rewriter(rules: &str) -> Rewriter {
    Rewriter::from_config(load_from_str(rules).unwrap())
}

const GPU_RULES: &str = r##"
[meta]
name = "gpu"

[[rules]]
id = "gpu-loops"

[rules.finder]
type = "tag-loops"
marker = "assert_on_gpu"
attribute = "#[gpu_kernel]"
"##;

#[test]
fn tag_loops_deletes_marker_and_tags_loop() {
    let input = "\
fn run(xs: &mut [f32]) {
    for x in xs.iter_mut() {
        assert_on_gpu();
        *x *= 2.0;
    }
}
";
    let rewrite = rewriter(GPU_RULES).rewrite_text(input).unwrap();
    assert_eq!(
        rewrite.text,
        "fn run(xs: &mut [f32]) {\n    #[gpu_kernel]\n    for x in xs.iter_mut() {\n        \n        *x *= 2.0;\n    }\n}\n"
    );
    // The marker deletion is folded into the loop's edit.
    assert_eq!(rewrite.edits.len(), 1);
}

#[test]
fn rewriting_is_source_preserving() {
    let input = "\
// header comment
fn   spaced ( a : i32 )   {   /* keep */  a.complete();  }
";
    let rules = r#"
[[rules]]
id = "finish"
[rules.finder]
type = "method-call"
receiver = "a"
method = "complete"
replacement = "a.finish()"
"#;
    let rewrite = rewriter(rules).rewrite_text(input).unwrap();
    assert_eq!(
        rewrite.text,
        "\
// header comment
fn   spaced ( a : i32 )   {   /* keep */  a.finish();  }
"
    );
}

#[test]
fn derive_and_rename_rules_combine() {
    let input = "\
struct Config;

impl Config {
    fn serialize(&self, out: &mut Vec<u8>) {}
    fn load(reader: R, deserializer: D) -> Self {
        Config
    }
}
";
    let rules = r#"
[[rules]]
id = "io"
[rules.finder]
type = "derive-from-methods"
[[rules.finder.methods]]
method = "serialize"
derive = "Serialize"
[[rules.finder.methods]]
method = "load"
derive = "FromReader"
params = ["reader", "deserializer"]

[[rules]]
id = "short-names"
[rules.finder]
type = "rename-parameters"
function = "serialize"
renames = { out = "buf" }
"#;
    let rewrite = rewriter(rules).rewrite_text(input).unwrap();
    assert_eq!(
        rewrite.text,
        "\
#[derive(Serialize, FromReader)]
struct Config;

impl Config {
    fn serialize(&self, buf: &mut Vec<u8>) {}
    fn load(reader: R, deserializer: D) -> Self {
        Config
    }
}
"
    );
}

#[test]
fn template_rules_use_ast_grep_patterns() {
    let input = "fn main() {\n    let v = compute().unwrap();\n    let w = v.clone().unwrap();\n}\n";
    let rules = r#"
[[rules]]
id = "try"
[rules.finder]
type = "template"
pattern = "$E.unwrap()"
template = "$E?"
"#;
    let rewrite = rewriter(rules).rewrite_text(input).unwrap();
    assert_eq!(
        rewrite.text,
        "fn main() {\n    let v = compute()?;\n    let w = v.clone()?;\n}\n"
    );
}

#[test]
fn nested_template_matches_are_all_rewritten() {
    let rules = r#"
[[rules]]
id = "try"
[rules.finder]
type = "template"
pattern = "$X.unwrap()"
template = "$X?"
"#;
    let rewrite = rewriter(rules)
        .rewrite_text("fn f() { let a = g().unwrap().unwrap(); }\n")
        .unwrap();
    assert_eq!(rewrite.text, "fn f() { let a = g()??; }\n");
    assert_eq!(rewrite.edits.len(), 1);
}

#[test]
fn template_reorders_variadic_arguments() {
    let rules = r#"
[[rules]]
id = "swap"
[rules.finder]
type = "template"
pattern = "pair($A, $$$REST)"
template = "pair($$$REST, $A)"
"#;
    let rewrite = rewriter(rules)
        .rewrite_text("fn f() { pair(1, 2); }\n")
        .unwrap();
    assert_eq!(rewrite.text, "fn f() { pair(2, 1); }\n");
}

#[test]
fn later_rules_win_conflicts() {
    let rules = r#"
[[rules]]
id = "first"
[rules.finder]
type = "method-call"
receiver = "self"
method = "complete"
replacement = "self.one()"

[[rules]]
id = "second"
[rules.finder]
type = "template"
pattern = "self.complete()"
template = "self.two()"
"#;
    let rewrite = rewriter(rules)
        .rewrite_text("fn f() { self.complete(); }")
        .unwrap();
    assert_eq!(rewrite.text, "fn f() { self.two(); }");
    assert_eq!(rewrite.conflicts, 1);
}

#[test]
fn batch_rewrites_files_and_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();

    let loop_src = "fn f() {\n    loop {\n        assert_on_gpu();\n        break;\n    }\n}\n";
    fs::write(a.join("mod.rs"), loop_src).unwrap();
    fs::write(b.join("mod.rs"), "fn g() {}\n").unwrap();
    let missing = dir.path().join("missing.rs");

    let paths: Vec<PathBuf> = vec![a.join("mod.rs"), missing.clone(), b.join("mod.rs")];
    let mut frontends = 0;
    let outcomes = rewriter(GPU_RULES)
        .rewrite_all(&paths, || {
            frontends += 1;
            RustParser::new()
        })
        .unwrap();

    // Two buckets: the second mod.rs cannot share a front-end with the first.
    assert_eq!(frontends, 2);
    assert_eq!(outcomes.len(), 3);

    let first = outcomes[0].result.as_ref().unwrap();
    assert!(first.written);
    assert!(fs::read_to_string(a.join("mod.rs"))
        .unwrap()
        .contains("    #[gpu_kernel]\n    loop {"));

    assert_eq!(outcomes[1].path, missing);
    assert!(matches!(
        outcomes[1].result,
        Err(RewriteError::Read { .. })
    ));

    let untouched = outcomes[2].result.as_ref().unwrap();
    assert!(!untouched.changed());
    assert!(!untouched.written);
}

#[test]
fn guard_rejects_files_outside_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    fs::create_dir_all(&root).unwrap();
    let outside = dir.path().join("outside.rs");
    fs::write(&outside, "fn f() { loop { assert_on_gpu(); } }\n").unwrap();

    let guard = tree_rewriter::WorkspaceGuard::new(&root).unwrap();
    let mut parser = RustParser::new().unwrap();
    let err = rewriter(GPU_RULES)
        .guard(guard)
        .rewrite_file(&mut parser, &outside)
        .unwrap_err();

    assert!(matches!(err, RewriteError::Unsafe(_)));
    assert_eq!(
        fs::read_to_string(&outside).unwrap(),
        "fn f() { loop { assert_on_gpu(); } }\n"
    );
}

#[test]
fn files_with_syntax_errors_are_still_rewritten_around_them() {
    let rules = r#"
[[rules]]
id = "finish"
[rules.finder]
type = "method-call"
receiver = "self"
method = "complete"
replacement = "self.finish()"
"#;
    let rewrite = rewriter(rules)
        .rewrite_text("fn ok() { self.complete(); }\nfn broken( {\n")
        .unwrap();
    assert!(rewrite.text.starts_with("fn ok() { self.finish(); }"));
}
