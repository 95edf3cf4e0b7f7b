use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tree_rewriter::config::{load_from_path, FinderSpec};
use tree_rewriter::edit::read_source;
use tree_rewriter::finders::BUILTIN_KINDS;
use tree_rewriter::{Edit, Frontend, RustParser, Rewriter, SourceFile, WorkspaceGuard};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "tree-rewriter")]
#[command(about = "Source-preserving, tree-guided rewriting for Rust", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite files in place
    Rewrite {
        /// Files or directories (directories are searched for *.rs files)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Rule file (TOML)
        #[arg(short, long)]
        rules: PathBuf,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Refuse to touch files outside this directory
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Print the edit list for one file as JSON, without writing
    Plan {
        file: PathBuf,

        /// Rule file (TOML)
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// List built-in rule kinds, or the rules in a rule file
    Rules {
        /// Rule file (TOML)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Rewrite {
            paths,
            rules,
            dry_run,
            diff,
            root,
        } => cmd_rewrite(&paths, &rules, dry_run, diff, root),

        Commands::Plan { file, rules } => cmd_plan(&file, &rules),

        Commands::Rules { rules } => cmd_rules(rules.as_deref()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Expand directories into the `*.rs` files below them, skipping build
/// output and hidden directories. Explicit files are kept as given.
fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !is_skipped_dir(entry.file_name().to_str().unwrap_or_default())
            });
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("rs")
            {
                files.push(entry.into_path());
            }
        }
    }

    Ok(files)
}

fn is_skipped_dir(name: &str) -> bool {
    name == "target" || name.starts_with('.')
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_rewrite(
    paths: &[PathBuf],
    rules: &Path,
    dry_run: bool,
    show_diff: bool,
    root: Option<PathBuf>,
) -> Result<()> {
    let config = load_from_path(rules)?;
    let mut rewriter = Rewriter::from_config(config).dry_run(dry_run);
    let mut files = collect_sources(paths)?;
    if let Some(root) = root {
        rewriter = rewriter.guard(WorkspaceGuard::new(&root)?);
        // The guard resolves relative paths against the root, not the cwd.
        let cwd = std::env::current_dir()?;
        files = files.into_iter().map(|f| cwd.join(f)).collect();
    }

    if files.is_empty() {
        println!("{}", "No Rust files found".yellow());
        return Ok(());
    }
    if dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
    }

    let outcomes = rewriter.rewrite_all(&files, RustParser::new)?;

    let mut total_changed = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;

    for outcome in outcomes {
        match outcome.result {
            Ok(report) if report.changed() => {
                let verb = if report.written { "Rewrote" } else { "Would rewrite" };
                println!(
                    "{} {} {} ({} edits)",
                    "✓".green(),
                    verb,
                    report.path.display(),
                    report.edits
                );
                if report.conflicts > 0 {
                    println!(
                        "  {}",
                        format!("{} directive conflicts, later rules won", report.conflicts)
                            .yellow()
                    );
                }
                if show_diff {
                    display_diff(&report.path, &report.original, &report.rewritten);
                }
                total_changed += 1;
            }
            Ok(report) => {
                println!("{} {}: unchanged", "⊙".dimmed(), report.path.display());
                total_unchanged += 1;
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), outcome.path.display(), e);
                total_failed += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    let changed_label = if dry_run { "would change" } else { "changed" };
    println!("  {} {}", format!("{}", total_changed).green(), changed_label);
    println!("  {} unchanged", format!("{}", total_unchanged).dimmed());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Serialize)]
struct Plan<'a> {
    file: &'a Path,
    directives: usize,
    conflicts: usize,
    edits: &'a [Edit],
}

fn cmd_plan(file: &Path, rules: &Path) -> Result<()> {
    let config = load_from_path(rules)?;
    let rewriter = Rewriter::from_config(config);

    let text = read_source(file).with_context(|| format!("failed to read {}", file.display()))?;
    let source = SourceFile::with_path(file, text);
    let tree = RustParser::new()?.build_tree(&source)?;
    let rewrite = rewriter.plan(&source, &tree)?;

    let plan = Plan {
        file,
        directives: rewrite.directives,
        conflicts: rewrite.conflicts,
        edits: &rewrite.edits,
    };
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn cmd_rules(rules: Option<&Path>) -> Result<()> {
    let Some(path) = rules else {
        println!("{}", "Built-in rule kinds:".bold());
        for (kind, summary) in BUILTIN_KINDS {
            println!("  {:<22} {}", kind.cyan(), summary);
        }
        return Ok(());
    };

    let config = load_from_path(path)?;
    if !config.meta.name.is_empty() {
        println!("{}", config.meta.name.bold());
    }
    if let Some(description) = &config.meta.description {
        println!("{}", description.dimmed());
    }
    for rule in &config.rules {
        println!("  {:<22} {}", rule.id, finder_label(&rule.finder).cyan());
    }
    Ok(())
}

fn finder_label(spec: &FinderSpec) -> String {
    match spec {
        FinderSpec::MethodCall(f) => format!("{} ({}.{})", spec.kind(), f.receiver, f.method),
        FinderSpec::RenameParameters(f) => format!("{} (fn {})", spec.kind(), f.function),
        FinderSpec::TagLoops(f) => format!("{} ({})", spec.kind(), f.marker),
        FinderSpec::DeriveFromMethods(f) => format!("{} ({} methods)", spec.kind(), f.methods.len()),
        FinderSpec::Template(f) => format!("{} ({})", spec.kind(), f.pattern),
    }
}
