//! Batch driver: runs rules over files and writes the results.
//!
//! Files are grouped into buckets by how many times their basename has been
//! seen before (the first `mod.rs` goes to bucket 0, the second to bucket 1,
//! ...). Each bucket gets a fresh front-end, so no front-end ever sees two
//! files with the same basename. Within a file every rule runs over every
//! top-level unit, the registry is composed into edits, and the edits are
//! applied and written atomically. A failing file is left untouched and the
//! batch moves on.

use crate::compose::{ComposeError, Compositor};
use crate::config::RewriteConfig;
use crate::edit::{apply_edits, read_source, write_atomic, Edit, EditError};
use crate::finders::{FindError, Finder};
use crate::pool;
use crate::registry::Registry;
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::source::SourceFile;
use crate::tree::SyntaxTree;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Builds a [`SyntaxTree`] for a source file.
pub trait Frontend {
    type Error: std::error::Error + Send + Sync + 'static;

    fn build_tree(&mut self, source: &SourceFile) -> Result<SyntaxTree, Self::Error>;
}

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: EditError,
    },

    #[error(transparent)]
    Unsafe(#[from] SafetyError),

    #[error("failed to build syntax tree: {source}")]
    Parse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("rule '{rule}' failed: {source}")]
    Find {
        rule: String,
        #[source]
        source: FindError,
    },

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("edits could not be applied: {0}")]
    Apply(#[source] EditError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: EditError,
    },
}

impl RewriteError {
    fn parse(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        RewriteError::Parse {
            source: Box::new(error),
        }
    }
}

/// A named finder.
pub struct Rule {
    pub id: String,
    pub finder: Box<dyn Finder>,
}

/// The outcome of rewriting one text, before anything is written.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub edits: Vec<Edit>,
    pub text: String,
    /// Directives left in the registry after conflicts were resolved.
    pub directives: usize,
    pub conflicts: usize,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub edits: usize,
    pub directives: usize,
    pub conflicts: usize,
    pub original: String,
    pub rewritten: String,
    pub written: bool,
}

impl FileReport {
    pub fn changed(&self) -> bool {
        self.original != self.rewritten
    }
}

/// Result of one file in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<FileReport, RewriteError>,
}

/// Runs a fixed, ordered list of rules. Rule order is registration order, so
/// a later rule wins when two rules target the same node.
#[derive(Default)]
pub struct Rewriter {
    rules: Vec<Rule>,
    dry_run: bool,
    guard: Option<WorkspaceGuard>,
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: RewriteConfig) -> Self {
        let rules = config
            .rules
            .into_iter()
            .map(|rule| Rule {
                id: rule.id,
                finder: rule.finder.into_finder(),
            })
            .collect();
        Self {
            rules,
            ..Self::default()
        }
    }

    pub fn rule(mut self, id: impl Into<String>, finder: impl Finder + 'static) -> Self {
        self.rules.push(Rule {
            id: id.into(),
            finder: Box::new(finder),
        });
        self
    }

    /// Compute results without writing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Refuse to read or write files the guard rejects.
    pub fn guard(mut self, guard: WorkspaceGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run every rule over every unit of the tree, in order.
    pub fn discover(&self, source: &SourceFile, tree: &SyntaxTree) -> Result<Registry, RewriteError> {
        let mut registry = Registry::new();
        for &unit in tree.roots() {
            for rule in &self.rules {
                let found = rule
                    .finder
                    .find(source, tree, unit)
                    .map_err(|source| RewriteError::Find {
                        rule: rule.id.clone(),
                        source,
                    })?;
                debug!(rule = %rule.id, %unit, found = found.len(), "rule ran");
                registry.extend(found);
            }
        }
        Ok(registry)
    }

    /// Discover, compose and apply, without touching the filesystem.
    pub fn plan(&self, source: &SourceFile, tree: &SyntaxTree) -> Result<Rewrite, RewriteError> {
        let registry = self.discover(source, tree)?;
        let edits = Compositor::new(source, tree, &registry).compose()?;
        let text = apply_edits(source.text(), &edits).map_err(RewriteError::Apply)?;
        Ok(Rewrite {
            edits,
            text,
            directives: registry.len(),
            conflicts: registry.conflicts(),
        })
    }

    /// Rewrite in-memory Rust source with this thread's pooled parser.
    pub fn rewrite_text(&self, text: &str) -> Result<Rewrite, RewriteError> {
        let source = SourceFile::new(text);
        let tree = pool::with_parser(|parser| parser.build_tree(&source))
            .map_err(RewriteError::parse)?
            .map_err(RewriteError::parse)?;
        self.plan(&source, &tree)
    }

    /// Rewrite one file in place (unless this is a dry run).
    pub fn rewrite_file<F: Frontend>(
        &self,
        frontend: &mut F,
        path: &Path,
    ) -> Result<FileReport, RewriteError> {
        let path = match &self.guard {
            Some(guard) => guard.validate_path(path)?,
            None => path.to_path_buf(),
        };

        let text = read_source(&path).map_err(|source| RewriteError::Read {
            path: path.clone(),
            source,
        })?;
        let source = SourceFile::with_path(&path, text);
        let tree = frontend.build_tree(&source).map_err(RewriteError::parse)?;
        let rewrite = self.plan(&source, &tree)?;

        let changed = rewrite.text != source.text();
        let written = changed && !self.dry_run;
        if written {
            if let Some(guard) = &self.guard {
                guard.revalidate(&path)?;
            }
            write_atomic(&path, rewrite.text.as_bytes()).map_err(|source| RewriteError::Write {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), edits = rewrite.edits.len(), "rewrote file");
        }

        Ok(FileReport {
            edits: rewrite.edits.len(),
            directives: rewrite.directives,
            conflicts: rewrite.conflicts,
            original: source.text().to_string(),
            rewritten: rewrite.text,
            written,
            path,
        })
    }

    /// Rewrite a batch. `make_frontend` is called once per bucket; failing to
    /// build a front-end aborts the batch, any other failure only affects its
    /// own file.
    pub fn rewrite_all<F, M>(
        &self,
        paths: &[PathBuf],
        mut make_frontend: M,
    ) -> Result<Vec<FileOutcome>, RewriteError>
    where
        F: Frontend,
        M: FnMut() -> Result<F, F::Error>,
    {
        let mut outcomes = Vec::with_capacity(paths.len());
        for (index, bucket) in buckets(paths).into_iter().enumerate() {
            info!(bucket = index, files = bucket.len(), "processing bucket");
            let mut frontend = make_frontend().map_err(RewriteError::parse)?;
            for path in bucket {
                let result = self.rewrite_file(&mut frontend, &path);
                outcomes.push(FileOutcome { path, result });
            }
        }
        Ok(outcomes)
    }
}

/// Group paths so that no bucket holds two files with the same basename.
/// Order within each bucket follows the input order.
pub fn buckets(paths: &[PathBuf]) -> Vec<Vec<PathBuf>> {
    let mut seen: HashMap<OsString, usize> = HashMap::new();
    let mut buckets: Vec<Vec<PathBuf>> = Vec::new();

    for path in paths {
        let name = path.file_name().map(OsString::from).unwrap_or_default();
        let count = seen.entry(name).or_insert(0);
        if *count == buckets.len() {
            buckets.push(Vec::new());
        }
        buckets[*count].push(path.clone());
        *count += 1;
    }

    buckets
}
