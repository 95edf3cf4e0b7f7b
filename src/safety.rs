//! Guard against rewriting files outside the tree the user pointed us at.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories under the home directory that hold toolchains or downloaded
/// dependency sources.
const HOME_FORBIDDEN: &[&str] = &[".cargo/registry", ".cargo/git", ".rustup"];

/// Directories under the rewrite root that hold build output or VCS state.
const ROOT_FORBIDDEN: &[&str] = &["target", ".git"];

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("{path} is outside the rewrite root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{path} is inside protected directory {forbidden}")]
    Forbidden { path: PathBuf, forbidden: PathBuf },

    #[error("cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Only lets through paths that resolve inside `root` and outside every
/// protected directory.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    root: PathBuf,
    forbidden: Vec<PathBuf>,
}

fn resolve(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

impl WorkspaceGuard {
    /// Guard rooted at `root`. Symlinks in `root` are resolved; protected
    /// directories that do not exist are skipped.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = resolve(root.as_ref())?;

        let home_dirs = home::home_dir()
            .into_iter()
            .flat_map(|home| HOME_FORBIDDEN.iter().map(move |dir| home.join(dir)));
        let root_dirs = ROOT_FORBIDDEN.iter().map(|dir| root.join(dir));
        let forbidden = home_dirs
            .chain(root_dirs)
            .filter_map(|dir| dir.canonicalize().ok())
            .collect();

        Ok(Self { root, forbidden })
    }

    /// Guard with an explicit protected list.
    pub fn with_forbidden(
        root: impl AsRef<Path>,
        forbidden: impl IntoIterator<Item = PathBuf>,
    ) -> Result<Self, SafetyError> {
        Ok(Self {
            root: resolve(root.as_ref())?,
            forbidden: forbidden.into_iter().collect(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` (relative paths are taken from the root) and check it.
    /// Returns the resolved path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        self.revalidate(&absolute)
    }

    /// Resolve and check again right before writing, so a symlink swapped in
    /// after discovery is still caught.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let resolved = resolve(path)?;

        if !resolved.starts_with(&self.root) {
            return Err(SafetyError::OutsideRoot {
                path: resolved,
                root: self.root.clone(),
            });
        }
        if let Some(forbidden) = self.forbidden.iter().find(|f| resolved.starts_with(f)) {
            return Err(SafetyError::Forbidden {
                path: resolved,
                forbidden: forbidden.clone(),
            });
        }

        Ok(resolved)
    }
}
