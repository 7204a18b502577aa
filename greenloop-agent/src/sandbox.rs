//! # Sandbox resolver
//!
//! Confines every model-supplied path to a single workspace root.
//!
//! ## Design
//! Two checks run in sequence, and both are required:
//! 1. Lexical normalization (collapsing `.`/`..`) catches plain traversal
//!    before anything touches the filesystem.
//! 2. Canonicalization of the deepest existing ancestor resolves symlinks,
//!    so a link inside the root cannot point back out of it.
//!
//! Normalization alone does not defend against symlink escapes, and
//! canonicalization alone cannot handle write targets that do not exist yet.

use greenloop_error::{Error, ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// A canonicalized workspace root that all file operations are confined to.
///
/// Stateless beyond the fixed root; `resolve` is a pure function of its
/// input plus the filesystem.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`. The directory must exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().canonicalize().map_err(|e| {
            Error::new(
                ErrorKind::ConfigInvalid,
                format!("sandbox root '{}' is not usable: {}", root.as_ref().display(), e),
            )
            .with_operation("sandbox::new")
            .set_source(e)
        })?;
        Ok(Self { root })
    }

    /// The canonical sandbox root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied relative path to a verified absolute path.
    ///
    /// Fails with `SandboxViolation` when containment is violated. The
    /// returned path may not exist yet (write targets); its deepest existing
    /// ancestor is guaranteed to live under the root even through symlinks.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let requested = Path::new(relative);
        if requested.is_absolute() {
            return Err(Error::sandbox_violation(relative).with_operation("sandbox::resolve"));
        }

        let normalized = normalize(&self.root.join(requested));
        if !normalized.starts_with(&self.root) {
            return Err(Error::sandbox_violation(relative).with_operation("sandbox::resolve"));
        }

        // Symlink check: canonicalize the deepest ancestor that exists.
        let existing = deepest_existing(&normalized);
        let canonical = existing.canonicalize().map_err(|e| {
            Error::io_failed(format!("cannot canonicalize '{}': {}", existing.display(), e))
                .with_operation("sandbox::resolve")
                .set_source(e)
        })?;
        if !canonical.starts_with(&self.root) {
            return Err(Error::sandbox_violation(relative).with_operation("sandbox::resolve"));
        }

        Ok(normalized)
    }
}

/// Collapse `.` and `..` segments without touching the filesystem
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Normalize a relative path spelling for string comparisons
/// (e.g. protected-file and writable-subtree checks).
pub(crate) fn normalize_relative(relative: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn deepest_existing(path: &Path) -> PathBuf {
    let mut current = path.to_path_buf();
    while !current.exists() {
        if !current.pop() {
            break;
        }
    }
    current
}
