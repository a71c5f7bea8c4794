//! Filesystem sandboxing for source and cache roots
//!
//! Every logical path handed to Imagix is resolved against a fixed root
//! directory. Resolution follows symlinks and `..` exactly like the
//! filesystem does (`canonicalize`), and the canonical result must be a
//! descendant of the canonical root. The comparison is component-wise,
//! so `/data` never matches `/data-other`.

use crate::error::{ImagixError, ImagixResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A canonical root directory that confines path resolution
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Create a guard for an existing directory
    pub fn new(root: impl AsRef<Path>) -> ImagixResult<Self> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).map_err(|e| ImagixError::RootInvalid {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !canonical.is_dir() {
            return Err(ImagixError::RootInvalid {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        Ok(Self { root: canonical })
    }

    /// The canonical root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a slash-separated logical path under the root without touching the filesystem
    pub fn join(&self, logical: &str) -> PathBuf {
        self.root.join(logical.trim_start_matches('/'))
    }

    /// Resolve a logical path to an existing regular file inside the root
    ///
    /// Returns `Ok(None)` when nothing (or something other than a file)
    /// exists there, and `PathForbidden` when the path exists but its
    /// canonical form lies outside the root.
    pub fn resolve(&self, logical: &str) -> ImagixResult<Option<PathBuf>> {
        let candidate = self.join(logical);

        let canonical = match fs::canonicalize(&candidate) {
            Ok(path) => path,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(None)
            }
            Err(e) => {
                return Err(ImagixError::io(
                    format!("resolving {}", candidate.display()),
                    e,
                ))
            }
        };

        self.assert_within(&canonical)?;

        if canonical.is_file() {
            Ok(Some(canonical))
        } else {
            Ok(None)
        }
    }

    /// Fail with `PathForbidden` unless `path` is the root or a descendant of it
    pub fn assert_within(&self, path: &Path) -> ImagixResult<()> {
        if path.starts_with(&self.root) {
            return Ok(());
        }

        warn!(
            "Rejected path {} outside of {}",
            path.display(),
            self.root.display()
        );
        Err(ImagixError::PathForbidden {
            path: path.to_path_buf(),
            root: self.root.clone(),
        })
    }

    /// Create `dir` and its missing parents, refusing to build through
    /// symlinks that lead out of the root
    pub fn create_dir_within(&self, dir: &Path) -> ImagixResult<()> {
        let mut existing = dir;
        while !existing.exists() {
            existing = existing.parent().ok_or_else(|| ImagixError::PathForbidden {
                path: dir.to_path_buf(),
                root: self.root.clone(),
            })?;
        }

        let canonical = fs::canonicalize(existing)
            .map_err(|e| ImagixError::io(format!("resolving {}", existing.display()), e))?;
        self.assert_within(&canonical)?;

        fs::create_dir_all(dir)
            .map_err(|e| ImagixError::io(format!("creating directory {}", dir.display()), e))?;

        let canonical = fs::canonicalize(dir)
            .map_err(|e| ImagixError::io(format!("resolving {}", dir.display()), e))?;
        self.assert_within(&canonical)
    }

    /// Lexically confine a logical path that may not exist yet
    ///
    /// `.` segments are dropped and `..` pops a segment; popping above the
    /// root is `PathForbidden`. Symlinks are not followed here, so callers
    /// writing to the result re-check the canonical parent afterwards.
    pub fn confine(&self, logical: &str) -> ImagixResult<PathBuf> {
        let normalized = self.normalize(logical)?;
        let relative = normalized.trim_start_matches('/');
        if relative.is_empty() {
            Ok(self.root.clone())
        } else {
            Ok(self.root.join(relative))
        }
    }

    /// Lexically normalize a logical path to `/a/b` form
    ///
    /// `.` and empty segments are dropped. A `..` that would climb above
    /// the root is `PathForbidden`.
    pub fn normalize(&self, logical: &str) -> ImagixResult<String> {
        let mut segments: Vec<&str> = Vec::new();

        for segment in logical.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(ImagixError::PathForbidden {
                            path: self.join(logical),
                            root: self.root.clone(),
                        });
                    }
                }
                other => segments.push(other),
            }
        }

        Ok(format!("/{}", segments.join("/")))
    }
}
