//! Removal of cached variants
//!
//! Matching is done on parsed cache file names rather than shell globs:
//! a file is a variant of `dir/stem.ext` only if it sits in `dir` and its
//! name parses as `stem@{format}@{mtime}.ext`. Files that do not parse as
//! cache keys (temp files, stray uploads) are never touched by filtered
//! sweeps.

use crate::cache::key::{CacheKey, SourceRef};
use crate::error::{ImagixError, ImagixResult};
use crate::guard::PathGuard;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Selection of cached variants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantFilter {
    source: Option<SourceRef>,
    format: Option<String>,
    lifetime: Option<Duration>,
    keep: Option<String>,
}

impl VariantFilter {
    /// Every cached variant of every source
    pub fn all() -> Self {
        Self::default()
    }

    /// Variants of a single source
    pub fn for_source(source: SourceRef) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// Restrict to one format
    pub fn with_format(mut self, format: Option<&str>) -> Self {
        self.format = format.map(str::to_string);
        self
    }

    /// Restrict to files whose mtime is at or before `now - lifetime`
    ///
    /// A zero lifetime means no age restriction.
    pub fn older_than(mut self, lifetime: Option<Duration>) -> Self {
        self.lifetime = lifetime.filter(|l| !l.is_zero());
        self
    }

    /// Never select the file for `key` (the current variant)
    pub fn keeping(mut self, key: &CacheKey) -> Self {
        self.keep = Some(key.file_name());
        self
    }

    /// Whether neither format nor age narrows the selection
    pub fn is_unfiltered(&self) -> bool {
        self.source.is_none() && self.format.is_none() && self.lifetime.is_none()
    }

    fn matches(&self, key: &CacheKey) -> bool {
        if let Some(source) = &self.source {
            if key.stem() != source.stem() || key.extension() != source.extension() {
                return false;
            }
        }
        if let Some(format) = &self.format {
            if key.format() != format {
                return false;
            }
        }
        if let Some(keep) = &self.keep {
            if &key.file_name() == keep {
                return false;
            }
        }
        true
    }

    fn is_expired(&self, path: &Path, now: SystemTime) -> bool {
        let Some(lifetime) = self.lifetime else {
            return true;
        };
        let Some(cutoff) = now.checked_sub(lifetime) else {
            return false;
        };

        fs::symlink_metadata(path)
            .and_then(|m| m.modified())
            .is_ok_and(|modified| modified <= cutoff)
    }
}

/// Files removed by a sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
}

impl SweepReport {
    /// Number of removed entries
    pub fn count(&self) -> usize {
        self.removed.len()
    }
}

/// Deletes cached variants under the destination root
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    guard: PathGuard,
}

impl RetentionSweeper {
    /// Create a sweeper confined to `guard`'s root
    pub fn new(guard: PathGuard) -> Self {
        Self { guard }
    }

    /// List the files `filter` selects, without deleting anything
    pub fn plan(&self, filter: &VariantFilter) -> ImagixResult<Vec<PathBuf>> {
        let now = SystemTime::now();
        let candidates = match &filter.source {
            Some(source) => self.source_candidates(source)?,
            None => self.tree_candidates(),
        };

        Ok(candidates
            .into_iter()
            .filter(|(path, key)| filter.matches(key) && filter.is_expired(path, now))
            .map(|(path, _)| path)
            .collect())
    }

    /// Delete the files `filter` selects
    pub fn sweep(&self, filter: &VariantFilter) -> ImagixResult<SweepReport> {
        let mut report = SweepReport::default();

        for path in self.plan(filter)? {
            if remove_entry(&path)? {
                debug!("Removed {}", path.display());
                report.removed.push(path);
            }
        }

        if report.count() > 0 {
            info!("Removed {} cached file(s)", report.count());
        }
        Ok(report)
    }

    /// List the top-level entries [`clear`](Self::clear) would delete
    pub fn plan_clear(&self) -> ImagixResult<Vec<PathBuf>> {
        let root = self.guard.root();
        let entries = fs::read_dir(root)
            .map_err(|e| ImagixError::io(format!("reading {}", root.display()), e))?;

        entries
            .map(|entry| {
                entry
                    .map(|e| e.path())
                    .map_err(|e| ImagixError::io(format!("reading {}", root.display()), e))
            })
            .collect()
    }

    /// Delete everything under the root, keeping the root itself
    pub fn clear(&self) -> ImagixResult<SweepReport> {
        let mut report = SweepReport::default();
        for path in self.plan_clear()? {
            if remove_entry(&path)? {
                report.removed.push(path);
            }
        }

        info!(
            "Cleared {} entries from {}",
            report.count(),
            self.guard.root().display()
        );
        Ok(report)
    }

    /// Cache files in the source's directory, parsed as keys
    fn source_candidates(&self, source: &SourceRef) -> ImagixResult<Vec<(PathBuf, CacheKey)>> {
        let dir = self.guard.confine(source.dir())?;

        let dir = match fs::canonicalize(&dir) {
            Ok(dir) => dir,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(ImagixError::io(format!("resolving {}", dir.display()), e)),
        };
        self.guard.assert_within(&dir)?;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(ImagixError::io(format!("reading {}", dir.display()), e)),
        };

        let mut candidates = Vec::new();
        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|t| !t.is_dir()) {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(key) = CacheKey::parse_file_name(source.dir(), name) {
                candidates.push((entry.path(), key));
            }
        }
        Ok(candidates)
    }

    /// Cache files anywhere under the root, parsed as keys
    fn tree_candidates(&self) -> Vec<(PathBuf, CacheKey)> {
        WalkDir::new(self.guard.root())
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| !entry.file_type().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?;
                let key = CacheKey::parse_file_name("", name)?;
                Some((entry.into_path(), key))
            })
            .collect()
    }
}

/// Remove a file or directory tree; an already-missing entry is a no-op
fn remove_entry(path: &Path) -> ImagixResult<bool> {
    let is_dir = match fs::symlink_metadata(path) {
        Ok(meta) => meta.is_dir(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(ImagixError::io(format!("inspecting {}", path.display()), e)),
    };

    let result = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ImagixError::io(format!("removing {}", path.display()), e)),
    }
}
