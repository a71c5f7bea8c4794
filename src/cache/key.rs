//! Cache key encoding and decoding
//!
//! A cache key is the cache-relative path of a derived file:
//!
//! ```text
//! {dir}/{stem}@{format}@{mtime}.{ext}
//! ```
//!
//! `dir` is empty for sources at the root, `.{ext}` is omitted for
//! sources without an extension. The source mtime only lives in the
//! encoded form; decoding yields the source path and format, and callers
//! detect staleness by re-encoding with the current mtime.

use crate::error::{ImagixError, ImagixResult};
use crate::format::validate_format_name;
use std::fmt;

/// Separator between stem, format and mtime in a cache file name
pub const SEPARATOR: char = '@';

/// Split a slash-separated path into `(dir, basename)`
///
/// `dir` has no trailing slash and is empty for root-level entries.
fn split_dir(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Split a basename into `(stem, extension)` at its last dot
///
/// Leading-dot names (`.htaccess`) and trailing dots (`name.`) carry no extension.
fn split_extension(basename: &str) -> (&str, Option<&str>) {
    match basename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < basename.len() => {
            (&basename[..idx], Some(&basename[idx + 1..]))
        }
        _ => (basename, None),
    }
}

/// A logical source path split into directory, stem and extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    dir: String,
    stem: String,
    extension: Option<String>,
}

impl SourceRef {
    /// Parse a logical source path such as `/photos/cat.jpg`
    pub fn parse(path: &str) -> ImagixResult<Self> {
        let (dir, basename) = split_dir(path);

        if basename.is_empty() || basename == "." || basename == ".." {
            return Err(ImagixError::MalformedSource(path.to_string()));
        }

        let (stem, extension) = split_extension(basename);

        // A separator in the stem would make the encoded key ambiguous
        if stem.contains(SEPARATOR) {
            return Err(ImagixError::MalformedSource(path.to_string()));
        }

        Ok(Self {
            dir: dir.to_string(),
            stem: stem.to_string(),
            extension: extension.map(str::to_string),
        })
    }

    /// Directory part, empty at the root
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// File name without extension
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Extension without the dot
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// File name including extension
    pub fn basename(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{}.{}", self.stem, ext),
            None => self.stem.clone(),
        }
    }

    /// Cache key for this source under `format` at `mtime`
    pub fn key(&self, format: &str, mtime: u64) -> CacheKey {
        CacheKey {
            dir: self.dir.clone(),
            stem: self.stem.clone(),
            format: format.to_string(),
            mtime,
            extension: self.extension.clone(),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dir, self.basename())
    }
}

/// The parsed form of a cache-relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    dir: String,
    stem: String,
    format: String,
    mtime: u64,
    extension: Option<String>,
}

impl CacheKey {
    /// Parse a cache-relative path such as `/photos/cat@thumb@1700000000.jpg`
    pub fn parse(path: &str) -> ImagixResult<Self> {
        let (dir, file_name) = split_dir(path);
        Self::parse_file_name(dir, file_name)
            .ok_or_else(|| ImagixError::MalformedDestination(path.to_string()))
    }

    /// Parse a bare cache file name found in `dir`
    ///
    /// Exactly one `@format@mtime` suffix is accepted; anything else,
    /// including non-canonical mtimes like `007`, is not a cache key.
    pub fn parse_file_name(dir: &str, file_name: &str) -> Option<Self> {
        let mut parts = file_name.splitn(3, SEPARATOR);
        let stem = parts.next()?;
        let format = parts.next()?;
        let tail = parts.next()?;

        if stem.is_empty() || validate_format_name(format).is_err() {
            return None;
        }

        let (mtime, extension) = match tail.split_once('.') {
            Some((_, "")) => return None,
            Some((mtime, ext)) => (mtime, Some(ext)),
            None => (tail, None),
        };

        if mtime.is_empty()
            || !mtime.bytes().all(|b| b.is_ascii_digit())
            || (mtime.len() > 1 && mtime.starts_with('0'))
        {
            return None;
        }

        Some(Self {
            dir: dir.to_string(),
            stem: stem.to_string(),
            format: format.to_string(),
            mtime: mtime.parse().ok()?,
            extension: extension.map(str::to_string),
        })
    }

    /// Directory part, empty at the root
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Source file name without extension
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Format name embedded in the key
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Source mtime (seconds since the epoch) embedded in the key
    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Extension without the dot
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// The source this key was derived from
    pub fn source(&self) -> SourceRef {
        SourceRef {
            dir: self.dir.clone(),
            stem: self.stem.clone(),
            extension: self.extension.clone(),
        }
    }

    /// Cache file name without directory
    pub fn file_name(&self) -> String {
        let mut name = format!(
            "{}{sep}{}{sep}{}",
            self.stem,
            self.format,
            self.mtime,
            sep = SEPARATOR
        );
        if let Some(ext) = &self.extension {
            name.push('.');
            name.push_str(ext);
        }
        name
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dir, self.file_name())
    }
}

/// Encode `(source, format, mtime)` into a cache-relative path
pub fn encode(source: &str, format: &str, mtime: u64) -> ImagixResult<String> {
    validate_format_name(format)?;
    Ok(SourceRef::parse(source)?.key(format, mtime).to_string())
}

/// Decode a cache-relative path into `(source, format)`
pub fn decode(path: &str) -> ImagixResult<(String, String)> {
    let key = CacheKey::parse(path)?;
    Ok((key.source().to_string(), key.format))
}
