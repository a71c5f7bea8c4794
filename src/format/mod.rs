//! Named image formats
//!
//! A format is a transform applied to a decoded source image. Formats are
//! registered once, before the orchestrator is built, and looked up by
//! name afterwards. Names end up inside cache file names, so they must be
//! a single path segment.

pub mod recipe;

pub use recipe::{FlipDirection, Operation, Recipe};

use crate::cache::key::SEPARATOR;
use crate::error::{ImagixError, ImagixResult};
use image::DynamicImage;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// A registered image transform, mutating the decoded image in place
pub type Transform = Box<dyn Fn(&mut DynamicImage) + Send + Sync>;

/// Check that a format name is usable as a single path segment
///
/// Rejects empty names, path separators, `@`, control characters and any
/// leading dot (which also covers `.` and `..`).
pub fn validate_format_name(name: &str) -> ImagixResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', SEPARATOR])
        && !name.chars().any(char::is_control);

    if valid {
        Ok(())
    } else {
        Err(ImagixError::InvalidFormatName(name.to_string()))
    }
}

/// Collection of named transforms
#[derive(Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, Transform>,
}

impl FormatRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F) -> ImagixResult<&mut Self>
    where
        F: Fn(&mut DynamicImage) + Send + Sync + 'static,
    {
        let name = name.into();
        validate_format_name(&name)?;

        if self.formats.insert(name.clone(), Box::new(transform)).is_some() {
            debug!("Replaced format {}", name);
        } else {
            debug!("Registered format {}", name);
        }
        Ok(self)
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with_format<F>(mut self, name: impl Into<String>, transform: F) -> ImagixResult<Self>
    where
        F: Fn(&mut DynamicImage) + Send + Sync + 'static,
    {
        self.register(name, transform)?;
        Ok(self)
    }

    /// Check whether a format is registered
    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Get the transform registered under `name`
    pub fn lookup(&self, name: &str) -> ImagixResult<&Transform> {
        self.formats
            .get(name)
            .ok_or_else(|| ImagixError::FormatNotFound(name.to_string()))
    }

    /// Registered format names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    /// Number of registered formats
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Whether no format is registered
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.formats.keys()).finish()
    }
}
