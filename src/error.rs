//! Error types for Imagix
//!
//! All modules use `ImagixResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Imagix operations
pub type ImagixResult<T> = Result<T, ImagixError>;

/// All errors that can occur in Imagix
#[derive(Error, Debug)]
pub enum ImagixError {
    // Addressing errors
    #[error("Source is not a file: {0:?}")]
    MalformedSource(String),

    #[error("Wrong destination file format: {0:?}")]
    MalformedDestination(String),

    #[error("Format name contains forbidden characters: {0:?}")]
    InvalidFormatName(String),

    #[error("Image format `{0}` was not defined")]
    FormatNotFound(String),

    #[error("Path is not allowed: {path} escapes {root}")]
    PathForbidden { path: PathBuf, root: PathBuf },

    #[error("Source file does not exist: {0}")]
    SourceNotFound(String),

    #[error("Invalid recipe for format `{name}`: {reason}")]
    RecipeInvalid { name: String, reason: String },

    // Root directory errors
    #[error("Invalid root directory {path}: {reason}")]
    RootInvalid { path: PathBuf, reason: String },

    // Image codec errors
    #[error("Image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl ImagixError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an image codec error for a path
    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.into(),
            source,
        }
    }

    /// Whether the error is a sandbox violation worth auditing
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Self::PathForbidden { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::FormatNotFound(_) => Some("Define it under [formats.<name>] in config.toml"),
            Self::InvalidFormatName(_) => {
                Some("Format names must be a single path segment without '@' or a leading '.'")
            }
            Self::MalformedDestination(_) => {
                Some("Cache paths look like /dir/name@format@mtime.ext")
            }
            Self::RecipeInvalid { .. } => {
                Some("Check the ops listed under [formats.<name>] in config.toml")
            }
            Self::RootInvalid { .. } => {
                Some("Set [paths] in config.toml or pass --source-root / --destination-root")
            }
            _ => None,
        }
    }
}
