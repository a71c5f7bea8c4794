//! Configuration schema for Imagix
//!
//! Configuration is stored at `~/.config/imagix/config.toml`

use crate::decorator::PrefixDecorator;
use crate::error::{ImagixError, ImagixResult};
use crate::format::{validate_format_name, FormatRegistry, Operation, Recipe};
use crate::imagix::DEFAULT_REDIRECT_STATUS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Source and cache directories
    pub paths: PathsConfig,

    /// Public URL and response settings
    pub http: HttpConfig,

    /// Cache retention
    pub retention: RetentionConfig,

    /// Named formats, each a recipe of image operations
    pub formats: BTreeMap<String, Recipe>,
}

impl Default for Config {
    fn default() -> Self {
        let mut formats = BTreeMap::new();
        formats.insert(
            "thumb".to_string(),
            Recipe::new(vec![Operation::Fill {
                width: 128,
                height: 128,
            }]),
        );
        formats.insert(
            "medium".to_string(),
            Recipe::new(vec![Operation::Resize {
                width: Some(800),
                height: Some(800),
                upsize: false,
            }]),
        );

        Self {
            general: GeneralConfig::default(),
            paths: PathsConfig::default(),
            http: HttpConfig::default(),
            retention: RetentionConfig::default(),
            formats,
        }
    }
}

impl Config {
    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got {:?}",
                self.general.log_format
            ));
        }

        if !(300..=399).contains(&self.http.redirect_status) {
            return Err(format!(
                "http.redirect_status must be a 3xx code, got {}",
                self.http.redirect_status
            ));
        }

        for (name, recipe) in &self.formats {
            validate_format_name(name).map_err(|e| e.to_string())?;
            recipe
                .validate()
                .map_err(|reason| format!("formats.{}: {}", name, reason))?;
        }

        Ok(())
    }

    /// Build a format registry from the configured recipes
    pub fn format_registry(&self) -> ImagixResult<FormatRegistry> {
        let mut registry = FormatRegistry::new();
        for (name, recipe) in &self.formats {
            recipe.validate().map_err(|reason| ImagixError::RecipeInvalid {
                name: name.clone(),
                reason,
            })?;
            registry.register(name.clone(), recipe.clone().into_transform())?;
        }
        Ok(registry)
    }

    /// URL prefix decorator, if a public prefix is configured
    pub fn decorator(&self) -> Option<PrefixDecorator> {
        self.http
            .public_prefix
            .as_deref()
            .map(PrefixDecorator::new)
            .filter(|d| !d.prefix().is_empty())
    }

    /// Default lifetime for removals, `None` when unconditional
    pub fn default_lifetime(&self) -> Option<Duration> {
        match self.retention.default_lifetime_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Source and cache directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding original images
    pub source: Option<PathBuf>,

    /// Directory derivatives are written to
    pub destination: Option<PathBuf>,

    /// Create the destination directory when missing
    pub create_destination: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: None,
            destination: None,
            create_destination: true,
        }
    }
}

/// Public URL settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// URL prefix the cache is mounted under, e.g. "/media"
    pub public_prefix: Option<String>,

    /// Status code for stale-URL redirects
    pub redirect_status: u16,

    /// Cache-Control header sent with files
    pub cache_control: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            public_prefix: None,
            redirect_status: DEFAULT_REDIRECT_STATUS,
            cache_control: Some("public, max-age=31536000, immutable".to_string()),
        }
    }
}

/// Retention settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Only remove files older than this many seconds (0 = no age limit)
    pub default_lifetime_secs: u64,
}
