//! Command-line interface

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};

use crate::audit::AuditLog;
use crate::config::Config;
use crate::error::{ImagixError, ImagixResult};
use crate::imagix::Imagix;
use crate::processor::RasterProcessor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Build the orchestrator from configuration
pub async fn open_cache(config: &Config) -> ImagixResult<Imagix> {
    let source = configured_root(config.paths.source.as_deref(), "source")?;
    let destination = configured_root(config.paths.destination.as_deref(), "destination")?;

    if config.paths.create_destination {
        tokio::fs::create_dir_all(destination).await.map_err(|e| {
            ImagixError::io(format!("creating directory {}", destination.display()), e)
        })?;
    }

    let imagix = Imagix::new(
        config.format_registry()?,
        RasterProcessor::new(),
        source,
        destination,
    )?
    .with_redirect_status(config.http.redirect_status);

    debug!("Opened cache {:?}", imagix);
    Ok(match config.decorator() {
        Some(decorator) => imagix.with_decorator(decorator),
        None => imagix,
    })
}

fn configured_root<'a>(root: Option<&'a Path>, which: &str) -> ImagixResult<&'a Path> {
    root.ok_or_else(|| ImagixError::RootInvalid {
        path: PathBuf::new(),
        reason: format!("no {} root configured", which),
    })
}

/// Run blocking cache work off the async runtime
pub async fn blocking<T, F>(work: F) -> ImagixResult<T>
where
    F: FnOnce() -> ImagixResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ImagixError::Internal(format!("worker task failed: {}", e)))?
}

/// Record sandbox violations in the audit log before passing the result on
pub async fn audited<T>(
    config: &Config,
    operation: &str,
    requested: &str,
    result: ImagixResult<T>,
) -> ImagixResult<T> {
    if let Err(e) = &result {
        if e.is_security_violation() {
            AuditLog::new(config)
                .path_forbidden(operation, requested, &e.to_string())
                .await;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_cache_requires_roots() {
        let err = open_cache(&Config::default()).await.unwrap_err();
        assert!(matches!(err, ImagixError::RootInvalid { .. }));
    }

    #[tokio::test]
    async fn open_cache_creates_destination() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.source = Some(temp.path().to_path_buf());
        config.paths.destination = Some(temp.path().join("cache/nested"));
        config.http.public_prefix = Some("/media".to_string());

        let imagix = open_cache(&config).await.unwrap();
        assert!(temp.path().join("cache/nested").is_dir());
        assert!(imagix.decorator().is_some());
        assert!(imagix.formats().contains("thumb"));
    }

    #[tokio::test]
    async fn open_cache_without_create_destination() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.source = Some(temp.path().to_path_buf());
        config.paths.destination = Some(temp.path().join("missing"));
        config.paths.create_destination = false;

        let err = open_cache(&config).await.unwrap_err();
        assert!(matches!(err, ImagixError::RootInvalid { .. }));
    }

    #[tokio::test]
    async fn blocking_propagates_errors() {
        let ok = blocking(|| Ok(1)).await.unwrap();
        assert_eq!(ok, 1);

        let err = blocking(|| -> ImagixResult<()> { Err(ImagixError::User("nope".into())) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
