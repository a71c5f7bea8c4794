//! The cache orchestrator
//!
//! `Imagix` ties the pieces together: it maps source paths to cache URLs,
//! generates missing derivatives on demand, redirects stale URLs to the
//! current one and sweeps old variants.
//!
//! All paths it accepts are logical, slash-separated and relative to one
//! of its two roots. Sources are only ever read; every write and delete
//! happens under the destination root.

use crate::cache::key::{CacheKey, SourceRef};
use crate::cache::sweeper::{RetentionSweeper, SweepReport, VariantFilter};
use crate::cache::InFlight;
use crate::decorator::Decorator;
use crate::error::{ImagixError, ImagixResult};
use crate::format::{validate_format_name, FormatRegistry};
use crate::guard::PathGuard;
use crate::processor::ImageProcessor;
use crate::response::{epoch_secs, Delivery, Responder};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Status used for stale-URL redirects unless configured otherwise
pub const DEFAULT_REDIRECT_STATUS: u16 = 301;

/// Path-addressed image derivative cache
pub struct Imagix {
    formats: FormatRegistry,
    processor: Box<dyn ImageProcessor>,
    sources: PathGuard,
    destinations: PathGuard,
    sweeper: RetentionSweeper,
    decorator: Option<Box<dyn Decorator>>,
    inflight: InFlight,
    redirect_status: u16,
}

impl Imagix {
    /// Create an orchestrator over two existing directories
    pub fn new(
        formats: FormatRegistry,
        processor: impl ImageProcessor + 'static,
        source_root: impl AsRef<Path>,
        destination_root: impl AsRef<Path>,
    ) -> ImagixResult<Self> {
        let sources = PathGuard::new(source_root)?;
        let destinations = PathGuard::new(destination_root)?;

        debug!(
            "Imagix sources={} destinations={} formats={}",
            sources.root().display(),
            destinations.root().display(),
            formats.len()
        );

        Ok(Self {
            formats,
            processor: Box::new(processor),
            sweeper: RetentionSweeper::new(destinations.clone()),
            sources,
            destinations,
            decorator: None,
            inflight: InFlight::new(),
            redirect_status: DEFAULT_REDIRECT_STATUS,
        })
    }

    /// Rewrite URLs through `decorator` at the public boundary
    pub fn with_decorator(mut self, decorator: impl Decorator + 'static) -> Self {
        self.decorator = Some(Box::new(decorator));
        self
    }

    /// Status code for stale-URL redirects
    pub fn with_redirect_status(mut self, status: u16) -> Self {
        self.redirect_status = status;
        self
    }

    pub fn source_root(&self) -> &Path {
        self.sources.root()
    }

    pub fn destination_root(&self) -> &Path {
        self.destinations.root()
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn decorator(&self) -> Option<&dyn Decorator> {
        self.decorator.as_deref()
    }

    pub fn redirect_status(&self) -> u16 {
        self.redirect_status
    }

    /// Cache URL for `source` rendered in `format`
    ///
    /// A source that does not exist under the source root is returned
    /// unchanged, so callers can link it and let the web server 404.
    pub fn url(&self, source: &str, format: &str) -> ImagixResult<String> {
        SourceRef::parse(source)?;
        self.formats.lookup(format)?;

        let Some(file) = self.sources.resolve(source)? else {
            debug!("Source {} not found, passing through", source);
            return Ok(source.to_string());
        };

        // Keys must name the source the way compile will look it up
        let source_ref = SourceRef::parse(&self.sources.normalize(source)?)?;
        let key = source_ref.key(format, epoch_secs(modified(&file)?));
        Ok(self.outbound(&key.to_string()))
    }

    /// Source path and format name encoded in a cache URL
    pub fn source(&self, destination: &str) -> ImagixResult<(String, String)> {
        let key = self.parse_destination(destination)?;
        Ok((key.source().to_string(), key.format().to_string()))
    }

    /// The URL `destination` should be served under right now
    pub fn effective(&self, destination: &str) -> ImagixResult<String> {
        let (source, format) = self.source(destination)?;
        self.url(&source, &format)
    }

    /// Make sure the derivative for `destination` exists and return its path
    ///
    /// A stale `destination` (older mtime) yields the path of the current
    /// variant; superseded variants are removed on the way.
    pub fn compile(&self, destination: &str) -> ImagixResult<PathBuf> {
        let logical = self.inbound(destination)?;

        // Traversal is rejected before anything else touches the disk
        let existing = self.guard_destination(&logical)?;
        let key = CacheKey::parse(&logical)?;
        let source = key.source();

        let Some(source_file) = self.sources.resolve(&source.to_string())? else {
            let purged = self
                .sweeper
                .sweep(&VariantFilter::for_source(source.clone()).with_format(Some(key.format())))?;
            if purged.count() > 0 {
                info!(
                    "Source {} is gone, purged {} orphaned variant(s)",
                    source,
                    purged.count()
                );
            }
            return Err(ImagixError::SourceNotFound(source.to_string()));
        };

        if let Some(file) = existing {
            debug!("Cache hit {}", logical);
            return Ok(file);
        }

        let current = source.key(key.format(), epoch_secs(modified(&source_file)?));
        self.generate(&source_file, &current)
    }

    /// Deliver `destination` through `responder`
    pub fn send(
        &self,
        destination: &str,
        responder: &mut dyn Responder,
    ) -> ImagixResult<Delivery> {
        self.guard_destination(&self.inbound(destination)?)?;

        let effective = self.effective(destination)?;
        if effective != destination {
            debug!("Redirecting {} to {}", destination, effective);
            responder.send_redirect(&effective, self.redirect_status)?;
            return Ok(Delivery::Redirect(effective));
        }

        let file = self.compile(destination)?;
        let modified = modified(&file)?;

        if responder.is_unmodified_since(modified) {
            responder.send_not_modified(&file, modified)?;
            Ok(Delivery::NotModified(file))
        } else {
            responder.send_file(&file, modified)?;
            Ok(Delivery::File(file))
        }
    }

    /// Delete cached variants of one source
    pub fn unlink(
        &self,
        source: &str,
        format: Option<&str>,
        lifetime: Option<Duration>,
    ) -> ImagixResult<SweepReport> {
        if let Some(format) = format {
            validate_format_name(format)?;
        }
        let filter = VariantFilter::for_source(SourceRef::parse(source)?)
            .with_format(format)
            .older_than(lifetime);
        self.sweeper.sweep(&filter)
    }

    /// Delete cached variants across the whole destination root
    ///
    /// Without a format or lifetime this clears the root entirely.
    pub fn remove(
        &self,
        format: Option<&str>,
        lifetime: Option<Duration>,
    ) -> ImagixResult<SweepReport> {
        let filter = Self::removal_filter(format, lifetime)?;
        if filter.is_unfiltered() {
            self.sweeper.clear()
        } else {
            self.sweeper.sweep(&filter)
        }
    }

    /// Paths [`remove`](Self::remove) would delete
    pub fn plan_remove(
        &self,
        format: Option<&str>,
        lifetime: Option<Duration>,
    ) -> ImagixResult<Vec<PathBuf>> {
        let filter = Self::removal_filter(format, lifetime)?;
        if filter.is_unfiltered() {
            self.sweeper.plan_clear()
        } else {
            self.sweeper.plan(&filter)
        }
    }

    fn removal_filter(
        format: Option<&str>,
        lifetime: Option<Duration>,
    ) -> ImagixResult<VariantFilter> {
        if let Some(format) = format {
            validate_format_name(format)?;
        }
        Ok(VariantFilter::all().with_format(format).older_than(lifetime))
    }

    fn generate(&self, source_file: &Path, key: &CacheKey) -> ImagixResult<PathBuf> {
        let transform = self.formats.lookup(key.format())?;
        let logical = key.to_string();
        let target = self.destinations.confine(&logical)?;

        self.inflight.run(&logical, || {
            let superseded = VariantFilter::for_source(key.source())
                .with_format(Some(key.format()))
                .keeping(key);
            self.sweeper.sweep(&superseded)?;

            if target.is_file() {
                debug!("{} was generated concurrently", logical);
                return Ok(target.clone());
            }

            let parent = target.parent().ok_or_else(|| {
                ImagixError::Internal(format!("no parent directory for {}", target.display()))
            })?;
            self.destinations.create_dir_within(parent)?;

            let mut decoded = self.processor.load(source_file)?;
            transform(&mut decoded.image);
            self.processor.save(&decoded, &target)?;

            info!("Generated {}", logical);
            Ok(target.clone())
        })
    }

    /// Existing cache file at `logical`, rejecting paths outside the root
    fn guard_destination(&self, logical: &str) -> ImagixResult<Option<PathBuf>> {
        self.destinations.confine(logical)?;
        self.destinations.resolve(logical)
    }

    fn parse_destination(&self, destination: &str) -> ImagixResult<CacheKey> {
        CacheKey::parse(&self.inbound(destination)?)
    }

    /// Strip decoration from a client URL, rejecting empty file names first
    fn inbound(&self, destination: &str) -> ImagixResult<String> {
        let file_name = destination.rsplit('/').next().unwrap_or_default();
        if file_name.is_empty() {
            return Err(ImagixError::MalformedDestination(destination.to_string()));
        }

        Ok(match &self.decorator {
            Some(decorator) => decorator.inbound(destination),
            None => destination.to_string(),
        })
    }

    fn outbound(&self, url: &str) -> String {
        match &self.decorator {
            Some(decorator) => decorator.outbound(url),
            None => url.to_string(),
        }
    }
}

impl std::fmt::Debug for Imagix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Imagix")
            .field("sources", &self.sources)
            .field("destinations", &self.destinations)
            .field("formats", &self.formats)
            .field("decorated", &self.decorator.is_some())
            .field("redirect_status", &self.redirect_status)
            .finish()
    }
}

fn modified(path: &Path) -> ImagixResult<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| ImagixError::io(format!("reading mtime of {}", path.display()), e))
}
