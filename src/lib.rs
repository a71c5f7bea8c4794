//! Imagix - path-addressed image derivative cache
//!
//! Derived images live at URLs that embed the source file's mtime
//! (`/photos/cat@thumb@1700000000.jpg`). Editing a source changes every
//! URL derived from it, so caches never serve stale pixels, and stale URLs
//! are redirected to the current ones.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod decorator;
pub mod error;
pub mod format;
pub mod guard;
pub mod imagix;
pub mod processor;
pub mod response;
pub mod ui;

pub use decorator::{Decorator, PrefixDecorator};
pub use error::{ImagixError, ImagixResult};
pub use format::{FormatRegistry, Recipe};
pub use imagix::Imagix;
pub use processor::{ImageProcessor, RasterProcessor};
pub use response::{CgiResponder, Delivery, Responder};
