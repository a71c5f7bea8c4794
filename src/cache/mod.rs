//! Cache file addressing and housekeeping
//!
//! Every cached derivative lives at a path computed from its source:
//!
//! | Source | Format | mtime | Cache path |
//! |--------|--------|-------|------------|
//! | `/favicon.png` | `foo` | 1700000000 | `/favicon@foo@1700000000.png` |
//! | `/a/b/photo.jpg` | `thumb` | 42 | `/a/b/photo@thumb@42.jpg` |
//! | `/README` | `small` | 7 | `/README@small@7` |
//!
//! Editing the source changes its mtime and therefore the cache path, so
//! stale files are never served. Superseded variants are removed by the
//! [`RetentionSweeper`]; concurrent generation of one path is serialized
//! through [`InFlight`].

pub mod inflight;
pub mod key;
pub mod sweeper;

pub use inflight::InFlight;
pub use key::{decode, encode, CacheKey, SourceRef};
pub use sweeper::{RetentionSweeper, SweepReport, VariantFilter};
