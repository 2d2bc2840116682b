// src/packages/mod.rs

//! Package archive metadata ingestion
//!
//! A package archive goes through two stages, strictly in order:
//! - [`archive`]: stream the tar archive, enforce its structural rules and
//!   isolate the raw `.PKGINFO` bytes
//! - [`pkginfo`]: parse those bytes into a [`PackageRecord`]

pub mod archive;
pub mod pkginfo;
pub mod record;

pub use archive::{MAX_PKGINFO_LINE, MAX_PKGINFO_SIZE, extract_metadata};
pub use pkginfo::{UnknownKeyPolicy, parse, parse_with};
pub use record::PackageRecord;

use crate::error::Result;
use std::path::Path;
use tracing::{debug, error};

/// Options controlling how package metadata is read
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Treatment of `.PKGINFO` keys the parser does not know
    pub unknown_keys: UnknownKeyPolicy,
}

impl ReadOptions {
    /// Options that reject unknown `.PKGINFO` keys
    pub fn strict() -> Self {
        Self {
            unknown_keys: UnknownKeyPolicy::Reject,
        }
    }
}

/// Read and validate the metadata of a package archive
///
/// Failures are logged with the archive path before being returned.
pub fn read_package(path: impl AsRef<Path>, options: &ReadOptions) -> Result<PackageRecord> {
    let path = path.as_ref();
    debug!("Reading package metadata: {}", path.display());

    extract_metadata(path)
        .and_then(|content| parse_with(&content, options))
        .inspect_err(|e| error!("{}: [{}] {}", path.display(), e.kind(), e))
}
