// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Which stage of metadata ingestion produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Archive structure checks and `.PKGINFO` extraction
    Archive,
    /// Parsing the extracted `.PKGINFO` text
    Metadata,
}

/// Core error types for Flappy
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be opened or decoded as a tar stream
    #[error("Cannot open archive {}: {source}", .path.display())]
    ArchiveOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An archive entry has an empty path name
    #[error("Archive entry has no name")]
    EntryNameMissing,

    /// An entry path is absolute or contains `..`
    #[error("Archive contains unsafe path: {0}")]
    UnsafePath(String),

    /// `.PKGINFO` exists but is a directory, symlink, device, ...
    #[error(".PKGINFO is not a regular file")]
    MetadataNotRegularFile,

    /// A second root-level `.PKGINFO` entry was found
    #[error("Archive contains multiple .PKGINFO entries")]
    DuplicateMetadata,

    /// `.PKGINFO` content exceeded the size ceiling
    #[error(".PKGINFO exceeds maximum allowed size of {limit} bytes")]
    MetadataTooLarge { limit: usize },

    /// Reading `.PKGINFO` content from the decoder failed
    #[error("Error reading .PKGINFO: {0}")]
    MetadataReadError(#[source] std::io::Error),

    /// `.PKGINFO` has no content
    #[error(".PKGINFO is empty")]
    MetadataEmpty,

    /// An entry other than the root `.PKGINFO` has `.PKGINFO` in its path
    #[error("Invalid .PKGINFO location: {0}")]
    MetadataMisplaced(String),

    /// The tar stream broke while iterating entries
    #[error("Archive read error: {0}")]
    ArchiveStreamError(#[source] std::io::Error),

    /// No `.PKGINFO` entry in the archive
    #[error("Archive missing required .PKGINFO")]
    MetadataMissing,

    /// A `.PKGINFO` line is longer than the per-line cap
    #[error("PKGINFO line {line} is {length} bytes, exceeding maximum of {limit}")]
    LineTooLong {
        line: usize,
        length: usize,
        limit: usize,
    },

    /// A non-blank line without `=`
    #[error("Malformed line {line} in PKGINFO: {content}")]
    MalformedLine { line: usize, content: String },

    /// A line whose key is empty after trimming
    #[error("Empty key in PKGINFO at line {line}")]
    EmptyKey { line: usize },

    /// A single-value key appeared more than once
    #[error("Duplicate {field} at line {line}")]
    DuplicateField { field: &'static str, line: usize },

    /// The `size` value is not a plain base-10 unsigned integer
    #[error("Invalid size value: {value:?}")]
    InvalidSize { value: String },

    /// One or more of `pkgname`, `pkgver`, `arch` never appeared
    #[error("Missing required PKGINFO fields: {}", .missing.join(", "))]
    MissingRequiredFields { missing: Vec<&'static str> },

    /// A line is not valid UTF-8
    #[error("PKGINFO line {line} is not valid UTF-8")]
    InvalidUtf8 { line: usize },

    /// An unrecognized key under the strict unknown-key policy
    #[error("Unknown PKGINFO key {key:?} at line {line}")]
    UnknownKey { key: String, line: usize },
}

impl Error {
    /// Stable identifier for the failure kind, used in machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ArchiveOpenFailed { .. } => "archive-open-failed",
            Error::EntryNameMissing => "entry-name-missing",
            Error::UnsafePath(_) => "unsafe-path",
            Error::MetadataNotRegularFile => "metadata-not-regular-file",
            Error::DuplicateMetadata => "duplicate-metadata",
            Error::MetadataTooLarge { .. } => "metadata-too-large",
            Error::MetadataReadError(_) => "metadata-read-error",
            Error::MetadataEmpty => "metadata-empty",
            Error::MetadataMisplaced(_) => "metadata-misplaced",
            Error::ArchiveStreamError(_) => "archive-stream-error",
            Error::MetadataMissing => "metadata-missing",
            Error::LineTooLong { .. } => "line-too-long",
            Error::MalformedLine { .. } => "malformed-line",
            Error::EmptyKey { .. } => "empty-key",
            Error::DuplicateField { .. } => "duplicate-field",
            Error::InvalidSize { .. } => "invalid-size",
            Error::MissingRequiredFields { .. } => "missing-required-fields",
            Error::InvalidUtf8 { .. } => "invalid-utf8",
            Error::UnknownKey { .. } => "unknown-key",
        }
    }

    /// The ingestion stage that raised this error
    pub fn phase(&self) -> Phase {
        match self {
            Error::MalformedLine { .. }
            | Error::EmptyKey { .. }
            | Error::DuplicateField { .. }
            | Error::InvalidSize { .. }
            | Error::MissingRequiredFields { .. }
            | Error::InvalidUtf8 { .. }
            | Error::UnknownKey { .. } => Phase::Metadata,
            _ => Phase::Archive,
        }
    }
}

/// Result type alias using Flappy's Error type
pub type Result<T> = std::result::Result<T, Error>;
