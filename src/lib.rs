// src/lib.rs

//! Flappy Package Manager
//!
//! Package manager for FlucidOS. This crate holds the metadata ingestion
//! path: taking a package archive of unknown provenance, checking that it is
//! structurally legal, extracting its single `.PKGINFO` entry and parsing it
//! into a [`PackageRecord`].
//!
//! # Architecture
//!
//! - Feed-forward: archive scanner, then metadata parser, no callbacks
//! - Fail fast: the first violated rule aborts with a specific [`Error`]
//! - No partial results: a [`PackageRecord`] only exists once validated

mod error;
pub mod packages;

pub use error::{Error, Phase, Result};
pub use packages::{PackageRecord, ReadOptions, UnknownKeyPolicy, read_package};

/// Distribution tagline shown by `flappy version`
pub const TAGLINE: &str = "Package manager for FlucidOS";
