//! Version layer: registry polling, durable caching, and change classification
//!
//! # Modules
//!
//! - [`cache`]: SQLite-based version cache with caller-supplied TTLs
//! - [`registry`]: `VersionSource` trait for fetching latest versions
//! - [`registries`]: Concrete registry implementations (npm)
//! - [`semver`]: Version normalization and change-type classification
//! - [`error`]: Error types for cache and registry operations
//! - [`types`]: Common types like `VersionRecord`

pub mod cache;
pub mod error;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod types;
