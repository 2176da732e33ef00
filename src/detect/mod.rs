//! Update detection layer
//!
//! # Modules
//!
//! - [`detector`]: Per-project update detection and classification
//! - [`health`]: External-service health probes
//! - [`manifest`]: Declared-version resolution from project manifests

pub mod detector;
pub mod health;
pub mod manifest;

pub use detector::{DetectionReport, UpdateDetector, UpdateRecord};
