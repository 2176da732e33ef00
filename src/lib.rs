//! depsync: dependency-version monitoring and guarded upgrade application
//!
//! The pipeline flows one direction: detection (per project, in parallel)
//! produces an aggregate update list, routing splits it into auto-apply and
//! manual-review, application runs sequentially with rollback on failure,
//! and a summary goes to the notification sinks.

pub mod apply;
pub mod config;
pub mod detect;
pub mod notify;
pub mod orchestrator;
pub mod router;
pub mod version;
