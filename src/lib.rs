//! Fieldfare - species illustrative-image cache.
//!
//! This crate is the image subsystem of an acoustic species-detection
//! station dashboard: given a scientific name it produces a representative
//! photograph from one of several third-party providers, cached durably so
//! recurring detections of the same species never re-hit the upstream.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the lookup orchestration.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for store, blacklist, taxonomy,
/// configuration, and the upstream providers.
pub mod infrastructure;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "fieldfare";
