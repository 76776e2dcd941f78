//! Portable export bundles.
//!
//! A bundle is a versioned JSON snapshot of every local collection, tagged
//! with the application id so foreign files are rejected before any merge.

mod export;
mod types;

pub use export::export_bundle;
pub use types::{parse_bundle, BundleData, ExportBundle, IncomingBundle, IncomingData, APP_ID};
