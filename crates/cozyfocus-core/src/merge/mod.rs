//! Import of exported bundles into the local store.
//!
//! Import runs in two phases. [`prepare_import`] normalizes every incoming
//! record, decides add/update/skip against the store and collects the
//! result into a [`MergePlan`] without writing. [`PreparedImport::apply`]
//! then writes the cached decisions with one bulk upsert per collection.
//!
//! Conflict rules per entity live in [`decide`]; records from old exports
//! are brought into shape by [`normalize`].

pub mod decide;
mod engine;
pub mod normalize;
mod plan;
mod settings;

pub use decide::{Decision, KnownTags};
pub use engine::{import_bundle, import_json, prepare_import, prepare_import_with, PreparedImport};
pub use plan::{EntityCounts, MergePlan};
pub use settings::{Recognizer, SettingKeyResolver};
