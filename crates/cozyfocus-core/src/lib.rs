//! # CozyFocus Core Library
//!
//! Offline-first data core for the CozyFocus focus timer. Everything the
//! app stores lives in one local SQLite file; moving data between devices
//! happens through exported JSON bundles that are merged back without
//! ever overwriting newer local data.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-anchored countdown whose remaining time is
//!   always derived from its target end, so missed ticks never cause drift
//! - **Accounting**: Turns a finished run into a session plus updated day stats
//!   in a single transaction
//! - **Storage**: SQLite document collections and TOML-based configuration
//! - **Bundle / Merge**: Versioned export snapshots and a two-phase
//!   plan-then-apply import with per-entity conflict rules
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Database`]: Entity collections and typed repositories
//! - [`export_bundle`] / [`import_json`]: Moving data between stores
//! - [`Config`]: Application configuration management

pub mod accounting;
pub mod bundle;
pub mod clock;
pub mod day_key;
pub mod error;
pub mod merge;
pub mod model;
pub mod storage;
pub mod timer;

pub use accounting::{record_completion, stats_for_day, stats_range, StatsSummary};
pub use bundle::{export_bundle, parse_bundle, ExportBundle, IncomingBundle, APP_ID};
pub use clock::{Clock, ManualClock, MonotonicStamp, SystemClock};
pub use day_key::{day_key, day_key_in, parse_day_key};
pub use error::{BundleError, ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use merge::{import_json, prepare_import, EntityCounts, MergePlan, PreparedImport};
pub use model::{DayStats, Doc, Note, Session, SessionType, SettingEnvelope, Tag, Task};
pub use storage::{Config, Database};
pub use timer::{ModeDurations, TimerCompletion, TimerEngine, TimerEvent, TimerSnapshot, TimerStatus};
