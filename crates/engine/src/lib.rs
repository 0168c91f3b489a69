//! Engines for exstrings
//!
//! This crate holds the logic behind every command:
//! - conditional: set/delete gated on existence or current value, with publishes
//! - scan: resumable SCAN walks that collect or delete matching keys
//! - background: worker pool and single-shot replies for walks run off the dispatcher
//! - config: `exstrings.toml` loading
//!
//! The engines only talk to the store through `exstrings_core::Host`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod background;
pub mod conditional;
pub mod config;
pub mod scan;

pub use background::{BackgroundScheduler, BackpressureError, PendingReply, SchedulerStats};
pub use conditional::{gate_on_type, gate_on_value, ConditionalEngine, Family, Gate, OpFlag, TypeGate};
pub use config::{BackgroundConfig, EngineConfig, ScanConfig, CONFIG_FILE_NAME};
pub use scan::{
    collect_matching, collect_matching_held, delete_matching, delete_matching_held, LockDiscipline,
    WalkStats,
};
