//! exstrings - conditional string mutations and bulk scans for key-value stores
//!
//! exstrings is a command module a key-value store host loads to get:
//! - compare-and-set / compare-and-delete on string keys (SETIE, DELNE, ...)
//! - mutations that publish to channels only after the write took effect
//!   (MSETPUB, SETNXPUB, DELMPUB, ...)
//! - pattern walks that collect or delete every matching key (NGET, NDEL)
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use exstrings::prelude::*;
//!
//! let executor = Executor::new(Arc::new(MemoryStore::new()))?;
//! executor.host().set_string("mykey", "old");
//!
//! assert_eq!(executor.execute(&Args::from_line("SETIE mykey old new")), Reply::ok());
//! assert_eq!(executor.execute(&Args::from_line("SETIE mykey old again")), Reply::Null);
//! ```
//!
//! # Architecture
//!
//! All commands go through the [`Executor`], which parses arguments and
//! routes to the engines. The engines only see the store through the
//! [`Host`] trait; [`MemoryStore`] is the in-process host used by tests and
//! benchmarks.

pub mod prelude;

pub use exstrings_core::{
    Args, Error, Host, HostExt, KeyType, KeyView, PairView, Reply, Result, Subcommand,
};
pub use exstrings_engine::{
    BackgroundConfig, EngineConfig, LockDiscipline, OpFlag, ScanConfig, SchedulerStats,
    CONFIG_FILE_NAME,
};
pub use exstrings_executor::{
    command_table, Arity, Command, CommandName, CommandSpec, Dispatch, Executor,
};
pub use exstrings_storage::{Fault, MemoryStore, Published};
