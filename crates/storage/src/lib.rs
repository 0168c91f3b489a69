//! Storage layer for exstrings
//!
//! This crate provides the in-process host the engines run inside during
//! tests, benches and embedding:
//! - MemoryStore: BTreeMap-based keyspace behind a parking_lot RwLock,
//!   implementing the `Host` interface
//! - StoredValue: typed payload with optional expiry
//! - glob_match: SCAN `MATCH` pattern matching

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod pattern;
pub mod stored_value;

pub use memory::{Fault, MemoryStore, Published};
pub use pattern::glob_match;
pub use stored_value::{Data, StoredValue};
