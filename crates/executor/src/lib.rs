//! # exstrings executor
//!
//! Command table, argument parsing and dispatch. This is the layer a host
//! registers: hand it an argument vector and it replies.
//!
//! - [`command_table`] - names, flags, key positions and arity of every command
//! - [`Command`] - a parsed, validated invocation
//! - [`Executor`] - routes commands to the engines and produces replies
//!
//! ## Quick Start
//!
//! ```text
//! use std::sync::Arc;
//! use exstrings_core::Args;
//! use exstrings_executor::Executor;
//! use exstrings_storage::MemoryStore;
//!
//! let executor = Executor::new(Arc::new(MemoryStore::new()))?;
//! let reply = executor.execute(&Args::from_line("SETNXPUB lock owner-1 locks acquired"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod executor;
mod output;
pub mod registry;

#[cfg(test)]
mod tests;

pub use command::Command;
pub use executor::Executor;
pub use output::Dispatch;
pub use registry::{command_table, Arity, CommandName, CommandSpec};
