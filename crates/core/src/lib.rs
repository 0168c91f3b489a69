//! Core types for exstrings
//!
//! This crate defines what every other layer shares:
//! - Args, PairView, KeyView: the argument vector and borrowed views over it
//! - Reply: the store's reply model
//! - Error: the error taxonomy, one variant per client-visible failure
//! - Host, HostExt: the interface of the store the engines run inside
//! - literals: batch size, cursor and keyword constants

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod error;
pub mod host;
pub mod literals;
pub mod reply;

pub use args::{Args, KeyView, PairView};
pub use error::{Error, Result};
pub use host::{Host, HostExt, KeyType, Subcommand};
pub use literals::{DEFAULT_BATCH_SIZE, ZERO_CURSOR};
pub use reply::Reply;
