//! Everything needed to drive the executor against a host.
//!
//! ```ignore
//! use exstrings::prelude::*;
//! ```

pub use crate::{Args, EngineConfig, Error, Executor, Host, MemoryStore, Reply, Result};
