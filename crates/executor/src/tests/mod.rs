//! Test modules for the executor crate.

use std::sync::Arc;

use exstrings_core::{Args, Reply};
use exstrings_storage::MemoryStore;

use crate::Executor;


/// Executor over a fresh in-memory store.
pub(crate) fn create_test_executor() -> Executor<MemoryStore> {
    Executor::new(Arc::new(MemoryStore::new())).unwrap()
}

/// Run one whitespace-separated command line.
pub(crate) fn run(executor: &Executor<MemoryStore>, line: &str) -> Reply {
    executor.execute(&Args::from_line(line))
}

/// Bulk reply helper.
pub(crate) fn bulk(s: &str) -> Reply {
    Reply::bulk(s)
}
