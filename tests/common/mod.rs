//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Once};

use parking_lot::{Mutex, MutexGuard};

use exstrings::{Args, Executor, Host, KeyType, MemoryStore, Reply, Subcommand};

static INIT_TRACING: Once = Once::new();

/// Route engine logs to the test harness. `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "exstrings=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Executor over a fresh in-memory store.
pub fn memory_executor() -> Executor<MemoryStore> {
    init_tracing();
    Executor::new(Arc::new(MemoryStore::new())).unwrap()
}

/// Executor over any host.
pub fn executor_for<H: Host + 'static>(host: H) -> Executor<H> {
    init_tracing();
    Executor::new(Arc::new(host)).unwrap()
}

/// Run one whitespace-separated command line.
pub fn run<H: Host + 'static>(executor: &Executor<H>, line: &str) -> Reply {
    executor.execute(&Args::from_line(line))
}

/// Bulk reply helper.
pub fn bulk(s: &str) -> Reply {
    Reply::bulk(s)
}

// ============================================================================
// ScriptedHost - replays canned replies per sub-command
// ============================================================================

/// Host that answers each sub-command from its own queue of canned replies
/// and records every call with its arguments. An exhausted queue means no
/// reply.
#[derive(Default)]
pub struct ScriptedHost {
    key_types: Mutex<Vec<(Vec<u8>, KeyType)>>,
    scripts: Mutex<Vec<(Subcommand, VecDeque<Reply>)>>,
    calls: Mutex<Vec<(Subcommand, Vec<Vec<u8>>)>>,
    exclusive: Mutex<()>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `key_type` for `key`; unknown keys are `Empty`.
    pub fn with_key_type(self, key: &str, key_type: KeyType) -> Self {
        self.key_types
            .lock()
            .push((key.as_bytes().to_vec(), key_type));
        self
    }

    /// Queue replies for `command`, consumed in order.
    pub fn script(self, command: Subcommand, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.scripts
            .lock()
            .push((command, replies.into_iter().collect()));
        self
    }

    /// Every call so far, as (sub-command, arguments).
    pub fn calls(&self) -> Vec<(Subcommand, Vec<Vec<u8>>)> {
        self.calls.lock().clone()
    }

    /// Sub-commands called so far, in order.
    pub fn call_names(&self) -> Vec<Subcommand> {
        self.calls.lock().iter().map(|(c, _)| *c).collect()
    }
}

impl Host for ScriptedHost {
    type Guard<'a> = MutexGuard<'a, ()>;

    fn key_type(&self, key: &[u8]) -> KeyType {
        self.key_types
            .lock()
            .iter()
            .find(|(k, _)| k == key)
            .map_or(KeyType::Empty, |(_, t)| *t)
    }

    fn call(&self, command: Subcommand, args: &[&[u8]]) -> Option<Reply> {
        self.calls
            .lock()
            .push((command, args.iter().map(|a| a.to_vec()).collect()));
        self.scripts
            .lock()
            .iter_mut()
            .find(|(c, _)| *c == command)
            .and_then(|(_, replies)| replies.pop_front())
    }

    fn lock(&self) -> Self::Guard<'_> {
        self.exclusive.lock()
    }
}

/// A SCAN reply: next cursor plus a batch of keys.
pub fn scan_reply(cursor: &str, keys: &[&str]) -> Reply {
    Reply::Array(vec![
        bulk(cursor),
        Reply::Array(keys.iter().map(|k| bulk(k)).collect()),
    ])
}

/// Arguments of a recorded call as strings.
pub fn strings(args: &[Vec<u8>]) -> Vec<String> {
    args.iter()
        .map(|a| String::from_utf8_lossy(a).into_owned())
        .collect()
}
