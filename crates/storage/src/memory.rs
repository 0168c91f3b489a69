//! MemoryStore: in-process host for the exstrings engines
//!
//! Implements [`Host`] over:
//! - `BTreeMap<Vec<u8>, StoredValue>` for ordered keys with optional expiry
//! - `parking_lot::RwLock` for thread-safe sub-command execution
//! - a separate `parking_lot::Mutex<()>` as the store-wide exclusive lock
//!
//! # Design Notes
//!
//! - **Key-ordered SCAN cursors**: a cursor names the next key to visit
//!   (hex-encoded behind a `k` prefix). Keys present for a whole walk are
//!   returned exactly once even when earlier keys are deleted mid-walk.
//! - **COUNT is work, not results**: each SCAN call examines up to COUNT
//!   live keys and returns the ones that match, so sparse patterns produce
//!   empty batches.
//! - **Lazy expiry**: expired entries read as absent and are reaped by the
//!   next write.
//! - **Test hooks**: every sub-command is recorded, publishes are logged,
//!   and a fault can be injected per sub-command.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::debug;

use exstrings_core::literals::{COUNT_KEYWORD, MATCH_KEYWORD, ZERO_CURSOR};
use exstrings_core::{Host, KeyType, Reply, Subcommand};

use crate::pattern::glob_match;
use crate::stored_value::{Data, StoredValue};

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

/// A canned failure returned instead of running a sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The host produces no reply at all.
    NoReply,
    /// The host replies with this error line.
    Error(String),
}

/// A message recorded by PUBLISH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Channel name
    pub channel: Vec<u8>,
    /// Message payload
    pub message: Vec<u8>,
}

/// Thread-safe in-memory key-value store implementing [`Host`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    keyspace: RwLock<BTreeMap<Vec<u8>, StoredValue>>,
    exclusive: Mutex<()>,
    published: Mutex<Vec<Published>>,
    calls: Mutex<Vec<Subcommand>>,
    faults: Mutex<HashMap<Subcommand, Fault>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Direct access (bypasses the call log)
    // =========================================================================

    /// Store a string value without expiry.
    pub fn set_string(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        self.keyspace.write().insert(
            key.as_ref().to_vec(),
            StoredValue::new(Data::String(value.as_ref().to_vec())),
        );
    }

    /// Store a string value that expires after `ttl`.
    pub fn set_string_with_ttl(
        &self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        ttl: Duration,
    ) {
        self.keyspace.write().insert(
            key.as_ref().to_vec(),
            StoredValue::with_ttl(Data::String(value.as_ref().to_vec()), Some(ttl)),
        );
    }

    /// Store a list value.
    pub fn set_list<I, T>(&self, key: impl AsRef<[u8]>, items: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let items = items.into_iter().map(|i| i.as_ref().to_vec()).collect();
        self.keyspace
            .write()
            .insert(key.as_ref().to_vec(), StoredValue::new(Data::List(items)));
    }

    /// Store a set value.
    pub fn set_members<I, T>(&self, key: impl AsRef<[u8]>, members: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let members: BTreeSet<Vec<u8>> = members.into_iter().map(|m| m.as_ref().to_vec()).collect();
        self.keyspace
            .write()
            .insert(key.as_ref().to_vec(), StoredValue::new(Data::Set(members)));
    }

    /// Store a hash value.
    pub fn set_hash<I, F, V>(&self, key: impl AsRef<[u8]>, fields: I)
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let fields = fields
            .into_iter()
            .map(|(f, v)| (f.as_ref().to_vec(), v.as_ref().to_vec()))
            .collect();
        self.keyspace
            .write()
            .insert(key.as_ref().to_vec(), StoredValue::new(Data::Hash(fields)));
    }

    /// Remove a key directly. Returns whether a live key was removed.
    pub fn remove(&self, key: impl AsRef<[u8]>) -> bool {
        self.keyspace
            .write()
            .remove(key.as_ref())
            .map_or(false, |sv| !sv.is_expired())
    }

    /// Current string value of `key`, if it is a live string.
    pub fn get_string(&self, key: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        let keyspace = self.keyspace.read();
        keyspace
            .get(key.as_ref())
            .filter(|sv| !sv.is_expired())
            .and_then(|sv| sv.as_string().map(<[u8]>::to_vec))
    }

    /// Stored payload of `key`, if live.
    pub fn get_data(&self, key: impl AsRef<[u8]>) -> Option<Data> {
        let keyspace = self.keyspace.read();
        keyspace
            .get(key.as_ref())
            .filter(|sv| !sv.is_expired())
            .map(|sv| sv.data().clone())
    }

    /// True if `key` is live.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.get_data(key).is_some()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.keyspace
            .read()
            .values()
            .filter(|sv| !sv.is_expired())
            .count()
    }

    /// True if no live keys remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Test hooks
    // =========================================================================

    /// Everything published so far, oldest first.
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    /// Sub-commands issued through [`Host::call`], in order.
    pub fn calls(&self) -> Vec<Subcommand> {
        self.calls.lock().clone()
    }

    /// How many times `command` was issued.
    pub fn call_count(&self, command: Subcommand) -> usize {
        self.calls.lock().iter().filter(|c| **c == command).count()
    }

    /// Forget recorded calls and publishes.
    pub fn reset_log(&self) {
        self.calls.lock().clear();
        self.published.lock().clear();
    }

    /// Make every future `command` fail with `fault` until cleared.
    pub fn inject_fault(&self, command: Subcommand, fault: Fault) {
        self.faults.lock().insert(command, fault);
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    // =========================================================================
    // Sub-commands
    // =========================================================================

    fn get(&self, args: &[&[u8]]) -> Reply {
        let [key] = args else {
            return wrong_arity("get");
        };
        let keyspace = self.keyspace.read();
        match keyspace.get(*key).filter(|sv| !sv.is_expired()) {
            None => Reply::Null,
            Some(sv) => match sv.as_string() {
                Some(value) => Reply::bulk(value),
                None => Reply::Error(WRONGTYPE.to_string()),
            },
        }
    }

    fn set(&self, args: &[&[u8]]) -> Reply {
        let [key, value, options @ ..] = args else {
            return wrong_arity("set");
        };
        let options = match SetOptions::parse(options) {
            Ok(options) => options,
            Err(reply) => return reply,
        };

        let mut keyspace = self.keyspace.write();
        let existing = keyspace.get(*key).filter(|sv| !sv.is_expired()).is_some();
        if (options.only_if_absent && existing) || (options.only_if_present && !existing) {
            return Reply::Null;
        }
        keyspace.insert(
            key.to_vec(),
            StoredValue::with_ttl(Data::String(value.to_vec()), options.ttl),
        );
        Reply::ok()
    }

    fn mset(&self, args: &[&[u8]]) -> Reply {
        if args.is_empty() || args.len() % 2 != 0 {
            return wrong_arity("mset");
        }
        let mut keyspace = self.keyspace.write();
        for pair in args.chunks_exact(2) {
            keyspace.insert(
                pair[0].to_vec(),
                StoredValue::new(Data::String(pair[1].to_vec())),
            );
        }
        Reply::ok()
    }

    fn mget(&self, args: &[&[u8]]) -> Reply {
        if args.is_empty() {
            return wrong_arity("mget");
        }
        let keyspace = self.keyspace.read();
        let values = args
            .iter()
            .map(|key| {
                keyspace
                    .get(*key)
                    .filter(|sv| !sv.is_expired())
                    .and_then(StoredValue::as_string)
                    .map_or(Reply::Null, Reply::bulk)
            })
            .collect();
        Reply::Array(values)
    }

    fn unlink(&self, args: &[&[u8]]) -> Reply {
        if args.is_empty() {
            return wrong_arity("unlink");
        }
        let mut keyspace = self.keyspace.write();
        let removed = args
            .iter()
            .filter_map(|key| keyspace.remove(*key))
            .filter(|sv| !sv.is_expired())
            .count();
        Reply::Integer(removed as i64)
    }

    fn publish(&self, args: &[&[u8]]) -> Reply {
        let [channel, message] = args else {
            return wrong_arity("publish");
        };
        self.published.lock().push(Published {
            channel: channel.to_vec(),
            message: message.to_vec(),
        });
        // No subscribers are modelled.
        Reply::Integer(0)
    }

    fn scan(&self, args: &[&[u8]]) -> Reply {
        let [cursor, options @ ..] = args else {
            return wrong_arity("scan");
        };
        let start = match decode_cursor(cursor) {
            Some(start) => start,
            None => return Reply::Error("ERR invalid cursor".to_string()),
        };

        let mut pattern: Option<&[u8]> = None;
        let mut count = 10usize;
        let mut rest = options.iter();
        while let Some(option) = rest.next() {
            let value = match rest.next() {
                Some(value) => *value,
                None => return syntax_error(),
            };
            if option.eq_ignore_ascii_case(MATCH_KEYWORD) {
                pattern = Some(value);
            } else if option.eq_ignore_ascii_case(COUNT_KEYWORD) {
                count = match parse_usize(value) {
                    Some(n) if n >= 1 => n,
                    _ => return syntax_error(),
                };
            } else {
                return syntax_error();
            }
        }

        let keyspace = self.keyspace.read();
        let lower = match &start {
            Some(key) => Bound::Included(key.as_slice()),
            None => Bound::Unbounded,
        };
        let mut live = keyspace
            .range::<[u8], _>((lower, Bound::Unbounded))
            .filter(|(_, sv)| !sv.is_expired());

        let mut batch = Vec::new();
        for (key, _) in live.by_ref().take(count) {
            if pattern.map_or(true, |p| glob_match(p, key)) {
                batch.push(Reply::bulk(key));
            }
        }
        let next = match live.next() {
            Some((key, _)) => encode_cursor(key),
            None => ZERO_CURSOR.to_vec(),
        };

        Reply::Array(vec![Reply::Bulk(next), Reply::Array(batch)])
    }
}

impl Host for MemoryStore {
    type Guard<'a> = MutexGuard<'a, ()>;

    fn key_type(&self, key: &[u8]) -> KeyType {
        self.keyspace
            .read()
            .get(key)
            .filter(|sv| !sv.is_expired())
            .map_or(KeyType::Empty, StoredValue::key_type)
    }

    fn call(&self, command: Subcommand, args: &[&[u8]]) -> Option<Reply> {
        self.calls.lock().push(command);

        if let Some(fault) = self.faults.lock().get(&command).cloned() {
            debug!(target: "exstrings::store", command = command.name(), ?fault, "Injected fault");
            return match fault {
                Fault::NoReply => None,
                Fault::Error(message) => Some(Reply::Error(message)),
            };
        }

        let reply = match command {
            Subcommand::Get => self.get(args),
            Subcommand::Set => self.set(args),
            Subcommand::Mset => self.mset(args),
            Subcommand::Mget => self.mget(args),
            Subcommand::Unlink => self.unlink(args),
            Subcommand::Publish => self.publish(args),
            Subcommand::Scan => self.scan(args),
        };
        self.reap_expired_if_write(command);
        Some(reply)
    }

    fn lock(&self) -> Self::Guard<'_> {
        self.exclusive.lock()
    }
}

impl MemoryStore {
    fn reap_expired_if_write(&self, command: Subcommand) {
        if matches!(
            command,
            Subcommand::Set | Subcommand::Mset | Subcommand::Unlink
        ) {
            self.keyspace.write().retain(|_, sv| !sv.is_expired());
        }
    }
}

/// Options accepted after `SET key value`.
#[derive(Debug, Default)]
struct SetOptions {
    ttl: Option<Duration>,
    only_if_absent: bool,
    only_if_present: bool,
}

impl SetOptions {
    fn parse(options: &[&[u8]]) -> Result<Self, Reply> {
        let mut parsed = SetOptions::default();
        let mut rest = options.iter();
        while let Some(option) = rest.next() {
            if option.eq_ignore_ascii_case(b"NX") && !parsed.only_if_present {
                parsed.only_if_absent = true;
            } else if option.eq_ignore_ascii_case(b"XX") && !parsed.only_if_absent {
                parsed.only_if_present = true;
            } else if option.eq_ignore_ascii_case(b"EX") || option.eq_ignore_ascii_case(b"PX") {
                if parsed.ttl.is_some() {
                    return Err(syntax_error());
                }
                let amount = rest
                    .next()
                    .and_then(|v| parse_usize(v))
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        Reply::Error("ERR invalid expire time in 'set' command".to_string())
                    })? as u64;
                parsed.ttl = Some(if option.eq_ignore_ascii_case(b"EX") {
                    Duration::from_secs(amount)
                } else {
                    Duration::from_millis(amount)
                });
            } else {
                return Err(syntax_error());
            }
        }
        Ok(parsed)
    }
}

fn wrong_arity(command: &str) -> Reply {
    Reply::Error(format!(
        "ERR wrong number of arguments for '{}' command",
        command
    ))
}

fn syntax_error() -> Reply {
    Reply::Error("ERR syntax error".to_string())
}

fn parse_usize(raw: &[u8]) -> Option<usize> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

/// `"0"` starts from the first key; `k<hex>` resumes at that key.
fn decode_cursor(cursor: &[u8]) -> Option<Option<Vec<u8>>> {
    if cursor == ZERO_CURSOR {
        return Some(None);
    }
    let hex = cursor.strip_prefix(b"k")?;
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.chunks_exact(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect::<Option<Vec<u8>>>()
        .map(Some)
}

fn encode_cursor(key: &[u8]) -> Vec<u8> {
    let mut cursor = Vec::with_capacity(1 + key.len() * 2);
    cursor.push(b'k');
    for byte in key {
        cursor.extend_from_slice(format!("{:02x}", byte).as_bytes());
    }
    cursor
}
