//! Bulk scan engine
//!
//! Resumable, pattern-matched iteration over the keyspace. A walk fetches
//! key batches with `SCAN cursor MATCH pattern COUNT n` and resolves each
//! non-empty batch with one `MGET` (collect) or one `UNLINK` (delete), until
//! the host hands back the zero cursor.
//!
//! ## Walk states
//!
//! ```text
//! Start -> FetchBatch -> ResolveBatch -+-> FetchBatch (cursor != "0")
//!              |              |        +-> Done       (cursor == "0")
//!              +--------------+----------> Failed     (first host error)
//! ```
//!
//! ## Lock disciplines
//!
//! | Discipline | Store-wide lock |
//! |------------|-----------------|
//! | `Unlocked` | never taken; the dispatcher serializes commands |
//! | `HoldPerBatch` | from before each fetch until after its resolve |
//! | `PerCall` | around the fetch, then again around the resolve |
//!
//! A caller that already holds the lock (the dispatcher running a foreground
//! command) uses [`collect_matching_held`] / [`delete_matching_held`]. The
//! walk then runs entirely under the caller's guard and never locks again,
//! since the lock is not reentrant.
//!
//! Keys that vanish between their fetch and resolve are dropped from the
//! collect result without error.

use smallvec::SmallVec;
use tracing::{debug, info};

use exstrings_core::literals::{batch_arg, is_zero_cursor, COUNT_KEYWORD, MATCH_KEYWORD};
use exstrings_core::{Error, Host, HostExt, Reply, Result, Subcommand, ZERO_CURSOR};

/// How a walk uses the host's store-wide lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockDiscipline {
    /// Never lock.
    Unlocked,
    /// Hold the lock across each fetch and its resolve.
    HoldPerBatch,
    /// Lock each host call separately.
    PerCall,
}

/// Who holds the store-wide lock while a walk runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Holder {
    /// The caller holds it for the whole walk.
    Caller,
    /// The walk takes it according to the discipline.
    Walk(LockDiscipline),
}

impl Holder {
    fn discipline(self) -> LockDiscipline {
        match self {
            Holder::Caller => LockDiscipline::Unlocked,
            Holder::Walk(discipline) => discipline,
        }
    }
}

enum WalkState {
    Start,
    FetchBatch { cursor: Vec<u8> },
    ResolveBatch { next_cursor: Vec<u8>, keys: Vec<Vec<u8>> },
    Done,
    Failed(Error),
}

/// Counters for one finished walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// SCAN calls issued
    pub batches: usize,
    /// Keys returned by SCAN across all batches
    pub keys_seen: usize,
}

/// Drive one walk, calling `resolve` for every non-empty batch.
fn walk<H, F>(
    host: &H,
    pattern: &[u8],
    batch_size: usize,
    holder: Holder,
    mut resolve: F,
) -> Result<WalkStats>
where
    H: Host + ?Sized,
    F: FnMut(&[Vec<u8>]) -> Result<()>,
{
    let discipline = holder.discipline();
    let count = batch_arg(batch_size);
    let mut stats = WalkStats::default();
    let mut guard: Option<H::Guard<'_>> = None;
    let mut state = WalkState::Start;

    loop {
        state = match state {
            WalkState::Start => WalkState::FetchBatch {
                cursor: ZERO_CURSOR.to_vec(),
            },
            WalkState::FetchBatch { cursor } => {
                if discipline != LockDiscipline::Unlocked {
                    guard = Some(host.lock());
                }
                let fetched = fetch_batch(host, &cursor, pattern, &count);
                if discipline == LockDiscipline::PerCall {
                    drop(guard.take());
                }
                stats.batches += 1;
                match fetched {
                    Ok((next_cursor, keys)) => {
                        stats.keys_seen += keys.len();
                        debug!(
                            target: "exstrings::scan",
                            batch = stats.batches,
                            keys = keys.len(),
                            "Fetched batch"
                        );
                        WalkState::ResolveBatch { next_cursor, keys }
                    }
                    Err(e) => WalkState::Failed(e),
                }
            }
            WalkState::ResolveBatch { next_cursor, keys } => {
                let resolved = if keys.is_empty() {
                    Ok(())
                } else {
                    if discipline == LockDiscipline::PerCall {
                        guard = Some(host.lock());
                    }
                    resolve(&keys)
                };
                drop(guard.take());
                match resolved {
                    Ok(()) if is_zero_cursor(&next_cursor) => WalkState::Done,
                    Ok(()) => WalkState::FetchBatch {
                        cursor: next_cursor,
                    },
                    Err(e) => WalkState::Failed(e),
                }
            }
            WalkState::Done => return Ok(stats),
            WalkState::Failed(e) => {
                drop(guard.take());
                debug!(target: "exstrings::scan", error = %e, "Walk failed");
                return Err(e);
            }
        };
    }
}

/// `SCAN cursor MATCH pattern COUNT n`, parsed into the next cursor and key batch.
fn fetch_batch<H: Host + ?Sized>(
    host: &H,
    cursor: &[u8],
    pattern: &[u8],
    count: &[u8],
) -> Result<(Vec<u8>, Vec<Vec<u8>>)> {
    let reply = host.checked_call(
        Subcommand::Scan,
        &[cursor, MATCH_KEYWORD, pattern, COUNT_KEYWORD, count],
    )?;
    parse_scan_reply(reply)
}

fn scan_protocol_error(reason: impl Into<String>) -> Error {
    Error::Protocol {
        command: Subcommand::Scan.name(),
        reason: reason.into(),
    }
}

/// A SCAN reply is a two-element array: the next cursor and an array of keys.
pub fn parse_scan_reply(reply: Reply) -> Result<(Vec<u8>, Vec<Vec<u8>>)> {
    let parts = reply
        .into_array()
        .ok_or_else(|| scan_protocol_error("expected an array"))?;
    let [cursor, keys]: [Reply; 2] = parts
        .try_into()
        .map_err(|parts: Vec<Reply>| {
            scan_protocol_error(format!("expected 2 elements, got {}", parts.len()))
        })?;

    let cursor = cursor
        .as_bytes()
        .ok_or_else(|| scan_protocol_error("cursor is not a string"))?
        .to_vec();
    let keys = keys
        .into_array()
        .ok_or_else(|| scan_protocol_error("key list is not an array"))?
        .into_iter()
        .map(|key| match key {
            Reply::Bulk(bytes) => Ok(bytes),
            Reply::Simple(s) => Ok(s.into_bytes()),
            other => Err(scan_protocol_error(format!("key is {:?}", other))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((cursor, keys))
}

/// Collect every live string key matching `pattern` with its value.
///
/// Replies with a flat array `[k1, v1, k2, v2, ...]` in the order the host
/// returned the keys. Keys whose `MGET` value comes back Null are left out.
/// The walk takes the store-wide lock as `discipline` says.
pub fn collect_matching<H: Host + ?Sized>(
    host: &H,
    pattern: &[u8],
    batch_size: usize,
    discipline: LockDiscipline,
) -> Result<Reply> {
    collect(host, pattern, batch_size, Holder::Walk(discipline))
}

/// [`collect_matching`] for a caller holding the store-wide lock.
///
/// `_guard` is the caller's guard; the whole walk runs under it.
pub fn collect_matching_held<'g, H: Host + ?Sized + 'g>(
    host: &H,
    _guard: &H::Guard<'g>,
    pattern: &[u8],
    batch_size: usize,
) -> Result<Reply> {
    collect(host, pattern, batch_size, Holder::Caller)
}

fn collect<H: Host + ?Sized>(
    host: &H,
    pattern: &[u8],
    batch_size: usize,
    holder: Holder,
) -> Result<Reply> {
    let mut out = Vec::new();
    let mut dropped = 0usize;

    let stats = walk(host, pattern, batch_size, holder, |keys| {
        let argv: SmallVec<[&[u8]; 64]> = keys.iter().map(Vec::as_slice).collect();
        let reply = host.checked_call(Subcommand::Mget, &argv)?;
        let values = reply.into_array().ok_or_else(|| Error::Protocol {
            command: Subcommand::Mget.name(),
            reason: "expected an array".to_string(),
        })?;
        if values.len() != keys.len() {
            return Err(Error::Protocol {
                command: Subcommand::Mget.name(),
                reason: format!("asked for {} keys, got {} values", keys.len(), values.len()),
            });
        }

        for (key, value) in keys.iter().zip(values) {
            if value.is_null() {
                dropped += 1;
                continue;
            }
            let bytes = value.as_bytes().ok_or_else(|| Error::Protocol {
                command: Subcommand::Mget.name(),
                reason: format!("value is {:?}", value),
            })?;
            out.push(Reply::Bulk(key.clone()));
            out.push(Reply::bulk(bytes));
        }
        Ok(())
    })?;

    info!(
        target: "exstrings::scan",
        pattern = %String::from_utf8_lossy(pattern),
        batches = stats.batches,
        pairs = out.len() / 2,
        dropped,
        ?holder,
        "Collect walk complete"
    );
    Ok(Reply::Array(out))
}

/// Remove every key matching `pattern`. Replies with the total removed.
/// The walk takes the store-wide lock as `discipline` says.
pub fn delete_matching<H: Host + ?Sized>(
    host: &H,
    pattern: &[u8],
    batch_size: usize,
    discipline: LockDiscipline,
) -> Result<Reply> {
    delete(host, pattern, batch_size, Holder::Walk(discipline))
}

/// [`delete_matching`] for a caller holding the store-wide lock.
pub fn delete_matching_held<'g, H: Host + ?Sized + 'g>(
    host: &H,
    _guard: &H::Guard<'g>,
    pattern: &[u8],
    batch_size: usize,
) -> Result<Reply> {
    delete(host, pattern, batch_size, Holder::Caller)
}

fn delete<H: Host + ?Sized>(
    host: &H,
    pattern: &[u8],
    batch_size: usize,
    holder: Holder,
) -> Result<Reply> {
    let mut total: i64 = 0;

    let stats = walk(host, pattern, batch_size, holder, |keys| {
        let argv: SmallVec<[&[u8]; 64]> = keys.iter().map(Vec::as_slice).collect();
        let reply = host.checked_call(Subcommand::Unlink, &argv)?;
        let removed = reply.as_integer().ok_or_else(|| Error::Protocol {
            command: Subcommand::Unlink.name(),
            reason: format!("expected an integer, got {:?}", reply),
        })?;
        total += removed;
        Ok(())
    })?;

    info!(
        target: "exstrings::scan",
        pattern = %String::from_utf8_lossy(pattern),
        batches = stats.batches,
        deleted = total,
        ?holder,
        "Delete walk complete"
    );
    Ok(Reply::Integer(total))
}
