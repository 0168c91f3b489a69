//! Stored values with optional expiry
//!
//! Expiry is a storage concern: the engines only ever see a key as present
//! or absent. Expired entries are filtered at read time and reaped lazily
//! by writers.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use exstrings_core::KeyType;

/// Payload of a stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    /// Plain string value
    String(Vec<u8>),
    /// List of elements
    List(Vec<Vec<u8>>),
    /// Set of members
    Set(BTreeSet<Vec<u8>>),
    /// Field/value hash
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
}

/// A stored entry with optional expiry deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    data: Data,
    expires_at: Option<Instant>,
}

impl StoredValue {
    /// Entry that never expires.
    pub fn new(data: Data) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }

    /// Entry that expires `ttl` from now.
    pub fn with_ttl(data: Data, ttl: Option<Duration>) -> Self {
        Self {
            data,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    /// The payload.
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// String payload, if this is a string entry.
    pub fn as_string(&self) -> Option<&[u8]> {
        match &self.data {
            Data::String(s) => Some(s),
            _ => None,
        }
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// True if the deadline is at or before `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |deadline| deadline <= now)
    }

    /// Type reported to the engines.
    pub fn key_type(&self) -> KeyType {
        match self.data {
            Data::String(_) => KeyType::String,
            Data::List(_) => KeyType::List,
            Data::Set(_) => KeyType::Set,
            Data::Hash(_) => KeyType::Hash,
        }
    }
}
