//! The host store interface.
//!
//! The engines never touch storage directly. Everything they do goes through
//! [`Host`]: a key-type probe, a sub-command call, and a store-wide lock.
//! Sub-commands are atomic individually; composing them is the engines' job.

use crate::error::{Error, Result};
use crate::reply::Reply;

/// Type of the value stored under a key, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// No such key
    Empty,
    /// String value
    String,
    /// List value
    List,
    /// Hash value
    Hash,
    /// Set value
    Set,
    /// Sorted set value
    ZSet,
    /// Stream value
    Stream,
    /// Value owned by another module
    Module,
}

impl KeyType {
    /// True when the key does not exist.
    pub fn is_empty(self) -> bool {
        self == KeyType::Empty
    }
}

/// Sub-commands the engines issue against the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subcommand {
    /// `GET key`
    Get,
    /// `SET key value [options...]`
    Set,
    /// `MSET key value [key value ...]`
    Mset,
    /// `MGET key [key ...]`
    Mget,
    /// `UNLINK key [key ...]`
    Unlink,
    /// `PUBLISH channel message`
    Publish,
    /// `SCAN cursor MATCH pattern COUNT n`
    Scan,
}

impl Subcommand {
    /// Wire name of the sub-command.
    pub fn name(self) -> &'static str {
        match self {
            Subcommand::Get => "GET",
            Subcommand::Set => "SET",
            Subcommand::Mset => "MSET",
            Subcommand::Mget => "MGET",
            Subcommand::Unlink => "UNLINK",
            Subcommand::Publish => "PUBLISH",
            Subcommand::Scan => "SCAN",
        }
    }
}

/// A key-value store the engines run inside.
///
/// Implementations must be safe to call from the dispatcher thread and from
/// background workers at the same time.
pub trait Host: Send + Sync {
    /// Guard for the store-wide exclusive lock. Dropping it releases the lock.
    type Guard<'a>
    where
        Self: 'a;

    /// Report the type of the value under `key`.
    fn key_type(&self, key: &[u8]) -> KeyType;

    /// Run a sub-command.
    ///
    /// `None` means the host produced no reply at all. Error replies come
    /// back as `Some(Reply::Error(_))`.
    fn call(&self, command: Subcommand, args: &[&[u8]]) -> Option<Reply>;

    /// Acquire the store-wide exclusive lock.
    ///
    /// While a guard is alive no other lock holder can observe or write the
    /// keyspace. Sub-commands issued by the holder still go through
    /// [`Host::call`].
    fn lock(&self) -> Self::Guard<'_>;
}

/// Fail-fast helpers over [`Host`].
pub trait HostExt: Host {
    /// Run a sub-command, turning "no reply" and error replies into errors.
    fn checked_call(&self, command: Subcommand, args: &[&[u8]]) -> Result<Reply> {
        match self.call(command, args) {
            None => Err(Error::NoReply {
                command: command.name(),
            }),
            Some(Reply::Error(message)) => Err(Error::Remote(message)),
            Some(reply) => Ok(reply),
        }
    }
}

impl<H: Host + ?Sized> HostExt for H {}
