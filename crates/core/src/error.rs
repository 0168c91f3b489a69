//! Error types for command execution.
//!
//! Every failure an invocation can produce is a variant of [`Error`]. The
//! `Display` form of each variant is exactly the error string the client
//! receives, so converting an error into a reply is lossless.
//!
//! | Category | Variants | Raised |
//! |----------|----------|--------|
//! | Shape | `WrongArity`, `CountNotPositive`, `CountMismatch`, `NotInteger`, `Syntax` | before any host call |
//! | Type | `WrongType` | after the key-type lookup |
//! | Host | `NoReply`, `Remote`, `Protocol` | after a sub-command |
//! | System | `UnknownCommand`, `Unavailable`, `Config`, `Internal` | executor / setup |

use thiserror::Error;

use crate::reply::Reply;

/// Result type for exstrings operations
pub type Result<T> = std::result::Result<T, Error>;

/// Command execution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Argument count does not fit the command's shape.
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity {
        /// Command name as the client sent it
        command: String,
    },

    /// Target key exists but does not hold a string value.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// A host sub-command produced no reply at all.
    #[error("ERR {command} returned no reply")]
    NoReply {
        /// Sub-command name (e.g. `GET`)
        command: &'static str,
    },

    /// A host sub-command replied with an error. Forwarded verbatim.
    #[error("{0}")]
    Remote(String),

    /// A host sub-command replied with a shape the engine cannot use.
    #[error("ERR unexpected {command} reply: {reason}")]
    Protocol {
        /// Sub-command name
        command: &'static str,
        /// What was wrong with the reply
        reason: String,
    },

    /// A leading count argument of a batched command is below one.
    #[error("ERR {counts} must be greater than zero")]
    CountNotPositive {
        /// Names of the count arguments, as shown to the client
        counts: &'static str,
    },

    /// Leading counts do not add up to the number of trailing arguments.
    #[error("ERR {counts} do not match the total pair count")]
    CountMismatch {
        /// Names of the count arguments, as shown to the client
        counts: &'static str,
    },

    /// An argument that must be an integer is not one.
    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    /// Optional arguments are malformed.
    #[error("ERR syntax error")]
    Syntax,

    /// No handler is registered under this name.
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// The background worker pool refused the task.
    #[error("ERR background worker unavailable: {reason}")]
    Unavailable {
        /// Why the task was refused
        reason: String,
    },

    /// Configuration could not be read or is invalid.
    #[error("ERR invalid configuration: {reason}")]
    Config {
        /// What is wrong
        reason: String,
    },

    /// Invariant violation inside the engine.
    #[error("ERR internal error: {reason}")]
    Internal {
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Build a `WrongArity` error for the given raw command name.
    pub fn wrong_arity(command: &[u8]) -> Self {
        Error::WrongArity {
            command: String::from_utf8_lossy(command).into_owned(),
        }
    }

    /// Build an `Internal` error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }

    /// Build a `Config` error.
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// True for argument-count violations.
    pub fn is_arity(&self) -> bool {
        matches!(self, Error::WrongArity { .. })
    }

    /// True when the error came from a host sub-command rather than local validation.
    pub fn is_host_failure(&self) -> bool {
        matches!(
            self,
            Error::NoReply { .. } | Error::Remote(_) | Error::Protocol { .. }
        )
    }

    /// Encode this error as the reply sent to the client.
    pub fn to_reply(&self) -> Reply {
        Reply::Error(self.to_string())
    }
}
