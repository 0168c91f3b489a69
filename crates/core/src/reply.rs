//! Store replies.
//!
//! [`Reply`] is both what host sub-commands return and what a command
//! invocation sends back to its client. Handlers pass host replies through
//! untouched wherever the command's contract is "reply with the underlying
//! operation's reply".

use std::fmt;

/// A single reply in the store's reply model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Null bulk reply (absent value, no-op)
    Null,
    /// Status reply such as `OK`
    Simple(String),
    /// Integer reply (counts)
    Integer(i64),
    /// Binary-safe bulk string
    Bulk(Vec<u8>),
    /// Array of nested replies
    Array(Vec<Reply>),
    /// Error reply, carried as the full error line
    Error(String),
}

impl Reply {
    /// The `+OK` status reply.
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Bulk reply from anything byte-like.
    pub fn bulk(bytes: impl AsRef<[u8]>) -> Self {
        Reply::Bulk(bytes.as_ref().to_vec())
    }

    /// True for the null reply.
    pub fn is_null(&self) -> bool {
        matches!(self, Reply::Null)
    }

    /// True for error replies.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Integer payload, if this is an integer reply.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Byte payload of bulk and status replies.
    ///
    /// Null and every other shape yield `None`, which is how a GET on an
    /// absent key is observed.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Reply::Bulk(b) => Some(b),
            Reply::Simple(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Element slice of array replies.
    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Consume an array reply into its elements.
    pub fn into_array(self) -> Option<Vec<Reply>> {
        match self {
            Reply::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for Reply {
    fn from(n: i64) -> Self {
        Reply::Integer(n)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Null => write!(f, "(nil)"),
            Reply::Simple(s) => write!(f, "{}", s),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(b) => write!(f, "\"{}\"", String::from_utf8_lossy(b)),
            Reply::Array(items) => {
                if items.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
            Reply::Error(e) => write!(f, "(error) {}", e),
        }
    }
}
