//! Dispatch results.
//!
//! Every invocation yields exactly one reply. Most are ready when
//! [`Executor::dispatch`](crate::Executor::dispatch) returns; background walks
//! hand back a [`PendingReply`] the caller parks until the worker finishes.

use exstrings_core::Reply;
use exstrings_engine::PendingReply;

/// The result of dispatching one invocation.
#[derive(Debug)]
pub enum Dispatch {
    /// The reply is available now.
    Ready(Reply),
    /// A background worker will produce the reply.
    Pending(PendingReply),
}

impl Dispatch {
    /// True if the reply is still being produced off-thread.
    pub fn is_pending(&self) -> bool {
        matches!(self, Dispatch::Pending(_))
    }

    /// The reply, blocking for background work.
    pub fn wait(self) -> Reply {
        match self {
            Dispatch::Ready(reply) => reply,
            Dispatch::Pending(pending) => pending.wait(),
        }
    }
}

impl From<Reply> for Dispatch {
    fn from(reply: Reply) -> Self {
        Dispatch::Ready(reply)
    }
}
