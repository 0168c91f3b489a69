//! Conditional mutation engine
//!
//! Set and delete operations gated on the current value of a key, optionally
//! followed by publish notifications.
//!
//! ## Gating
//!
//! Every operation runs the same sequence of host calls and stops at the
//! first one that decides the outcome:
//!
//! 1. key-type lookup ([`gate_on_type`])
//! 2. `GET` and byte comparison, only for `Equals`/`NotEquals` ([`gate_on_value`])
//! 3. the mutation (`SET`, `MSET` or `UNLINK`)
//! 4. the publishes, only after a mutation that did something
//!
//! A failed gate is not an error: the set family answers Null and the delete
//! family answers integer 0, and nothing is written.
//!
//! `OpFlag::None` skips the gate entirely. `MSET` and `UNLINK` decide for
//! themselves what happens to each key.

use smallvec::SmallVec;
use tracing::{debug, warn};

use exstrings_core::{
    Error, Host, HostExt, KeyType, KeyView, PairView, Reply, Result, Subcommand,
};

/// Condition a mutation is gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpFlag {
    /// Unconditional
    None,
    /// Only if the key exists (XX)
    Exists,
    /// Only if the key does not exist (NX)
    NotExists,
    /// Only if the current value equals the expected value (IE)
    Equals,
    /// Only if the current value differs from the expected value (NE)
    NotEquals,
}

impl OpFlag {
    /// True for the flags that compare against an expected value.
    pub fn compares_value(self) -> bool {
        matches!(self, OpFlag::Equals | OpFlag::NotEquals)
    }
}

/// Which sentinel a failed gate produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Set operations: no-op replies Null
    Set,
    /// Delete operations: no-op replies integer 0
    Delete,
}

/// Outcome of gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Run the mutation
    Proceed,
    /// Skip the mutation and reply Null
    ShortCircuitNull,
    /// Skip the mutation and reply integer 0
    ShortCircuitZero,
}

impl Gate {
    fn no_op(family: Family) -> Gate {
        match family {
            Family::Set => Gate::ShortCircuitNull,
            Family::Delete => Gate::ShortCircuitZero,
        }
    }

    /// The reply for a short circuit, or `None` if the gate proceeds.
    pub fn short_circuit_reply(self) -> Option<Reply> {
        match self {
            Gate::Proceed => None,
            Gate::ShortCircuitNull => Some(Reply::Null),
            Gate::ShortCircuitZero => Some(Reply::Integer(0)),
        }
    }
}

/// Outcome of the type step of gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeGate {
    /// The key type alone decides.
    Decided(Gate),
    /// The current value has to be fetched and compared.
    CompareValue,
}

/// Gate on the key's type.
///
/// A present key of a non-string type is `WrongType` for every flag except
/// `None`, including `NotExists`.
pub fn gate_on_type(flag: OpFlag, family: Family, key_type: KeyType) -> Result<TypeGate> {
    if flag == OpFlag::None {
        return Ok(TypeGate::Decided(Gate::Proceed));
    }

    if key_type.is_empty() {
        let gate = match (family, flag) {
            (Family::Delete, _) => Gate::no_op(family),
            (Family::Set, OpFlag::Equals | OpFlag::Exists) => Gate::no_op(family),
            (Family::Set, _) => Gate::Proceed,
        };
        return Ok(TypeGate::Decided(gate));
    }

    if key_type != KeyType::String {
        return Err(Error::WrongType);
    }

    Ok(match flag {
        OpFlag::NotExists => TypeGate::Decided(Gate::no_op(family)),
        OpFlag::Equals | OpFlag::NotEquals => TypeGate::CompareValue,
        OpFlag::None | OpFlag::Exists => TypeGate::Decided(Gate::Proceed),
    })
}

/// Gate on the fetched value. A missing value never equals `expected`.
pub fn gate_on_value(
    flag: OpFlag,
    family: Family,
    current: Option<&[u8]>,
    expected: &[u8],
) -> Gate {
    let equal = current == Some(expected);
    let proceed = match flag {
        OpFlag::Equals => equal,
        OpFlag::NotEquals => !equal,
        OpFlag::None | OpFlag::Exists | OpFlag::NotExists => true,
    };
    if proceed {
        Gate::Proceed
    } else {
        Gate::no_op(family)
    }
}

/// Runs conditional mutations against a host.
///
/// The engine takes no locks. A gate and its write are atomic only when the
/// caller holds the host's store-wide lock for the whole operation.
pub struct ConditionalEngine<'h, H: ?Sized> {
    host: &'h H,
}

impl<'h, H: Host + ?Sized> ConditionalEngine<'h, H> {
    /// Engine over `host`.
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// Run the full gate for `key`.
    pub fn gate(
        &self,
        flag: OpFlag,
        family: Family,
        key: &[u8],
        expected: Option<&[u8]>,
    ) -> Result<Gate> {
        if flag == OpFlag::None {
            return Ok(Gate::Proceed);
        }

        let key_type = self.host.key_type(key);
        let gate = match gate_on_type(flag, family, key_type)? {
            TypeGate::Decided(gate) => gate,
            TypeGate::CompareValue => {
                let expected = expected.ok_or_else(|| {
                    Error::internal(format!("{:?} gate without an expected value", flag))
                })?;
                let reply = self.host.checked_call(Subcommand::Get, &[key])?;
                let current = match &reply {
                    Reply::Null => None,
                    other => Some(other.as_bytes().ok_or_else(|| Error::Protocol {
                        command: Subcommand::Get.name(),
                        reason: format!("expected a bulk string, got {:?}", other),
                    })?),
                };
                gate_on_value(flag, family, current, expected)
            }
        };

        debug!(
            target: "exstrings::cas",
            ?flag,
            ?family,
            ?key_type,
            ?gate,
            key = %String::from_utf8_lossy(key),
            "Gate evaluated"
        );
        Ok(gate)
    }

    /// Set `key` to `value` if the gate passes.
    ///
    /// `options` are appended to the `SET` call unchanged (`EX 10`, `NX`, ...).
    /// Replies with the `SET` reply, or Null when the gate fails.
    pub fn set_if(
        &self,
        flag: OpFlag,
        key: &[u8],
        expected: Option<&[u8]>,
        value: &[u8],
        options: &[Vec<u8>],
    ) -> Result<Reply> {
        if let Some(reply) = self
            .gate(flag, Family::Set, key, expected)?
            .short_circuit_reply()
        {
            return Ok(reply);
        }

        let mut argv: SmallVec<[&[u8]; 8]> = SmallVec::with_capacity(2 + options.len());
        argv.push(key);
        argv.push(value);
        argv.extend(options.iter().map(Vec::as_slice));
        self.host.checked_call(Subcommand::Set, &argv)
    }

    /// Delete `key` if the gate passes. Replies with the number of keys removed.
    pub fn delete_if(&self, flag: OpFlag, key: &[u8], expected: Option<&[u8]>) -> Result<Reply> {
        if let Some(reply) = self
            .gate(flag, Family::Delete, key, expected)?
            .short_circuit_reply()
        {
            return Ok(reply);
        }
        self.host.checked_call(Subcommand::Unlink, &[key])
    }

    /// Gate on the first key of `sets`, write every pair with one `MSET`,
    /// then publish every pair of `pubs`.
    ///
    /// Nothing is published when the gate fails or `MSET` replies Null.
    pub fn set_and_publish(
        &self,
        flag: OpFlag,
        expected: Option<&[u8]>,
        sets: PairView<'_>,
        pubs: PairView<'_>,
    ) -> Result<Reply> {
        let key = sets
            .first_key()
            .ok_or_else(|| Error::internal("set_and_publish without any pair"))?;
        let argv: SmallVec<[&[u8]; 8]> = sets.flat().collect();
        self.gated_mset_and_publish(flag, key, expected, &argv, pubs)
    }

    /// Single-key form of [`set_and_publish`](Self::set_and_publish) for
    /// callers whose key and value are not adjacent.
    pub fn set_if_and_publish(
        &self,
        flag: OpFlag,
        key: &[u8],
        expected: Option<&[u8]>,
        value: &[u8],
        pubs: PairView<'_>,
    ) -> Result<Reply> {
        self.gated_mset_and_publish(flag, key, expected, &[key, value], pubs)
    }

    fn gated_mset_and_publish(
        &self,
        flag: OpFlag,
        key: &[u8],
        expected: Option<&[u8]>,
        pairs: &[&[u8]],
        pubs: PairView<'_>,
    ) -> Result<Reply> {
        if let Some(reply) = self
            .gate(flag, Family::Set, key, expected)?
            .short_circuit_reply()
        {
            return Ok(reply);
        }

        let reply = self.host.checked_call(Subcommand::Mset, pairs)?;
        if reply.is_null() {
            return Ok(reply);
        }
        self.publish_all(pubs);
        Ok(reply)
    }

    /// Gate on the first of `keys`, remove every key with one `UNLINK`, then
    /// publish every pair of `pubs` if anything was removed.
    pub fn delete_and_publish(
        &self,
        flag: OpFlag,
        expected: Option<&[u8]>,
        keys: KeyView<'_>,
        pubs: PairView<'_>,
    ) -> Result<Reply> {
        let key = keys
            .first()
            .ok_or_else(|| Error::internal("delete_and_publish without any key"))?;
        if let Some(reply) = self
            .gate(flag, Family::Delete, key, expected)?
            .short_circuit_reply()
        {
            return Ok(reply);
        }

        let argv: SmallVec<[&[u8]; 8]> = keys.iter().collect();
        let reply = self.host.checked_call(Subcommand::Unlink, &argv)?;
        if reply.is_null() {
            return Ok(reply);
        }
        match reply.as_integer() {
            Some(0) => {}
            Some(_) => self.publish_all(pubs),
            None => {
                return Err(Error::Protocol {
                    command: Subcommand::Unlink.name(),
                    reason: format!("expected an integer, got {:?}", reply),
                })
            }
        }
        Ok(reply)
    }

    /// Publish each pair in order. Failures are logged and otherwise ignored.
    fn publish_all(&self, pubs: PairView<'_>) {
        for (channel, message) in pubs.iter() {
            if let Err(e) = self
                .host
                .checked_call(Subcommand::Publish, &[channel, message])
            {
                warn!(
                    target: "exstrings::cas",
                    channel = %String::from_utf8_lossy(channel),
                    error = %e,
                    "Publish failed, mutation already applied"
                );
            }
        }
    }
}
