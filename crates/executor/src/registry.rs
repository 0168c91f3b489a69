//! Command table.
//!
//! Every command the module exposes, with the metadata a host needs to
//! register it: flags, key positions and argument-count shape. Names are
//! matched case-insensitively.

use std::fmt;

/// Argument-count shape. Counts include the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments.
    Exact(usize),
    /// At least `n` arguments.
    AtLeast(usize),
    /// At least `n` arguments, and an odd count.
    AtLeastOdd(usize),
    /// Either of two exact counts.
    EitherOf(usize, usize),
}

impl Arity {
    /// True if `argc` fits this shape.
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Exact(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
            Arity::AtLeastOdd(n) => argc >= n && argc % 2 == 1,
            Arity::EitherOf(a, b) => argc == a || argc == b,
        }
    }

    /// Arity in the host's registration convention: positive for an exact
    /// count, negated minimum otherwise.
    pub fn host_arity(self) -> i32 {
        match self {
            Arity::Exact(n) => n as i32,
            Arity::AtLeast(n) | Arity::AtLeastOdd(n) | Arity::EitherOf(n, _) => -(n as i32),
        }
    }
}

/// Registration metadata for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Lower-case wire name
    pub name: &'static str,
    /// Host command flags
    pub flags: &'static str,
    /// Position of the first key argument
    pub first_key: usize,
    /// Position of the last key argument
    pub last_key: usize,
    /// Step between key arguments
    pub key_step: usize,
    /// Accepted argument counts
    pub arity: Arity,
}

const WRITE: &str = "write deny-oom";
const READONLY: &str = "readonly";

/// Every command the module exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CommandName {
    SetIe,
    SetNe,
    DelIe,
    DelNe,
    MsetPub,
    MsetMpub,
    SetIePub,
    SetNePub,
    SetXxPub,
    SetNxPub,
    DelPub,
    DelMpub,
    DelIePub,
    DelNePub,
    NGet,
    NGetAtomic,
    NGetNoAtomic,
    NDel,
    NDelAtomic,
}

impl CommandName {
    /// All commands, in registration order.
    pub const ALL: [CommandName; 19] = [
        CommandName::SetIe,
        CommandName::SetNe,
        CommandName::DelIe,
        CommandName::DelNe,
        CommandName::MsetPub,
        CommandName::MsetMpub,
        CommandName::SetIePub,
        CommandName::SetNePub,
        CommandName::SetXxPub,
        CommandName::SetNxPub,
        CommandName::DelPub,
        CommandName::DelMpub,
        CommandName::DelIePub,
        CommandName::DelNePub,
        CommandName::NGet,
        CommandName::NGetAtomic,
        CommandName::NGetNoAtomic,
        CommandName::NDel,
        CommandName::NDelAtomic,
    ];

    /// Find a command by name, ignoring ASCII case.
    pub fn lookup(name: &[u8]) -> Option<CommandName> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().as_bytes().eq_ignore_ascii_case(name))
    }

    /// Lower-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::SetIe => "setie",
            CommandName::SetNe => "setne",
            CommandName::DelIe => "delie",
            CommandName::DelNe => "delne",
            CommandName::MsetPub => "msetpub",
            CommandName::MsetMpub => "msetmpub",
            CommandName::SetIePub => "setiepub",
            CommandName::SetNePub => "setnepub",
            CommandName::SetXxPub => "setxxpub",
            CommandName::SetNxPub => "setnxpub",
            CommandName::DelPub => "delpub",
            CommandName::DelMpub => "delmpub",
            CommandName::DelIePub => "deliepub",
            CommandName::DelNePub => "delnepub",
            CommandName::NGet => "nget",
            CommandName::NGetAtomic => "nget.atomic",
            CommandName::NGetNoAtomic => "nget.noatomic",
            CommandName::NDel => "ndel",
            CommandName::NDelAtomic => "ndel.atomic",
        }
    }

    /// Accepted argument counts.
    pub fn arity(self) -> Arity {
        match self {
            CommandName::SetIe | CommandName::SetNe => Arity::AtLeast(4),
            CommandName::DelIe | CommandName::DelNe => Arity::Exact(3),
            CommandName::MsetPub => Arity::AtLeastOdd(5),
            CommandName::MsetMpub => Arity::AtLeastOdd(7),
            CommandName::SetIePub | CommandName::SetNePub => Arity::Exact(6),
            CommandName::SetXxPub | CommandName::SetNxPub => Arity::Exact(5),
            CommandName::DelPub => Arity::AtLeast(4),
            CommandName::DelMpub => Arity::AtLeast(6),
            CommandName::DelIePub | CommandName::DelNePub => Arity::Exact(5),
            CommandName::NGet | CommandName::NGetAtomic | CommandName::NGetNoAtomic => {
                Arity::EitherOf(2, 4)
            }
            CommandName::NDel | CommandName::NDelAtomic => Arity::Exact(2),
        }
    }

    /// Registration metadata.
    pub fn spec(self) -> CommandSpec {
        let flags = match self {
            CommandName::NGet | CommandName::NGetAtomic | CommandName::NGetNoAtomic => READONLY,
            _ => WRITE,
        };
        CommandSpec {
            name: self.as_str(),
            flags,
            first_key: 1,
            last_key: 1,
            key_step: 1,
            arity: self.arity(),
        }
    }

    /// True for commands whose reply is produced on a background worker.
    pub fn runs_in_background(self) -> bool {
        self == CommandName::NGetNoAtomic
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration metadata for every command.
pub fn command_table() -> impl Iterator<Item = CommandSpec> {
    CommandName::ALL.into_iter().map(CommandName::spec)
}
