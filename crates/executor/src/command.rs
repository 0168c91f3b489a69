//! Parsed commands.
//!
//! [`Command::parse`] turns a raw [`Args`] into a typed command borrowing from
//! it. Every shape check happens here, so a parse failure never costs a host
//! call:
//!
//! 1. the name is looked up in the command table
//! 2. the argument count is checked against the command's [`Arity`](crate::Arity)
//! 3. leading counts of the batched variants are validated
//! 4. views over the key/value, key and channel/message ranges are built

use exstrings_core::{Args, Error, KeyView, PairView, Result};
use exstrings_engine::{LockDiscipline, OpFlag};

use crate::registry::CommandName;

const SET_COUNTS: (&str, &str) = (
    "SET_PAIR_COUNT and PUB_PAIR_COUNT",
    "SET_PAIR_COUNT or PUB_PAIR_COUNT",
);
const DEL_COUNTS: (&str, &str) = (
    "DEL_COUNT and PUB_PAIR_COUNT",
    "DEL_COUNT or PUB_PAIR_COUNT",
);

/// A validated command, borrowing its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// SETIE / SETNE: gated `SET` with passthrough options.
    SetIf {
        /// `Equals` or `NotEquals`
        flag: OpFlag,
        /// Target key
        key: &'a [u8],
        /// Value compared against the current one
        expected: &'a [u8],
        /// Value written when the gate passes
        value: &'a [u8],
        /// Extra `SET` arguments
        options: &'a [Vec<u8>],
    },

    /// DELIE / DELNE: gated `UNLINK`.
    DelIf {
        /// `Equals` or `NotEquals`
        flag: OpFlag,
        /// Target key
        key: &'a [u8],
        /// Value compared against the current one
        expected: &'a [u8],
    },

    /// MSETPUB / MSETMPUB / SETXXPUB / SETNXPUB: gated `MSET` then publishes.
    SetPub {
        /// Gate, checked against the first key
        flag: OpFlag,
        /// Key/value pairs to write
        sets: PairView<'a>,
        /// Channel/message pairs to publish
        pubs: PairView<'a>,
    },

    /// SETIEPUB / SETNEPUB: value-gated single-key `MSET` then publish.
    SetIfPub {
        /// `Equals` or `NotEquals`
        flag: OpFlag,
        /// Target key
        key: &'a [u8],
        /// Value compared against the current one
        expected: &'a [u8],
        /// Value written when the gate passes
        value: &'a [u8],
        /// Channel/message pairs to publish
        pubs: PairView<'a>,
    },

    /// DELPUB / DELMPUB / DELIEPUB / DELNEPUB: gated `UNLINK` then publishes.
    DelPub {
        /// Gate, checked against the first key
        flag: OpFlag,
        /// Value compared against the current one, for value gates
        expected: Option<&'a [u8]>,
        /// Keys to remove
        keys: KeyView<'a>,
        /// Channel/message pairs to publish
        pubs: PairView<'a>,
    },

    /// NGET / NGET.ATOMIC / NGET.NOATOMIC: collect matching pairs.
    Collect {
        /// Glob pattern
        pattern: &'a [u8],
        /// `COUNT n` if given
        batch_size: Option<usize>,
        /// Lock usage of the walk
        discipline: LockDiscipline,
        /// Run on a background worker
        background: bool,
    },

    /// NDEL / NDEL.ATOMIC: delete matching keys.
    DeleteMatching {
        /// Glob pattern
        pattern: &'a [u8],
        /// Lock usage of the walk
        discipline: LockDiscipline,
    },
}

impl<'a> Command<'a> {
    /// Parse and validate `args`.
    ///
    /// # Errors
    ///
    /// `UnknownCommand`, `WrongArity`, `NotInteger`, `CountNotPositive`,
    /// `CountMismatch` or `Syntax`, depending on what is wrong.
    pub fn parse(args: &'a Args) -> Result<Self> {
        let name = CommandName::lookup(args.name()).ok_or_else(|| {
            Error::UnknownCommand(String::from_utf8_lossy(args.name()).into_owned())
        })?;
        if !name.arity().accepts(args.len()) {
            return Err(Error::wrong_arity(args.name()));
        }
        let argc = args.len();

        let command = match name {
            CommandName::SetIe | CommandName::SetNe => Command::SetIf {
                flag: value_flag(name == CommandName::SetIe),
                key: args.arg(1)?,
                expected: args.arg(2)?,
                value: args.arg(3)?,
                options: args.slice(4, argc - 4)?,
            },

            CommandName::DelIe | CommandName::DelNe => Command::DelIf {
                flag: value_flag(name == CommandName::DelIe),
                key: args.arg(1)?,
                expected: args.arg(2)?,
            },

            CommandName::MsetPub => Command::SetPub {
                flag: OpFlag::None,
                sets: args.pairs(1, (argc - 3) / 2)?,
                pubs: args.pairs(argc - 2, 1)?,
            },

            CommandName::MsetMpub => {
                let (set_count, pub_count) = leading_counts(args, SET_COUNTS.0)?;
                let expected_argc = set_count
                    .checked_mul(2)
                    .and_then(|n| n.checked_add(pub_count.checked_mul(2)?))
                    .and_then(|n| n.checked_add(3));
                if expected_argc != Some(argc) {
                    return Err(Error::CountMismatch {
                        counts: SET_COUNTS.1,
                    });
                }
                Command::SetPub {
                    flag: OpFlag::None,
                    sets: args.pairs(3, set_count)?,
                    pubs: args.pairs(3 + 2 * set_count, pub_count)?,
                }
            }

            CommandName::SetXxPub | CommandName::SetNxPub => Command::SetPub {
                flag: if name == CommandName::SetXxPub {
                    OpFlag::Exists
                } else {
                    OpFlag::NotExists
                },
                sets: args.pairs(1, 1)?,
                pubs: args.pairs(3, 1)?,
            },

            CommandName::SetIePub | CommandName::SetNePub => Command::SetIfPub {
                flag: value_flag(name == CommandName::SetIePub),
                key: args.arg(1)?,
                expected: args.arg(2)?,
                value: args.arg(3)?,
                pubs: args.pairs(4, 1)?,
            },

            CommandName::DelPub => Command::DelPub {
                flag: OpFlag::None,
                expected: None,
                keys: args.keys(1, argc - 3)?,
                pubs: args.pairs(argc - 2, 1)?,
            },

            CommandName::DelMpub => {
                let (del_count, pub_count) = leading_counts(args, DEL_COUNTS.0)?;
                let expected_argc = pub_count
                    .checked_mul(2)
                    .and_then(|n| n.checked_add(del_count))
                    .and_then(|n| n.checked_add(3));
                if expected_argc != Some(argc) {
                    return Err(Error::CountMismatch {
                        counts: DEL_COUNTS.1,
                    });
                }
                Command::DelPub {
                    flag: OpFlag::None,
                    expected: None,
                    keys: args.keys(3, del_count)?,
                    pubs: args.pairs(3 + del_count, pub_count)?,
                }
            }

            CommandName::DelIePub | CommandName::DelNePub => Command::DelPub {
                flag: value_flag(name == CommandName::DelIePub),
                expected: Some(args.arg(2)?),
                keys: args.keys(1, 1)?,
                pubs: args.pairs(3, 1)?,
            },

            CommandName::NGet | CommandName::NGetAtomic | CommandName::NGetNoAtomic => {
                let discipline = match name {
                    CommandName::NGet => LockDiscipline::Unlocked,
                    CommandName::NGetAtomic => LockDiscipline::HoldPerBatch,
                    _ => LockDiscipline::PerCall,
                };
                Command::Collect {
                    pattern: args.arg(1)?,
                    batch_size: parse_count_option(args)?,
                    discipline,
                    background: name.runs_in_background(),
                }
            }

            CommandName::NDel | CommandName::NDelAtomic => Command::DeleteMatching {
                pattern: args.arg(1)?,
                discipline: if name == CommandName::NDelAtomic {
                    LockDiscipline::HoldPerBatch
                } else {
                    LockDiscipline::Unlocked
                },
            },
        };
        Ok(command)
    }
}

fn value_flag(equals: bool) -> OpFlag {
    if equals {
        OpFlag::Equals
    } else {
        OpFlag::NotEquals
    }
}

/// Parse arguments 1 and 2 as counts, both at least one.
fn leading_counts(args: &Args, names: &'static str) -> Result<(usize, usize)> {
    let first = args.integer(1)?;
    let second = args.integer(2)?;
    if first < 1 || second < 1 {
        return Err(Error::CountNotPositive { counts: names });
    }
    let as_usize = |n: i64| usize::try_from(n).map_err(|_| Error::NotInteger);
    Ok((as_usize(first)?, as_usize(second)?))
}

/// Optional trailing `COUNT n` of the NGET family.
fn parse_count_option(args: &Args) -> Result<Option<usize>> {
    if args.len() == 2 {
        return Ok(None);
    }
    if !args.arg(2)?.eq_ignore_ascii_case(b"COUNT") {
        return Err(Error::Syntax);
    }
    let n = args.integer(3)?;
    if n < 1 {
        return Err(Error::Syntax);
    }
    usize::try_from(n).map(Some).map_err(|_| Error::NotInteger)
}
