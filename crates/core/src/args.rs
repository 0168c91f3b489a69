//! Argument vectors and borrowed views over them.
//!
//! An [`Args`] is the full client invocation, command name first. Handlers
//! never copy sub-ranges out of it: they borrow a [`PairView`] (key/value or
//! channel/message pairs) or a [`KeyView`] (flat key list) whose bounds are
//! checked when the view is created.

use crate::error::{Error, Result};

/// An owned, immutable client argument vector. Element 0 is the command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    items: Vec<Vec<u8>>,
}

impl Args {
    /// Build an argument vector from anything byte-like.
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a whitespace-separated line into arguments.
    ///
    /// Convenience for tests and examples; arguments containing spaces need
    /// [`Args::new`].
    pub fn from_line(line: &str) -> Self {
        Self::new(line.split_whitespace())
    }

    /// Number of arguments, including the command name.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when not even a command name is present.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The command name, or an empty slice for an empty vector.
    pub fn name(&self) -> &[u8] {
        self.items.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// Argument at `index`.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.items.get(index).map(Vec::as_slice)
    }

    /// Argument at `index`, which the caller has already arity-checked.
    ///
    /// Falls back to an arity error rather than panicking if the check was
    /// missed.
    pub fn arg(&self, index: usize) -> Result<&[u8]> {
        self.get(index).ok_or_else(|| Error::wrong_arity(self.name()))
    }

    /// Borrow `len` arguments starting at `start`.
    pub fn slice(&self, start: usize, len: usize) -> Result<&[Vec<u8>]> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| Error::wrong_arity(self.name()))?;
        self.items
            .get(start..end)
            .ok_or_else(|| Error::wrong_arity(self.name()))
    }

    /// Borrow `count` pairs (2 * `count` arguments) starting at `start`.
    pub fn pairs(&self, start: usize, count: usize) -> Result<PairView<'_>> {
        let len = count
            .checked_mul(2)
            .ok_or_else(|| Error::wrong_arity(self.name()))?;
        PairView::new(self.slice(start, len)?)
    }

    /// Borrow `count` keys starting at `start`.
    pub fn keys(&self, start: usize, count: usize) -> Result<KeyView<'_>> {
        Ok(KeyView::new(self.slice(start, count)?))
    }

    /// Parse the argument at `index` as a signed integer.
    pub fn integer(&self, index: usize) -> Result<i64> {
        let raw = self.arg(index)?;
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(Error::NotInteger)
    }
}

/// A borrowed view of consecutive `(first, second)` argument pairs.
///
/// Used for key/value pairs handed to MSET and channel/message pairs handed
/// to PUBLISH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairView<'a> {
    items: &'a [Vec<u8>],
}

impl<'a> PairView<'a> {
    /// Wrap a slice. Odd-length slices are rejected.
    pub fn new(items: &'a [Vec<u8>]) -> Result<Self> {
        if items.len() % 2 != 0 {
            return Err(Error::internal(format!(
                "pair view over {} arguments",
                items.len()
            )));
        }
        Ok(Self { items })
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.items.len() / 2
    }

    /// True when the view holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First element of the first pair (the gated key for single-key commands).
    pub fn first_key(&self) -> Option<&'a [u8]> {
        self.items.first().map(Vec::as_slice)
    }

    /// Iterate pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        let items: &'a [Vec<u8>] = self.items;
        items
            .chunks_exact(2)
            .map(|pair| (pair[0].as_slice(), pair[1].as_slice()))
    }

    /// Flatten into a sub-command argument list.
    pub fn flat(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let items: &'a [Vec<u8>] = self.items;
        items.iter().map(Vec::as_slice)
    }
}

/// A borrowed view of a flat key list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyView<'a> {
    items: &'a [Vec<u8>],
}

impl<'a> KeyView<'a> {
    /// Wrap a slice of keys.
    pub fn new(items: &'a [Vec<u8>]) -> Self {
        Self { items }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the view holds no keys.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First key (the gated key for single-key commands).
    pub fn first(&self) -> Option<&'a [u8]> {
        self.items.first().map(Vec::as_slice)
    }

    /// Iterate keys in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let items: &'a [Vec<u8>] = self.items;
        items.iter().map(Vec::as_slice)
    }
}
