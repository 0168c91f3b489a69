//! Process-wide literals shared by every invocation.
//!
//! Built at most once and never mutated afterwards.

use once_cell::sync::Lazy;

/// Keys requested per SCAN call when the caller gives no `COUNT`.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Cursor that starts a walk and signals its end.
pub const ZERO_CURSOR: &[u8] = b"0";

/// SCAN keyword introducing the pattern.
pub const MATCH_KEYWORD: &[u8] = b"MATCH";

/// SCAN keyword introducing the batch size.
pub const COUNT_KEYWORD: &[u8] = b"COUNT";

/// [`DEFAULT_BATCH_SIZE`] rendered as a SCAN argument.
pub static DEFAULT_BATCH_ARG: Lazy<Vec<u8>> =
    Lazy::new(|| DEFAULT_BATCH_SIZE.to_string().into_bytes());

/// Render a batch size as a SCAN argument, reusing the shared literal for the default.
pub fn batch_arg(batch_size: usize) -> std::borrow::Cow<'static, [u8]> {
    if batch_size == DEFAULT_BATCH_SIZE {
        std::borrow::Cow::Borrowed(DEFAULT_BATCH_ARG.as_slice())
    } else {
        std::borrow::Cow::Owned(batch_size.to_string().into_bytes())
    }
}

/// True when `cursor` is the zero cursor.
pub fn is_zero_cursor(cursor: &[u8]) -> bool {
    cursor == ZERO_CURSOR
}
