//! Value mutation operators.
//!
//! The append/prepend operator extends an existing value with bytes pulled
//! from a [`ByteSource`](crate::source::ByteSource). It owns the transition
//! between the inline and segmented representations and guarantees failure
//! atomicity: if the source fails mid-stream, every storage-visible effect
//! is rolled back before the operator returns.

mod append_prepend;

pub use append_prepend::append_prepend;

use crate::value::StoredValue;

/// Outcome of an append/prepend call.
///
/// Only engine-invariant violations travel on the error channel; everything
/// a caller is expected to handle, including a failed byte source, is a
/// variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendPrependResult {
    /// The mutation committed; this is the new descriptor
    Success(StoredValue),
    /// No existing value to extend
    NotFound,
    /// The result would exceed the maximum value size; nothing was mutated
    TooLarge,
    /// The byte source failed mid-stream; all storage effects were rolled
    /// back
    ProviderFailed,
}
