//! The append/prepend operator.

use tracing::{debug, warn};

use crate::buffer::BufferGroup;
use crate::error::Result;
use crate::mutate::AppendPrependResult;
use crate::segment::{SegmentedObject, Transaction};
use crate::source::ByteSource;
use crate::types::{Direction, ObjectId};
use crate::value::StoredValue;

/// Extend a value with the bytes of a source, at the back or the front.
///
/// The source is consumed exactly once on every path, including rejections.
/// On success the returned descriptor replaces the old one; the old
/// descriptor must not be used afterwards, since a small-to-large
/// transition moves its bytes into a fresh segmented object.
///
/// A failed source never escapes as an error. It rolls back all storage
/// effects and comes back as [`AppendPrependResult::ProviderFailed`]; the
/// error channel is reserved for engine-invariant violations such as a
/// descriptor naming an object the store does not know.
pub fn append_prepend(
    old: Option<&StoredValue>,
    source: &mut dyn ByteSource,
    direction: Direction,
    txn: &Transaction<'_>,
) -> Result<AppendPrependResult> {
    let old = match old {
        Some(value) => value,
        None => {
            consume_rejected(source);
            return Ok(AppendPrependResult::NotFound);
        }
    };

    let n = source.size();
    let new_total = old.size() + n as u64;
    if new_total > txn.max_value_size() {
        consume_rejected(source);
        return Ok(AppendPrependResult::TooLarge);
    }

    match old {
        StoredValue::Small(old_bytes) if new_total <= txn.max_inline_value_size() => {
            small_to_small(old_bytes, source, direction)
        }
        StoredValue::Small(old_bytes) => small_to_large(old_bytes, source, direction, txn),
        StoredValue::Large { size, locator } => {
            large_to_large(*size, *locator, source, direction, txn)
        }
    }
}

/// Fill into a scratch copy of the inline bytes. Failure rolls back by
/// dropping the scratch.
fn small_to_small(
    old_bytes: &[u8],
    source: &mut dyn ByteSource,
    direction: Direction,
) -> Result<AppendPrependResult> {
    let n = source.size();
    let mut scratch = vec![0u8; old_bytes.len() + n];
    let hole = match direction {
        Direction::Append => {
            scratch[..old_bytes.len()].copy_from_slice(old_bytes);
            &mut scratch[old_bytes.len()..]
        }
        Direction::Prepend => {
            scratch[n..].copy_from_slice(old_bytes);
            &mut scratch[..n]
        }
    };

    let fill_result = {
        let mut dest = BufferGroup::new();
        dest.add_buffer(hole);
        source.fill(&mut dest)
    };
    match fill_result {
        Ok(()) => Ok(AppendPrependResult::Success(StoredValue::Small(scratch))),
        Err(e) => {
            warn!(error = %e, "inline fill failed, scratch dropped");
            failure_result(e)
        }
    }
}

/// Allocate a fresh segmented object, lay the old bytes down, fill the new
/// region. Failure rolls back by reclaiming the allocation.
fn small_to_large(
    old_bytes: &[u8],
    source: &mut dyn ByteSource,
    direction: Direction,
    txn: &Transaction<'_>,
) -> Result<AppendPrependResult> {
    let n = source.size();
    let new_total = old_bytes.len() + n;
    let locator = txn.store().allocate(new_total);
    let mut guard = txn.store().acquire_write(locator)?;

    let (old_start, new_start) = match direction {
        Direction::Append => (0, old_bytes.len()),
        Direction::Prepend => (n, 0),
    };
    guard
        .write_region(old_start, old_bytes.len())
        .fill_from_slice(old_bytes);

    let fill_result = {
        let mut dest = guard.write_region(new_start, n);
        source.fill(&mut dest)
    };
    match fill_result {
        Ok(()) => {
            debug!(%locator, new_total, "value moved out of line");
            Ok(AppendPrependResult::Success(StoredValue::large(
                new_total as u64,
                locator,
            )))
        }
        Err(e) => {
            warn!(%locator, error = %e, "fill into fresh object failed, reclaiming");
            guard.mark_deleted();
            drop(guard);
            txn.store().remove(locator)?;
            failure_result(e)
        }
    }
}

/// Grow the existing object, fill the grown region. Failure rolls back by
/// the recorded inverse shrink; the object is bit-for-bit as before.
fn large_to_large(
    old_size: u64,
    locator: ObjectId,
    source: &mut dyn ByteSource,
    direction: Direction,
    txn: &Transaction<'_>,
) -> Result<AppendPrependResult> {
    let n = source.size();
    let mut guard = match txn.store().acquire_write(locator) {
        Ok(guard) => guard,
        Err(e) => {
            consume_rejected(source);
            return Err(e);
        }
    };

    let delta = match direction {
        Direction::Append => guard.grow_append(n),
        Direction::Prepend => guard.grow_prepend(n),
    };
    let undo = GrowthUndo {
        direction,
        bytes: n,
    };

    let new_start = match direction {
        Direction::Append => old_size as usize,
        Direction::Prepend => 0,
    };
    let fill_result = {
        let mut dest = guard.write_region(new_start, n);
        source.fill(&mut dest)
    };
    match fill_result {
        Ok(()) => {
            let mut new_value = StoredValue::large(old_size, locator);
            new_value.apply_delta(delta);
            Ok(AppendPrependResult::Success(new_value))
        }
        Err(e) => {
            warn!(%locator, error = %e, "fill into grown region failed, shrinking back");
            undo.revert(&mut guard);
            failure_result(e)
        }
    }
}

/// Record of a growth operation, sufficient to undo it exactly.
struct GrowthUndo {
    direction: Direction,
    bytes: usize,
}

impl GrowthUndo {
    fn revert(&self, object: &mut SegmentedObject) {
        match self.direction {
            Direction::Append => object.shrink_append(self.bytes),
            Direction::Prepend => object.shrink_prepend(self.bytes),
        };
    }
}

/// Consume a source whose bytes the operator decided not to take.
///
/// The consume-exactly-once obligation holds on rejection paths too. A
/// discard failure changes nothing: the rejection already stands and no
/// storage was touched.
fn consume_rejected(source: &mut dyn ByteSource) {
    if let Err(e) = source.discard() {
        debug!(error = %e, "discard of rejected source failed");
    }
}

fn failure_result(e: crate::error::StorageError) -> Result<AppendPrependResult> {
    if e.is_provider_failure() {
        Ok(AppendPrependResult::ProviderFailed)
    } else {
        Err(e)
    }
}
