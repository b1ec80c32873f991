//! Byte sources over stored values.
//!
//! The factory turns a value descriptor into a [`ByteSource`] producing the
//! value's bytes. Small values are copied out of the descriptor up front;
//! large values hold off acquiring the segmented object until the bytes are
//! actually demanded. Either way the caller gets a completion signal telling
//! it when the source no longer depends on the caller's own locks.

use tracing::warn;

use crate::buffer::ConstBufferGroup;
use crate::error::{Result, StorageError};
use crate::segment::{ObjectReadGuard, Transaction};
use crate::source::{BufferedSource, ByteSource, Obligation};
use crate::types::ObjectId;
use crate::value::StoredValue;

/// One-shot notification that a source has captured the data it needs.
///
/// Producers fire it once the value bytes are independently readable, so
/// the party that created the source can release whatever lock protected
/// the descriptor. Firing twice is harmless; only the first fire runs the
/// callback.
pub struct CompletionSignal {
    callback: Option<Box<dyn FnOnce() + Send>>,
}

impl CompletionSignal {
    /// Wrap a callback to run on completion
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// A signal nobody is listening to
    pub fn noop() -> Self {
        Self { callback: None }
    }

    /// Fire the signal, running the callback if it has not run yet
    pub fn fire(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl std::fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

/// Build a byte source producing a stored value's bytes.
///
/// Small values are copied immediately and `on_captured` fires before this
/// function returns. Large values defer both the object acquisition and the
/// signal to the first consumption call, which is therefore a suspension
/// point.
pub fn value_source<'a>(
    value: &StoredValue,
    txn: &'a Transaction<'a>,
    mut on_captured: CompletionSignal,
) -> Box<dyn ByteSource + 'a> {
    match value {
        StoredValue::Small(bytes) => {
            let source = BufferedSource::copy_of(bytes);
            on_captured.fire();
            Box::new(source)
        }
        StoredValue::Large { size, locator } => Box::new(LargeValueSource {
            size: *size as usize,
            locator: *locator,
            txn,
            guard: None,
            on_captured,
            obligation: Obligation::new(),
        }),
    }
}

/// Source reading a large value out of its segmented object.
///
/// Holds a shared-access guard from first consumption until drop, so the
/// returned buffer views stay valid while the caller walks them.
struct LargeValueSource<'a> {
    size: usize,
    locator: ObjectId,
    txn: &'a Transaction<'a>,
    guard: Option<ObjectReadGuard>,
    on_captured: CompletionSignal,
    obligation: Obligation,
}

impl ByteSource for LargeValueSource<'_> {
    fn size(&self) -> usize {
        self.size
    }

    fn as_buffers(&mut self) -> Result<ConstBufferGroup<'_>> {
        self.obligation.claim();
        let guard = match self.txn.store().acquire_read(self.locator) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(locator = %self.locator, error = %e, "large value acquisition failed");
                return Err(StorageError::ProviderFailed);
            }
        };
        self.on_captured.fire();
        let guard = self.guard.insert(guard);
        Ok(guard.read_region(0, self.size))
    }

    fn discard(&mut self) -> Result<()> {
        self.obligation.claim();
        self.on_captured.fire();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentStore;
    use crate::types::StoreConfig;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn tracked_signal() -> (CompletionSignal, Arc<AtomicBool>) {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let signal = CompletionSignal::new(move || flag.store(true, Ordering::SeqCst));
        (signal, fired)
    }

    fn store_with_object(bytes: &[u8]) -> (SegmentStore, ObjectId) {
        let store = SegmentStore::new(16);
        let id = store.allocate(bytes.len());
        store
            .acquire_write(id)
            .unwrap()
            .write_region(0, bytes.len())
            .fill_from_slice(bytes);
        (store, id)
    }

    #[test]
    fn test_small_value_copies_and_signals_immediately() {
        let store = SegmentStore::new(16);
        let config = StoreConfig::small_segments();
        let txn = Transaction::new(&store, &config);
        let value = StoredValue::small(b"hello".to_vec());

        let (signal, fired) = tracked_signal();
        let mut source = value_source(&value, &txn, signal);
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(source.size(), 5);
        assert_eq!(source.as_buffers().unwrap().to_vec(), b"hello");
    }

    #[test]
    fn test_large_value_defers_acquisition_and_signal() {
        let data: Vec<u8> = (0..40).collect();
        let (store, id) = store_with_object(&data);
        let config = StoreConfig::small_segments();
        let txn = Transaction::new(&store, &config);
        let value = StoredValue::large(40, id);

        let (signal, fired) = tracked_signal();
        let mut source = value_source(&value, &txn, signal);
        assert!(!fired.load(Ordering::SeqCst));

        let bufs = source.as_buffers().unwrap();
        assert_eq!(bufs.to_vec(), data);
        // Spans three 16-byte segments.
        assert_eq!(bufs.num_buffers(), 3);
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dangling_locator_surfaces_as_provider_failure() {
        let store = SegmentStore::new(16);
        let config = StoreConfig::small_segments();
        let txn = Transaction::new(&store, &config);
        let value = StoredValue::large(8, ObjectId::new(42));

        let mut source = value_source(&value, &txn, CompletionSignal::noop());
        assert!(matches!(
            source.as_buffers(),
            Err(StorageError::ProviderFailed)
        ));
    }

    #[test]
    fn test_discard_fires_signal_without_acquisition() {
        let store = SegmentStore::new(16);
        let config = StoreConfig::small_segments();
        let txn = Transaction::new(&store, &config);
        // Dangling locator on purpose: discard must not try to resolve it.
        let value = StoredValue::large(8, ObjectId::new(42));

        let (signal, fired) = tracked_signal();
        let mut source = value_source(&value, &txn, signal);
        source.discard().unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    #[should_panic(expected = "consumed more than once")]
    fn test_large_source_double_consumption_panics() {
        let data = vec![1u8; 20];
        let (store, id) = store_with_object(&data);
        let config = StoreConfig::small_segments();
        let txn = Transaction::new(&store, &config);
        let value = StoredValue::large(20, id);

        let mut source = value_source(&value, &txn, CompletionSignal::noop());
        let _ = source.as_buffers();
        let _ = source.discard();
    }

    #[test]
    fn test_signal_fires_once() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut signal = CompletionSignal::new(move || tx.send(()).unwrap());
        signal.fire();
        signal.fire();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
