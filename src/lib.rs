//! # Value Storage Layer
//!
//! The value representation and mutation layer of a disk-backed B-tree
//! storage engine.
//!
//! ## Architecture
//!
//! The layer is composed of modular, swappable components:
//!
//! - **Buffer Views** (`buffer`): Scatter/gather views over value bytes
//! - **Byte Sources** (`source`): Read-once producers with buffering adapters
//! - **Value Descriptors** (`value`): Inline vs segmented value representation
//! - **Segment Layer** (`segment`): Segmented objects and their store
//! - **Mutation** (`mutate`): Append/prepend with transactional rollback
//!
//! ## Usage
//!
//! ```rust,ignore
//! use value_storage::{BufferedSource, StoreConfig, ValueStore, WriteOutcome};
//!
//! let store = ValueStore::new(StoreConfig::default());
//!
//! // Create a value from a byte source
//! let mut source = BufferedSource::copy_of(b"hello");
//! let value = match store.write_value(&mut source)? {
//!     WriteOutcome::Written(value) => value,
//!     other => panic!("{other:?}"),
//! };
//!
//! // Extend it at the back
//! let mut tail = BufferedSource::copy_of(b", world");
//! let result = store.append(Some(&value), &mut tail)?;
//!
//! // Read it back
//! let bytes = store.read_value(&value)?;
//! ```

pub mod buffer;
pub mod error;
pub mod mutate;
pub mod segment;
pub mod source;
pub mod types;
pub mod value;

pub use error::{Result, StorageError};
pub use types::{Direction, ObjectId, StoreConfig, SEGMENT_SIZE};

// Re-export main public API
pub use buffer::{BufferGroup, ConstBufferGroup};
pub use mutate::{append_prepend, AppendPrependResult};
pub use segment::{SegmentStore, Transaction};
pub use source::{
    value_source, AutoBuffering, BufferedSource, ByteSource, CompletionSignal, FillSource,
    ThresholdBufferedSource,
};
pub use value::StoredValue;

use tracing::warn;

/// Outcome of creating a value from a byte source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value was stored; this is its descriptor
    Written(StoredValue),
    /// The source exceeds the maximum value size; nothing was stored
    TooLarge,
    /// The source failed mid-stream; any fresh allocation was reclaimed
    ProviderFailed,
}

/// Main handle for the value layer.
///
/// Owns the segment store and the engine limits, and is the entry point
/// other engine layers go through: create a value from a source, read it
/// back, extend it, release it.
pub struct ValueStore {
    store: SegmentStore,
    config: StoreConfig,
}

impl ValueStore {
    /// Create a value store with the given limits
    pub fn new(config: StoreConfig) -> Self {
        Self {
            store: SegmentStore::new(config.segment_size),
            config,
        }
    }

    /// Get the limits this store enforces
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Start a logical mutation flow
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(&self.store, &self.config)
    }

    /// Create a value from a byte source, inline or segmented depending on
    /// its size.
    ///
    /// The source is consumed exactly once on every path. A mid-stream
    /// failure while filling a fresh segmented object reclaims the
    /// allocation before returning.
    pub fn write_value(&self, source: &mut dyn ByteSource) -> Result<WriteOutcome> {
        let n = source.size();
        if n as u64 > self.config.max_value_size {
            if let Err(e) = source.discard() {
                warn!(error = %e, "discard of oversized source failed");
            }
            return Ok(WriteOutcome::TooLarge);
        }

        if n as u64 <= self.config.max_inline_value_size {
            let mut bytes = vec![0u8; n];
            let fill_result = {
                let mut dest = BufferGroup::new();
                dest.add_buffer(&mut bytes);
                source.fill(&mut dest)
            };
            return match fill_result {
                Ok(()) => Ok(WriteOutcome::Written(StoredValue::Small(bytes))),
                Err(e) if e.is_provider_failure() => Ok(WriteOutcome::ProviderFailed),
                Err(e) => Err(e),
            };
        }

        let locator = self.store.allocate(n);
        let mut guard = self.store.acquire_write(locator)?;
        let fill_result = {
            let mut dest = guard.write_region(0, n);
            source.fill(&mut dest)
        };
        match fill_result {
            Ok(()) => Ok(WriteOutcome::Written(StoredValue::large(n as u64, locator))),
            Err(e) => {
                warn!(%locator, error = %e, "fill of fresh value failed, reclaiming");
                guard.mark_deleted();
                drop(guard);
                self.store.remove(locator)?;
                if e.is_provider_failure() {
                    Ok(WriteOutcome::ProviderFailed)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Materialize a value's bytes
    pub fn read_value(&self, value: &StoredValue) -> Result<Vec<u8>> {
        let txn = self.begin();
        let mut source = value_source(value, &txn, CompletionSignal::noop());
        let bufs = source.as_buffers()?;
        Ok(bufs.to_vec())
    }

    /// Release a value, reclaiming its segmented object if it has one
    pub fn delete_value(&self, value: StoredValue) -> Result<()> {
        match value.locator() {
            Some(locator) => self.store.remove(locator),
            None => Ok(()),
        }
    }

    /// Append a source's bytes to an existing value
    pub fn append(
        &self,
        old: Option<&StoredValue>,
        source: &mut dyn ByteSource,
    ) -> Result<AppendPrependResult> {
        let txn = self.begin();
        append_prepend(old, source, Direction::Append, &txn)
    }

    /// Prepend a source's bytes to an existing value
    pub fn prepend(
        &self,
        old: Option<&StoredValue>,
        source: &mut dyn ByteSource,
    ) -> Result<AppendPrependResult> {
        let txn = self.begin();
        append_prepend(old, source, Direction::Prepend, &txn)
    }

    /// Get statistics about the store
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            object_count: self.store.object_count(),
            segment_size: self.config.segment_size,
            max_value_size: self.config.max_value_size,
            max_inline_value_size: self.config.max_inline_value_size,
        }
    }
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("config", &self.config)
            .field("objects", &self.store.object_count())
            .finish()
    }
}

/// Store statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Number of live segmented objects
    pub object_count: usize,
    /// Segment size objects are allocated with
    pub segment_size: usize,
    /// Hard ceiling on total value size
    pub max_value_size: u64,
    /// Largest value stored inline
    pub max_inline_value_size: u64,
}
