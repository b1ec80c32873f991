//! Process-local segment store.
//!
//! The store implements the allocator contract the mutation layer is written
//! against: allocate an object, acquire shared or exclusive access to it by
//! locator, reclaim it. Acquisition is the layer's suspension point; a
//! caller holding a guard blocks writers (or everyone) on that one object,
//! never the whole store.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::segment::SegmentedObject;
use crate::types::{ObjectId, StoreConfig};

/// Registry of live segmented objects, keyed by locator.
pub struct SegmentStore {
    segment_size: usize,
    inner: RwLock<StoreInner>,
}

struct StoreInner {
    objects: HashMap<ObjectId, Arc<RwLock<SegmentedObject>>>,
    next_id: u64,
}

impl SegmentStore {
    /// Create an empty store allocating objects with the given segment size
    pub fn new(segment_size: usize) -> Self {
        Self {
            segment_size,
            inner: RwLock::new(StoreInner {
                objects: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Allocate a fresh object of the given initial size
    pub fn allocate(&self, initial_size: usize) -> ObjectId {
        let mut inner = self.inner.write();
        let id = ObjectId::new(inner.next_id);
        inner.next_id += 1;
        let object = SegmentedObject::new(self.segment_size, initial_size);
        inner.objects.insert(id, Arc::new(RwLock::new(object)));
        debug!(%id, initial_size, "allocated segmented object");
        id
    }

    /// Acquire shared read access to an object
    pub fn acquire_read(&self, id: ObjectId) -> Result<ObjectReadGuard> {
        let arc = self.lookup(id)?;
        Ok(ObjectReadGuard {
            guard: arc.read_arc(),
        })
    }

    /// Acquire exclusive write access to an object
    pub fn acquire_write(&self, id: ObjectId) -> Result<ObjectWriteGuard> {
        let arc = self.lookup(id)?;
        Ok(ObjectWriteGuard {
            guard: arc.write_arc(),
        })
    }

    /// Reclaim an object, dropping its segments once all guards are gone
    pub fn remove(&self, id: ObjectId) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.objects.remove(&id) {
            Some(_) => {
                debug!(%id, "reclaimed segmented object");
                Ok(())
            }
            None => Err(StorageError::ObjectNotFound(id)),
        }
    }

    /// Whether the locator resolves to a live object
    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.read().objects.contains_key(&id)
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.inner.read().objects.len()
    }

    fn lookup(&self, id: ObjectId) -> Result<Arc<RwLock<SegmentedObject>>> {
        self.inner
            .read()
            .objects
            .get(&id)
            .cloned()
            .ok_or(StorageError::ObjectNotFound(id))
    }
}

impl std::fmt::Debug for SegmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentStore")
            .field("segment_size", &self.segment_size)
            .field("objects", &self.object_count())
            .finish()
    }
}

/// RAII shared-access guard over a segmented object.
///
/// Owns its lock (`Arc`-based), so it can be stored in structs that outlive
/// the acquiring call frame.
pub struct ObjectReadGuard {
    guard: ArcRwLockReadGuard<RawRwLock, SegmentedObject>,
}

impl Deref for ObjectReadGuard {
    type Target = SegmentedObject;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// RAII exclusive-access guard over a segmented object
pub struct ObjectWriteGuard {
    guard: ArcRwLockWriteGuard<RawRwLock, SegmentedObject>,
}

impl Deref for ObjectWriteGuard {
    type Target = SegmentedObject;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for ObjectWriteGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

/// Capability handle for one logical mutation flow.
///
/// Borrows the store and carries the engine limits the flow must respect.
/// Handed out by the facade; everything below the facade takes a
/// transaction instead of reaching for globals.
pub struct Transaction<'a> {
    store: &'a SegmentStore,
    config: &'a StoreConfig,
}

impl<'a> Transaction<'a> {
    /// Create a transaction over a store with the given limits
    pub fn new(store: &'a SegmentStore, config: &'a StoreConfig) -> Self {
        Self { store, config }
    }

    /// The segment store this transaction operates on
    pub fn store(&self) -> &'a SegmentStore {
        self.store
    }

    /// Engine limits in force for this flow
    pub fn config(&self) -> &'a StoreConfig {
        self.config
    }

    /// Hard ceiling on total value size after any mutation
    pub fn max_value_size(&self) -> u64 {
        self.config.max_value_size
    }

    /// Largest value stored inline in its descriptor
    pub fn max_inline_value_size(&self) -> u64 {
        self.config.max_inline_value_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_assigns_distinct_ids() {
        let store = SegmentStore::new(16);
        let a = store.allocate(10);
        let b = store.allocate(10);
        assert_ne!(a, b);
        assert_eq!(store.object_count(), 2);
        assert!(store.contains(a));
    }

    #[test]
    fn test_write_then_read_through_guards() {
        let store = SegmentStore::new(16);
        let id = store.allocate(20);
        {
            let mut guard = store.acquire_write(id).unwrap();
            let data: Vec<u8> = (0..20).collect();
            guard.write_region(0, 20).fill_from_slice(&data);
        }
        let guard = store.acquire_read(id).unwrap();
        assert_eq!(guard.size(), 20);
        assert_eq!(
            guard.read_region(0, 20).to_vec(),
            (0..20).collect::<Vec<u8>>()
        );
    }

    #[test]
    fn test_missing_object_is_an_error() {
        let store = SegmentStore::new(16);
        let id = ObjectId::new(99);
        assert!(matches!(
            store.acquire_read(id),
            Err(StorageError::ObjectNotFound(_))
        ));
        assert!(store.remove(id).is_err());
    }

    #[test]
    fn test_remove_reclaims() {
        let store = SegmentStore::new(16);
        let id = store.allocate(8);
        store.remove(id).unwrap();
        assert!(!store.contains(id));
        assert_eq!(store.object_count(), 0);
    }

    #[test]
    fn test_guard_outlives_removal() {
        let store = SegmentStore::new(16);
        let id = store.allocate(8);
        let guard = store.acquire_read(id).unwrap();
        store.remove(id).unwrap();
        // The guard owns its lock; the object stays readable until dropped.
        assert_eq!(guard.size(), 8);
    }

    #[test]
    fn test_concurrent_readers() {
        let store = Arc::new(SegmentStore::new(16));
        let id = store.allocate(16);
        {
            let mut guard = store.acquire_write(id).unwrap();
            guard.write_region(0, 16).fill_from_slice(&[7u8; 16]);
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let guard = store.acquire_read(id).unwrap();
                    assert_eq!(guard.read_region(0, 16).to_vec(), vec![7u8; 16]);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_transaction_exposes_limits() {
        let store = SegmentStore::new(16);
        let config = StoreConfig::small_segments();
        let txn = Transaction::new(&store, &config);
        assert_eq!(txn.max_value_size(), config.max_value_size);
        assert_eq!(txn.max_inline_value_size(), config.max_inline_value_size);
        assert_eq!(txn.store().object_count(), 0);
    }
}
