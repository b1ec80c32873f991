//! Segmented object storage.
//!
//! A segmented object stores a large value's bytes as a sequence of
//! fixed-size segments. The logical byte range is addressed from the front
//! offset in the first segment, so prepending only allocates at the front
//! instead of shifting the whole value. Growth and shrink operations are
//! exact inverses, which is what the mutation layer's rollback relies on.

mod store;

pub use store::{ObjectReadGuard, ObjectWriteGuard, SegmentStore, Transaction};

use std::collections::VecDeque;

use tracing::trace;

use crate::buffer::{BufferGroup, ConstBufferGroup};

/// A growable, shrinkable sequence of fixed-size segments holding one
/// value's bytes.
///
/// Invariant: `segment_count() * segment_size` covers exactly
/// `front_offset + size` bytes, rounded up to whole segments. Growth in
/// either direction followed by the matching shrink of the same byte count
/// restores size, segment count and content bit for bit.
pub struct SegmentedObject {
    segment_size: usize,
    segments: VecDeque<Box<[u8]>>,
    // Offset of the first value byte within the first segment. Always less
    // than segment_size; zero when the object is empty.
    front_offset: usize,
    size: usize,
    deleted: bool,
}

impl SegmentedObject {
    /// Create an object of the given initial size, zero-filled
    pub fn new(segment_size: usize, initial_size: usize) -> Self {
        assert!(segment_size > 0, "segment size must be positive");
        let count = ceil_div(initial_size, segment_size);
        let segments = (0..count)
            .map(|_| vec![0u8; segment_size].into_boxed_slice())
            .collect();
        Self {
            segment_size,
            segments,
            front_offset: 0,
            size: initial_size,
            deleted: false,
        }
    }

    /// Logical size of the stored value in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of segments currently allocated
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segment size this object was created with
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Mark the object as logically deleted; the store reclaims it later
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Whether the object has been marked deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Extend the value by `n` bytes at the back, allocating segments as
    /// needed. Returns the descriptor-size delta.
    pub fn grow_append(&mut self, n: usize) -> i64 {
        let new_end = self.front_offset + self.size + n;
        while self.segments.len() * self.segment_size < new_end {
            self.segments
                .push_back(vec![0u8; self.segment_size].into_boxed_slice());
        }
        self.size += n;
        trace!(n, segments = self.segments.len(), "grew at back");
        n as i64
    }

    /// Extend the value by `n` bytes at the front, allocating segments as
    /// needed and moving the front offset. Returns the descriptor-size
    /// delta.
    pub fn grow_prepend(&mut self, n: usize) -> i64 {
        if n <= self.front_offset {
            self.front_offset -= n;
        } else {
            let needed = ceil_div(n - self.front_offset, self.segment_size);
            for _ in 0..needed {
                self.segments
                    .push_front(vec![0u8; self.segment_size].into_boxed_slice());
            }
            self.front_offset = self.front_offset + needed * self.segment_size - n;
        }
        self.size += n;
        trace!(n, segments = self.segments.len(), "grew at front");
        n as i64
    }

    /// Drop the last `n` bytes, releasing segments no longer covered.
    /// Exact inverse of [`grow_append`](Self::grow_append) of the same
    /// count. Returns the descriptor-size delta.
    pub fn shrink_append(&mut self, n: usize) -> i64 {
        assert!(n <= self.size, "shrink past object size");
        self.size -= n;
        let new_end = self.front_offset + self.size;
        while self.segments.len() > ceil_div(new_end, self.segment_size) {
            self.segments.pop_back();
        }
        trace!(n, segments = self.segments.len(), "shrank at back");
        -(n as i64)
    }

    /// Drop the first `n` bytes, releasing segments no longer covered.
    /// Exact inverse of [`grow_prepend`](Self::grow_prepend) of the same
    /// count. Returns the descriptor-size delta.
    pub fn shrink_prepend(&mut self, n: usize) -> i64 {
        assert!(n <= self.size, "shrink past object size");
        let new_front = self.front_offset + n;
        for _ in 0..new_front / self.segment_size {
            self.segments.pop_front();
        }
        self.front_offset = new_front % self.segment_size;
        self.size -= n;
        trace!(n, segments = self.segments.len(), "shrank at front");
        -(n as i64)
    }

    /// Whole-segment write access by segment index
    pub fn segment_for_write(&mut self, index: usize) -> &mut [u8] {
        &mut self.segments[index]
    }

    /// Writable view of the logical byte range `[start, start + len)`,
    /// one group entry per storage segment touched.
    pub fn write_region(&mut self, start: usize, len: usize) -> BufferGroup<'_> {
        assert!(
            start + len <= self.size,
            "write region outside object bounds"
        );
        let seg_size = self.segment_size;
        let absolute = self.front_offset + start;
        let first = absolute / seg_size;
        let mut offset = absolute % seg_size;
        let mut remaining = len;

        let mut group = BufferGroup::new();
        for seg in self.segments.iter_mut().skip(first) {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(seg_size - offset);
            group.add_buffer(&mut seg[offset..offset + take]);
            remaining -= take;
            offset = 0;
        }
        group
    }

    /// Readable view of the logical byte range `[start, start + len)`
    pub fn read_region(&self, start: usize, len: usize) -> ConstBufferGroup<'_> {
        assert!(start + len <= self.size, "read region outside object bounds");
        let seg_size = self.segment_size;
        let absolute = self.front_offset + start;
        let first = absolute / seg_size;
        let mut offset = absolute % seg_size;
        let mut remaining = len;

        let mut group = ConstBufferGroup::new();
        for seg in self.segments.iter().skip(first) {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(seg_size - offset);
            group.add_buffer(&seg[offset..offset + take]);
            remaining -= take;
            offset = 0;
        }
        group
    }
}

impl std::fmt::Debug for SegmentedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedObject")
            .field("size", &self.size)
            .field("segments", &self.segments.len())
            .field("front_offset", &self.front_offset)
            .field("deleted", &self.deleted)
            .finish()
    }
}

fn ceil_div(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}
