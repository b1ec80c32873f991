//! Source backed by an owned contiguous buffer.

use crate::buffer::{BufferGroup, ConstBufferGroup};
use crate::error::Result;
use crate::source::{ByteSource, Obligation};

/// A byte source that owns its bytes in one contiguous allocation.
///
/// Three ways to get one: drain another source ([`from_source`](Self::from_source)),
/// copy a slice ([`copy_of`](Self::copy_of)), or allocate zeroes
/// ([`zeroed`](Self::zeroed)) and write into [`buffer_mut`](Self::buffer_mut)
/// before handing the source off.
pub struct BufferedSource {
    buffer: Box<[u8]>,
    obligation: Obligation,
}

impl BufferedSource {
    /// Drain another source into a fresh buffer.
    ///
    /// Counts as the inner source's one consumption. If the inner source
    /// fails mid-fill the error propagates and the partial buffer is
    /// dropped.
    pub fn from_source(source: &mut dyn ByteSource) -> Result<Self> {
        let mut buffer = vec![0u8; source.size()].into_boxed_slice();
        {
            let mut dest = BufferGroup::new();
            dest.add_buffer(&mut buffer);
            source.fill(&mut dest)?;
        }
        Ok(Self {
            buffer,
            obligation: Obligation::new(),
        })
    }

    /// Copy a slice into an owned buffer
    pub fn copy_of(data: &[u8]) -> Self {
        Self {
            buffer: data.to_vec().into_boxed_slice(),
            obligation: Obligation::new(),
        }
    }

    /// Allocate a zero-filled buffer of the given size
    pub fn zeroed(size: usize) -> Self {
        Self {
            buffer: vec![0u8; size].into_boxed_slice(),
            obligation: Obligation::new(),
        }
    }

    /// Mutable access to the backing buffer, for filling in data after
    /// [`zeroed`](Self::zeroed). Illegal once the source has been consumed.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        assert!(
            !self.obligation.is_consumed(),
            "buffer mutated after consumption"
        );
        &mut self.buffer
    }
}

impl ByteSource for BufferedSource {
    fn size(&self) -> usize {
        self.buffer.len()
    }

    fn as_buffers(&mut self) -> Result<ConstBufferGroup<'_>> {
        self.obligation.claim();
        let mut group = ConstBufferGroup::new();
        group.add_buffer(&self.buffer);
        Ok(group)
    }
}

impl std::fmt::Debug for BufferedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedSource")
            .field("size", &self.buffer.len())
            .field("consumed", &self.obligation.is_consumed())
            .finish()
    }
}
