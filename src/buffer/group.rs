//! Buffer group implementation.
//!
//! A buffer group is an ordered sequence of slices whose lengths sum to the
//! group's total size. The mutable form describes writable destinations
//! (e.g. freshly grown segments of a large value); the immutable form
//! describes readable sources (e.g. a value's existing segments). Segment
//! boundaries on the two sides need not line up; the copy routines walk both
//! sides independently.

/// An ordered group of writable byte slices
#[derive(Default)]
pub struct BufferGroup<'a> {
    buffers: Vec<&'a mut [u8]>,
}

impl<'a> BufferGroup<'a> {
    /// Create an empty group
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
        }
    }

    /// Append a writable slice to the group
    pub fn add_buffer(&mut self, buf: &'a mut [u8]) {
        self.buffers.push(buf);
    }

    /// Sum of all segment lengths
    pub fn total_size(&self) -> usize {
        self.buffers.iter().map(|b| b.len()).sum()
    }

    /// Number of segments in the group
    pub fn num_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the group has no segments
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Iterate over the writable segments
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [u8]> + use<'_, 'a> {
        self.buffers.iter_mut().map(|b| &mut **b)
    }

    /// Scatter a contiguous slice across the group's segments.
    ///
    /// `src.len()` must equal `total_size()`.
    pub fn fill_from_slice(&mut self, src: &[u8]) {
        assert_eq!(
            src.len(),
            self.total_size(),
            "source length must match buffer group size"
        );
        let mut offset = 0;
        for buf in self.buffers.iter_mut() {
            let n = buf.len();
            buf.copy_from_slice(&src[offset..offset + n]);
            offset += n;
        }
    }
}

impl std::fmt::Debug for BufferGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferGroup")
            .field("num_buffers", &self.num_buffers())
            .field("total_size", &self.total_size())
            .finish()
    }
}

/// An ordered group of read-only byte slices
#[derive(Default)]
pub struct ConstBufferGroup<'a> {
    buffers: Vec<&'a [u8]>,
}

impl<'a> ConstBufferGroup<'a> {
    /// Create an empty group
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
        }
    }

    /// Append a readable slice to the group
    pub fn add_buffer(&mut self, buf: &'a [u8]) {
        self.buffers.push(buf);
    }

    /// Sum of all segment lengths
    pub fn total_size(&self) -> usize {
        self.buffers.iter().map(|b| b.len()).sum()
    }

    /// Number of segments in the group
    pub fn num_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the group has no segments
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Iterate over the readable segments
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.buffers.iter().copied()
    }

    /// Gather the group into one contiguous vector
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_size());
        for buf in &self.buffers {
            out.extend_from_slice(buf);
        }
        out
    }

    /// Copy this group's bytes into a destination group.
    ///
    /// Segment boundaries need not match; both sides are walked
    /// independently. Total sizes must be equal.
    pub fn copy_into(&self, dest: &mut BufferGroup<'_>) {
        assert_eq!(
            self.total_size(),
            dest.total_size(),
            "buffer group sizes must match"
        );

        let mut src_iter = self.buffers.iter();
        let mut src: &[u8] = &[];
        for buf in dest.buffers.iter_mut() {
            let mut dst: &mut [u8] = buf;
            while !dst.is_empty() {
                if src.is_empty() {
                    // Sizes match, so the source cannot run dry here.
                    src = src_iter.next().expect("source group exhausted");
                    continue;
                }
                let n = src.len().min(dst.len());
                let (head, tail) = dst.split_at_mut(n);
                head.copy_from_slice(&src[..n]);
                src = &src[n..];
                dst = tail;
            }
        }
    }
}

impl std::fmt::Debug for ConstBufferGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstBufferGroup")
            .field("num_buffers", &self.num_buffers())
            .field("total_size", &self.total_size())
            .finish()
    }
}
