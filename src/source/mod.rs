//! Byte sources: read-once producers of value bytes.
//!
//! A [`ByteSource`] conceptually represents a read-only array of bytes of a
//! known size. Concrete implementations produce the bytes from different
//! places: an owned buffer, a stored value's inline bytes, a segmented
//! object, or a wrapped source.
//!
//! The data on a source must be consumed exactly once. Once `fill` or
//! `as_buffers` has been called, it is illegal to call either again. On the
//! flip side, the data must be consumed: a consumer that does not want the
//! bytes calls `discard` to fulfill the obligation. The rule exists for
//! producers that read from a socket or a locked value; they cannot re-read
//! data once taken, but they must take it to get it out of the way.

mod buffered;
mod threshold;
mod value;

pub use buffered::BufferedSource;
pub use threshold::ThresholdBufferedSource;
pub use value::{value_source, CompletionSignal};

use crate::buffer::{BufferGroup, ConstBufferGroup};
use crate::error::Result;

/// A read-once producer of a known number of bytes.
///
/// Exactly one of [`fill`](Self::fill), [`as_buffers`](Self::as_buffers) or
/// [`discard`](Self::discard) may be called, exactly once per instance.
/// Implementations trap violations with an [`Obligation`].
pub trait ByteSource {
    /// Number of bytes this source will produce. Stable; may be queried any
    /// number of times, before or after consumption.
    fn size(&self) -> usize;

    /// Write exactly `size()` bytes across the destination group's segments.
    ///
    /// The destination's total size must equal `size()`; arranging that is
    /// the caller's responsibility.
    ///
    /// The default implementation copies out of [`as_buffers`](Self::as_buffers),
    /// so producers that already hold their bytes only implement that side.
    fn fill(&mut self, dest: &mut BufferGroup<'_>) -> Result<()> {
        let bufs = self.as_buffers()?;
        bufs.copy_into(dest);
        Ok(())
    }

    /// Hand back a view of provider-owned memory already containing the
    /// data. The view is valid for as long as the borrow lives; the backing
    /// memory is valid until the source is dropped.
    fn as_buffers(&mut self) -> Result<ConstBufferGroup<'_>>;

    /// Throw the data away, fulfilling the obligation to consume it.
    ///
    /// The default implementation calls `as_buffers` and ignores the result;
    /// producers may override this to skip work.
    fn discard(&mut self) -> Result<()> {
        self.as_buffers().map(|_| ())
    }
}

/// Tracks the consume-exactly-once obligation of a byte source.
///
/// Double consumption is a programming error, not a runtime condition, so
/// `claim` panics rather than returning an error.
#[derive(Debug, Default)]
pub struct Obligation {
    consumed: bool,
}

impl Obligation {
    /// Create an unclaimed obligation
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a consumption attempt; panics if one already happened
    pub fn claim(&mut self) {
        assert!(!self.consumed, "byte source consumed more than once");
        self.consumed = true;
    }

    /// Whether a consumption operation already ran
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

/// A producer that can only write into caller-provided buffers.
///
/// Implement this for sources that stream (sockets, pipes) and wrap them in
/// [`AutoBuffering`] to get the full [`ByteSource`] surface.
pub trait FillSource {
    /// Number of bytes this producer will write
    fn size(&self) -> usize;

    /// Write exactly `size()` bytes across the destination group
    fn fill(&mut self, dest: &mut BufferGroup<'_>) -> Result<()>;
}

/// Adapter giving a fill-only producer the full [`ByteSource`] surface.
///
/// `as_buffers` drains the producer into a private contiguous buffer on
/// first request; `fill` passes straight through.
pub struct AutoBuffering<S: FillSource> {
    inner: S,
    // None until buffers are requested
    buffer: Option<Box<[u8]>>,
    obligation: Obligation,
}

impl<S: FillSource> AutoBuffering<S> {
    /// Wrap a fill-only producer
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: None,
            obligation: Obligation::new(),
        }
    }
}

impl<S: FillSource> ByteSource for AutoBuffering<S> {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn fill(&mut self, dest: &mut BufferGroup<'_>) -> Result<()> {
        self.obligation.claim();
        self.inner.fill(dest)
    }

    fn as_buffers(&mut self) -> Result<ConstBufferGroup<'_>> {
        self.obligation.claim();

        let mut buf = vec![0u8; self.inner.size()].into_boxed_slice();
        {
            let mut dest = BufferGroup::new();
            dest.add_buffer(&mut buf);
            self.inner.fill(&mut dest)?;
        }
        let buffer = self.buffer.insert(buf);

        let mut group = ConstBufferGroup::new();
        group.add_buffer(buffer);
        Ok(group)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_auto_buffering_fill_passthrough() {
        let mut source = AutoBuffering::new(PatternFill {
            pattern: b"ab".to_vec(),
            size: 5,
        });
        assert_eq!(source.size(), 5);

        let mut out = [0u8; 5];
        let mut dest = BufferGroup::new();
        dest.add_buffer(&mut out);
        source.fill(&mut dest).unwrap();
        drop(dest);
        assert_eq!(&out, b"ababa");
    }

    #[test]
    fn test_auto_buffering_as_buffers_drains_once() {
        let mut source = AutoBuffering::new(PatternFill {
            pattern: b"xyz".to_vec(),
            size: 7,
        });
        let bufs = source.as_buffers().unwrap();
        assert_eq!(bufs.to_vec(), b"xyzxyzx");
    }

    #[test]
    #[should_panic(expected = "consumed more than once")]
    fn test_double_consumption_panics() {
        let mut source = AutoBuffering::new(PatternFill {
            pattern: b"a".to_vec(),
            size: 3,
        });
        let _ = source.as_buffers();
        let mut out = [0u8; 3];
        let mut dest = BufferGroup::new();
        dest.add_buffer(&mut out);
        let _ = source.fill(&mut dest);
    }

    #[test]
    #[should_panic(expected = "consumed more than once")]
    fn test_discard_counts_as_consumption() {
        let mut source = AutoBuffering::new(PatternFill {
            pattern: b"a".to_vec(),
            size: 3,
        });
        source.discard().unwrap();
        let _ = source.as_buffers();
    }

    #[test]
    fn test_failing_source_fails_on_every_path() {
        let mut source = FailingSource::new(4);
        assert_eq!(source.size(), 4);
        assert!(matches!(
            source.as_buffers(),
            Err(crate::error::StorageError::ProviderFailed)
        ));
    }

    #[test]
    fn test_zero_size_source_still_consumable() {
        let mut source = AutoBuffering::new(PatternFill {
            pattern: b"a".to_vec(),
            size: 0,
        });
        let mut dest = BufferGroup::new();
        source.fill(&mut dest).unwrap();
    }
}
