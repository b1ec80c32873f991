//! Eager buffering of small sources.

use tracing::trace;

use crate::buffer::{BufferGroup, ConstBufferGroup};
use crate::error::{Result, StorageError};
use crate::source::{BufferedSource, ByteSource, Obligation};

/// Wrapper that drains small sources into memory at construction time.
///
/// Sources at or below the threshold are consumed immediately; anything the
/// inner producer was holding (a socket, a lock) is released before the
/// consumer gets around to asking for the bytes. Larger sources pass through
/// untouched.
///
/// The wrapper is observationally equivalent to the wrapped source. In
/// particular, if the eager drain fails, the failure is recorded and
/// replayed on whichever consumption operation runs later, exactly as if
/// the inner source had failed then.
pub struct ThresholdBufferedSource<S: ByteSource> {
    size: usize,
    inner: S,
    buffered: Option<BufferedSource>,
    drain_failed: bool,
    obligation: Obligation,
}

impl<S: ByteSource> ThresholdBufferedSource<S> {
    /// Wrap a source, draining it now if its size is at most `threshold`
    pub fn new(mut inner: S, threshold: usize) -> Self {
        let size = inner.size();
        let mut buffered = None;
        let mut drain_failed = false;
        if size <= threshold {
            match BufferedSource::from_source(&mut inner) {
                Ok(b) => buffered = Some(b),
                Err(e) => {
                    trace!(size, error = %e, "eager drain failed, replaying later");
                    drain_failed = true;
                }
            }
        }
        Self {
            size,
            inner,
            buffered,
            drain_failed,
            obligation: Obligation::new(),
        }
    }

    /// Whether the inner source was drained at construction
    pub fn is_buffered(&self) -> bool {
        self.buffered.is_some() || self.drain_failed
    }
}

impl<S: ByteSource> ByteSource for ThresholdBufferedSource<S> {
    fn size(&self) -> usize {
        self.size
    }

    fn fill(&mut self, dest: &mut BufferGroup<'_>) -> Result<()> {
        self.obligation.claim();
        if self.drain_failed {
            return Err(StorageError::ProviderFailed);
        }
        match self.buffered.as_mut() {
            Some(b) => b.fill(dest),
            None => self.inner.fill(dest),
        }
    }

    fn as_buffers(&mut self) -> Result<ConstBufferGroup<'_>> {
        self.obligation.claim();
        if self.drain_failed {
            return Err(StorageError::ProviderFailed);
        }
        match self.buffered.as_mut() {
            Some(b) => b.as_buffers(),
            None => self.inner.as_buffers(),
        }
    }

    fn discard(&mut self) -> Result<()> {
        self.obligation.claim();
        if self.drain_failed {
            return Err(StorageError::ProviderFailed);
        }
        match self.buffered.as_mut() {
            Some(b) => b.discard(),
            None => self.inner.discard(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_support::{FailingSource, PatternFill};
    use crate::source::AutoBuffering;

    fn pattern_source(size: usize) -> AutoBuffering<PatternFill> {
        AutoBuffering::new(PatternFill {
            pattern: b"abc".to_vec(),
            size,
        })
    }

    #[test]
    fn test_small_source_buffered_eagerly() {
        let source = ThresholdBufferedSource::new(pattern_source(4), 8);
        assert!(source.is_buffered());
        assert_eq!(source.size(), 4);
    }

    #[test]
    fn test_large_source_passes_through() {
        let source = ThresholdBufferedSource::new(pattern_source(16), 8);
        assert!(!source.is_buffered());
        assert_eq!(source.size(), 16);
    }

    #[test]
    fn test_bytes_identical_both_sides_of_threshold() {
        let mut small = ThresholdBufferedSource::new(pattern_source(6), 8);
        let mut large = ThresholdBufferedSource::new(pattern_source(6), 4);
        assert_eq!(
            small.as_buffers().unwrap().to_vec(),
            large.as_buffers().unwrap().to_vec()
        );
    }

    #[test]
    fn test_fill_through_buffered_path() {
        let mut source = ThresholdBufferedSource::new(pattern_source(5), 8);
        let mut out = [0u8; 5];
        let mut dest = BufferGroup::new();
        dest.add_buffer(&mut out);
        source.fill(&mut dest).unwrap();
        drop(dest);
        assert_eq!(&out, b"abcab");
    }

    #[test]
    fn test_drain_failure_replayed_on_as_buffers() {
        let mut source = ThresholdBufferedSource::new(FailingSource::new(4), 8);
        assert!(source.is_buffered());
        assert!(matches!(
            source.as_buffers(),
            Err(StorageError::ProviderFailed)
        ));
    }

    #[test]
    fn test_drain_failure_replayed_on_discard() {
        let mut source = ThresholdBufferedSource::new(FailingSource::new(4), 8);
        assert!(matches!(source.discard(), Err(StorageError::ProviderFailed)));
    }

    #[test]
    fn test_large_failing_source_fails_lazily() {
        let mut source = ThresholdBufferedSource::new(FailingSource::new(16), 8);
        assert!(!source.is_buffered());
        assert!(matches!(
            source.as_buffers(),
            Err(StorageError::ProviderFailed)
        ));
    }

    #[test]
    #[should_panic(expected = "consumed more than once")]
    fn test_double_consumption_panics() {
        let mut source = ThresholdBufferedSource::new(pattern_source(4), 8);
        source.discard().unwrap();
        let _ = source.discard();
    }
}
