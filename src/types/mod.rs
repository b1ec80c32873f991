//! Common types used throughout the value layer.

mod object_id;

pub use object_id::ObjectId;

use serde::{Deserialize, Serialize};

/// Segment size in bytes (4KB)
pub const SEGMENT_SIZE: usize = 4096;

/// Minimum segment size accepted by a configuration
pub const MIN_SEGMENT_SIZE: usize = 16;

/// Maximum total value size after any mutation (1MB)
pub const MAX_VALUE_SIZE: u64 = 1024 * 1024;

/// Maximum size at which a value is stored inline in its descriptor.
/// Larger values are backed by a segmented object.
pub const MAX_INLINE_VALUE_SIZE: u64 = 250;

/// Direction of a value mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// New bytes go after the existing value
    Append,
    /// New bytes go before the existing value
    Prepend,
}

/// Store configuration for engine limits and segment sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Size of each segment of a segmented object, in bytes
    pub segment_size: usize,
    /// Hard ceiling on total value size after any mutation
    pub max_value_size: u64,
    /// Maximum size stored inline in the value descriptor
    pub max_inline_value_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            segment_size: SEGMENT_SIZE,
            max_value_size: MAX_VALUE_SIZE,
            max_inline_value_size: MAX_INLINE_VALUE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Create a config with custom limits
    pub fn new(segment_size: usize, max_value_size: u64, max_inline_value_size: u64) -> Self {
        Self {
            segment_size: segment_size.max(MIN_SEGMENT_SIZE),
            max_value_size: max_value_size.max(max_inline_value_size),
            max_inline_value_size,
        }
    }

    /// Create a config with tiny segments and low limits, so tests can
    /// exercise multi-segment objects and small/large transitions cheaply
    pub fn small_segments() -> Self {
        Self {
            segment_size: MIN_SEGMENT_SIZE,
            max_value_size: 1024,
            max_inline_value_size: 10,
        }
    }

    /// Set the segment size
    pub fn segment_size(mut self, size: usize) -> Self {
        self.segment_size = size.max(MIN_SEGMENT_SIZE);
        self
    }

    /// Set the maximum total value size
    pub fn max_value_size(mut self, size: u64) -> Self {
        self.max_value_size = size;
        self
    }

    /// Set the inline storage threshold
    pub fn max_inline_value_size(mut self, size: u64) -> Self {
        self.max_inline_value_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.segment_size, SEGMENT_SIZE);
        assert_eq!(config.max_value_size, MAX_VALUE_SIZE);
        assert!(config.max_inline_value_size < config.max_value_size);
    }

    #[test]
    fn test_config_clamps_segment_size() {
        let config = StoreConfig::new(1, 100, 10);
        assert_eq!(config.segment_size, MIN_SEGMENT_SIZE);
    }

    #[test]
    fn test_small_segments_preset() {
        let config = StoreConfig::small_segments();
        assert!(config.max_inline_value_size < config.max_value_size);
        assert!(config.segment_size >= MIN_SEGMENT_SIZE);
    }
}
