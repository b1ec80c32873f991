//! Value descriptors.
//!
//! A stored value is what a B-tree leaf actually carries: either the value
//! bytes themselves (small values, inline) or a fixed-size descriptor naming
//! a segmented object that holds the bytes (large values). The descriptor
//! records the value's size so readers can size buffers without touching the
//! segment store.

use crate::types::ObjectId;

/// A value as recorded in a leaf entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// Inline bytes, stored directly in the descriptor
    Small(Vec<u8>),
    /// Out-of-line value backed by a segmented object
    Large {
        /// Total value size in bytes
        size: u64,
        /// Locator of the backing segmented object
        locator: ObjectId,
    },
}

impl StoredValue {
    /// Build an inline descriptor from the value bytes
    pub fn small(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Small(bytes.into())
    }

    /// Build an out-of-line descriptor
    pub fn large(size: u64, locator: ObjectId) -> Self {
        Self::Large { size, locator }
    }

    /// Total size of the value in bytes
    pub fn size(&self) -> u64 {
        match self {
            Self::Small(bytes) => bytes.len() as u64,
            Self::Large { size, .. } => *size,
        }
    }

    /// Whether the value is backed by a segmented object
    pub fn is_large(&self) -> bool {
        matches!(self, Self::Large { .. })
    }

    /// Inline bytes, if the value is small
    pub fn inline_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Small(bytes) => Some(bytes),
            Self::Large { .. } => None,
        }
    }

    /// Backing object locator, if the value is large
    pub fn locator(&self) -> Option<ObjectId> {
        match self {
            Self::Small(_) => None,
            Self::Large { locator, .. } => Some(*locator),
        }
    }

    /// Adjust the recorded size by a growth delta from the segment layer.
    ///
    /// Only meaningful for large values; the inline form derives its size
    /// from the bytes it holds.
    pub fn apply_delta(&mut self, delta: i64) {
        match self {
            Self::Small(_) => panic!("size delta applied to an inline value"),
            Self::Large { size, .. } => {
                let new = *size as i64 + delta;
                assert!(new >= 0, "size delta drove value size negative");
                *size = new as u64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_value_size_tracks_bytes() {
        let value = StoredValue::small(b"hello".to_vec());
        assert_eq!(value.size(), 5);
        assert!(!value.is_large());
        assert_eq!(value.inline_bytes(), Some(b"hello".as_ref()));
        assert_eq!(value.locator(), None);
    }

    #[test]
    fn test_large_value_descriptor() {
        let value = StoredValue::large(300, ObjectId::new(7));
        assert_eq!(value.size(), 300);
        assert!(value.is_large());
        assert_eq!(value.inline_bytes(), None);
        assert_eq!(value.locator(), Some(ObjectId::new(7)));
    }

    #[test]
    fn test_apply_delta_adjusts_large_size() {
        let mut value = StoredValue::large(300, ObjectId::new(7));
        value.apply_delta(50);
        assert_eq!(value.size(), 350);
        value.apply_delta(-100);
        assert_eq!(value.size(), 250);
    }

    #[test]
    #[should_panic(expected = "inline value")]
    fn test_apply_delta_on_small_panics() {
        let mut value = StoredValue::small(b"x".to_vec());
        value.apply_delta(1);
    }
}
