//! Scatter/gather buffer views.
//!
//! Buffer groups describe a value's bytes as an ordered list of slices so
//! data can be moved between producers and segmented storage without
//! intermediate copies. A group never owns the memory it points at.

mod group;

pub use group::{BufferGroup, ConstBufferGroup};
