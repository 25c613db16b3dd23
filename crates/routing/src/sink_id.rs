//! Sink identifier type
//!
//! `SinkId` is a lightweight, Copy index into the startup sink list.

use std::fmt;

/// Sink identifier
///
/// Assigned sequentially by [`crate::SinkTable`] as sinks are registered.
/// Only used while building: a pipeline's sink names resolve to ids, and
/// the ids to the shared sink handles the pipeline keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u16);

impl SinkId {
    /// Maximum number of sinks supported
    pub const MAX: u16 = u16::MAX;

    #[inline]
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Get the index as usize (for slice indexing)
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink:{}", self.0)
    }
}

impl From<u16> for SinkId {
    #[inline]
    fn from(index: u16) -> Self {
        Self::new(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id = SinkId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.as_usize(), 42);
    }

    #[test]
    fn test_display() {
        assert_eq!(SinkId::new(3).to_string(), "sink:3");
    }

    #[test]
    fn test_slice_indexing() {
        let sinks = ["null", "store", "udp"];
        assert_eq!(sinks[SinkId::new(1).as_usize()], "store");
    }
}
