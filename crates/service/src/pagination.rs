//! Pagination utilities for service layer
//!
//! Provides an offset/limit `Window` and helpers to normalize inputs.

/// Largest page a caller may request.
pub const MAX_LIMIT: u64 = 100;

/// Offset/limit window applied to list queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// rows skipped before the first returned one
    pub offset: u64,
    /// upper bound on returned rows
    pub limit: u64,
}

impl Window {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit: limit.min(MAX_LIMIT) }
    }

    /// Clamp raw (possibly negative) query values into a valid window.
    pub fn clamp(offset: i64, limit: i64) -> Self {
        Self::new(offset.max(0) as u64, limit.max(0) as u64)
    }
}

impl Default for Window {
    fn default() -> Self { Self { offset: 0, limit: 10 } }
}
