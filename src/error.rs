//! Error types for intgrid

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a container or grid operation can report.
///
/// All errors are local to the call that violated a precondition; nothing is
/// retried internally and no error leaves a container in a torn state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed argument: reversed range, reserved key, missing precondition
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Index or rectangle outside the current bounding box
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    /// Operation on an evicted handle, or a repeated removal
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Structural change observed by a live traversal
    #[error("Concurrent modification: traversal opened at revision {expected}, store is at {found}")]
    ConcurrentModification { expected: u64, found: u64 },

    /// Capacity request beyond the slot ceiling
    #[error("Resource exhausted: {requested} slots requested, limit is {limit}")]
    ResourceExhausted { requested: usize, limit: usize },

    /// First/last key of an empty range
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create an index out of range error
    pub fn index_out_of_range(msg: impl Into<String>) -> Self {
        Error::IndexOutOfRange(msg.into())
    }

    /// Create an illegal state error
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Error::IllegalState(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub(crate) fn concurrent_modification(expected: u64, found: u64) -> Self {
        Error::ConcurrentModification { expected, found }
    }

    pub(crate) fn resource_exhausted(requested: usize, limit: usize) -> Self {
        tracing::warn!(requested, limit, "capacity request exceeds slot ceiling");
        Error::ResourceExhausted { requested, limit }
    }

    /// Returns true if this is a fail-fast traversal error
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, Error::ConcurrentModification { .. })
    }

    /// Returns true if this error reports a stale handle or repeated removal
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }
}
