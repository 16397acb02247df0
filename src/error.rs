use thiserror::Error;

/// Failures reported by map operations.
///
/// Every failure is detected before the map is touched, so an operation that
/// returns an error has not mutated anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested key is not in the map.
    #[error("key not found in map")]
    KeyNotFound,
    /// A cursor was dereferenced at a boundary sentinel, stepped past either
    /// end of the map, belongs to a different map, or refers to an entry that
    /// has since been erased.
    #[error("cursor does not refer to a usable entry of this map")]
    InvalidCursor,
    /// Front or back access on an empty container.
    #[error("container is empty")]
    Empty,
}
