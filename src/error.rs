//! Errors reported by the map constructors and resize operations

use std::collections::TryReserveError;

use thiserror::Error;

/// Failures of map construction, configuration and resizing.
///
/// Lookups and removals of absent keys are not errors: they return `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A capacity of zero was requested
    #[error("capacity must be at least 1, got {requested}")]
    InvalidCapacity {
        /// The rejected capacity
        requested: usize,
    },
    /// The load factor threshold is zero or above what the map variant supports
    #[error("load factor threshold must be within 1..={max}%, got {percent}%")]
    InvalidLoadFactor {
        /// The rejected threshold, in percent
        percent: usize,
        /// The largest threshold the map variant accepts, in percent
        max: usize,
    },
    /// No prime capacity at least as large as requested fits in a `usize`
    #[error("no prime capacity of at least {requested} fits in a usize")]
    CapacityOverflow {
        /// The capacity that could not be rounded up
        requested: usize,
    },
    /// An explicit resize would push the load factor over its threshold
    #[error("capacity {requested} cannot hold {len} entries under the load factor threshold")]
    CapacityTooSmall {
        /// The requested capacity, after rounding up to a prime
        requested: usize,
        /// Number of entries currently stored
        len: usize,
    },
    /// Allocating a larger backing array failed; the map was left unchanged
    #[error("failed to allocate the backing array: {0}")]
    Allocation(#[from] TryReserveError),
}
