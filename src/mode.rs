//! Statistical mode of a sequence, counted in a [`ChainedHashMap`]

use std::hash::{BuildHasher, Hash};

use log::trace;

use crate::{ChainedHashMap, MapError, hash::DeterministicState};

/// The most frequent values of a sequence and how often they occur.
///
/// An empty sequence has no mode: frequency 0 and no values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode<T> {
    /// Occurrences of each modal value
    frequency: usize,
    /// Every value occurring `frequency` times, in the map's iteration order
    values: Vec<T>,
}

impl<T> Mode<T> {
    /// Occurrences of each modal value
    #[must_use]
    pub fn frequency(&self) -> usize {
        self.frequency
    }

    /// The modal values
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Consumes the result, returning the modal values
    #[must_use]
    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    /// True for the result of an empty sequence
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Puts the modal values in ascending order
    #[must_use]
    pub fn sorted(mut self) -> Self
    where
        T: Ord,
    {
        self.values.sort_unstable();
        self
    }
}

/// Finds the mode(s) of `values`.
///
/// ```rust
/// use bucketry::find_mode;
///
/// let mode = find_mode([1, 2, 2, 3, 3]).unwrap().sorted();
/// assert_eq!(mode.frequency(), 2);
/// assert_eq!(mode.values(), &[2, 3]);
/// ```
///
/// # Errors
///
/// [`MapError::Allocation`] if the counting map cannot grow.
pub fn find_mode<T, I>(values: I) -> Result<Mode<T>, MapError>
where
    T: Hash + Eq,
    I: IntoIterator<Item = T>,
{
    find_mode_with_hasher(values, DeterministicState::default())
}

/// Finds the mode(s) of `values`, counting them in a map that hashes with `hash_builder`.
///
/// # Errors
///
/// [`MapError::Allocation`] if the counting map cannot grow.
pub fn find_mode_with_hasher<T, I, S>(values: I, hash_builder: S) -> Result<Mode<T>, MapError>
where
    T: Hash + Eq,
    I: IntoIterator<Item = T>,
    S: BuildHasher,
{
    let mut counts = ChainedHashMap::with_hasher(hash_builder);
    for value in values {
        let count = counts.get(&value).copied().unwrap_or(0_usize);
        counts.insert(value, count.saturating_add(1))?;
    }
    trace!("counted {} distinct values in {} buckets", counts.len(), counts.capacity());

    let mut mode = Mode { frequency: 0, values: Vec::new() };
    for (value, count) in counts {
        if count > mode.frequency {
            mode.frequency = count;
            mode.values.clear();
        }
        if count == mode.frequency {
            mode.values.push(value);
        }
    }
    Ok(mode)
}
