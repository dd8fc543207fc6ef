//! Construction parameters shared by both map variants

use crate::MapError;

/// Initial number of slots or buckets when none is requested
pub const DEFAULT_CAPACITY: usize = 11;

/// Default growth threshold of [`OpenAddressingMap`](crate::OpenAddressingMap), in percent
pub const OPEN_ADDRESSING_LOAD_FACTOR: usize = 50;

/// Default growth threshold of [`ChainedHashMap`](crate::ChainedHashMap), in percent
pub const SEPARATE_CHAINING_LOAD_FACTOR: usize = 75;

/// Capacity and load factor threshold for a new map.
///
/// The threshold is stored as a percentage (0-100 and beyond for chaining), so
/// growth checks stay in integer arithmetic.
///
/// ```rust
/// use bucketry::{ChainedHashMap, MapConfig};
///
/// let config = MapConfig::separate_chaining()
///     .with_initial_capacity(53)
///     .with_load_factor_percent(100);
/// let map: ChainedHashMap<String, u32> = ChainedHashMap::from_config(config).unwrap();
/// assert_eq!(map.capacity(), 53);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapConfig {
    /// Requested capacity, rounded up to a prime when the map is built
    initial_capacity: usize,
    /// Growth threshold in percent
    load_factor_percent: usize,
}

impl MapConfig {
    /// Defaults for open addressing: capacity 11, growth above 50% load
    #[must_use]
    pub const fn open_addressing() -> Self {
        Self { initial_capacity: DEFAULT_CAPACITY, load_factor_percent: OPEN_ADDRESSING_LOAD_FACTOR }
    }

    /// Defaults for separate chaining: capacity 11, growth above 75% load
    #[must_use]
    pub const fn separate_chaining() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            load_factor_percent: SEPARATE_CHAINING_LOAD_FACTOR,
        }
    }

    /// Sets the requested initial capacity
    #[must_use]
    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the growth threshold, in percent
    #[must_use]
    pub const fn with_load_factor_percent(mut self, percent: usize) -> Self {
        self.load_factor_percent = percent;
        self
    }

    /// Requested initial capacity
    #[must_use]
    pub const fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Growth threshold, in percent
    #[must_use]
    pub const fn load_factor_percent(&self) -> usize {
        self.load_factor_percent
    }

    /// Checks the parameters against the limits of a map variant
    pub(crate) fn validate(self, max_percent: usize) -> Result<Self, MapError> {
        if self.initial_capacity == 0 {
            return Err(MapError::InvalidCapacity { requested: 0 });
        }
        if self.load_factor_percent == 0 || self.load_factor_percent > max_percent {
            return Err(MapError::InvalidLoadFactor {
                percent: self.load_factor_percent,
                max: max_percent,
            });
        }
        Ok(self)
    }
}

/// True when `entries` would put a table of `capacity` slots over `percent` load
pub(crate) fn exceeds_load(entries: usize, capacity: usize, percent: usize) -> bool {
    entries.saturating_mul(100) > capacity.saturating_mul(percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(MapConfig::open_addressing().load_factor_percent(), 50);
        assert_eq!(MapConfig::separate_chaining().load_factor_percent(), 75);
        assert_eq!(MapConfig::open_addressing().initial_capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_validate() {
        let config = MapConfig::open_addressing();
        assert_eq!(config.validate(50), Ok(config));
        assert_eq!(
            config.with_initial_capacity(0).validate(50),
            Err(MapError::InvalidCapacity { requested: 0 })
        );
        assert_eq!(
            config.with_load_factor_percent(0).validate(50),
            Err(MapError::InvalidLoadFactor { percent: 0, max: 50 })
        );
        assert_eq!(
            config.with_load_factor_percent(51).validate(50),
            Err(MapError::InvalidLoadFactor { percent: 51, max: 50 })
        );
    }

    #[test]
    fn test_exceeds_load() {
        assert!(!exceeds_load(5, 11, 50));
        assert!(exceeds_load(6, 11, 50));
        assert!(!exceeds_load(8, 11, 75));
        assert!(exceeds_load(9, 11, 75));
    }
}
