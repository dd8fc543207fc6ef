use std::{
    borrow::Borrow,
    hash::{BuildHasher, Hash},
    iter, mem, slice,
};

use log::{debug, trace};

use crate::{
    MapError,
    config::{MapConfig, exceeds_load},
    hash::{DeterministicState, bucket_index, prime_capacity},
    utils::allocate_with,
};

/// Highest growth threshold accepted for open addressing, in percent.
///
/// Above one half, quadratic probing over a prime capacity may miss every free slot.
const MAX_LOAD_FACTOR_PERCENT: usize = 50;

/// A slot of the backing array
#[derive(Debug, Clone)]
enum Slot<K, V> {
    /// Never used since the last rehash; terminates probe sequences
    Empty,
    /// Holds a live key-value pair
    Occupied {
        /// The key in the key-value pair
        key: K,
        /// The value associated with the key
        value: V,
    },
    /// Tombstone left by a removal; probing continues past it
    Deleted,
}

impl<K, V> Slot<K, V> {
    /// Takes the pair out of an occupied slot
    fn into_entry(self) -> Option<(K, V)> {
        match self {
            Self::Occupied { key, value } => Some((key, value)),
            Self::Empty | Self::Deleted => None,
        }
    }
}

/// A free slot found while probing for a new key
#[derive(Debug, Clone, Copy)]
enum Vacancy {
    /// A tombstone that can be reused without raising the load
    Tombstone(usize),
    /// A never-used slot; claiming it raises the load
    Empty(usize),
}

/// Slot indices `home + i²` for `i = 0, 1, 2, ...`, one full cycle of `capacity` probes.
///
/// The squares are built incrementally by adding the odd numbers `1, 3, 5, ...`.
#[derive(Debug, Clone)]
struct QuadraticProbe {
    /// Next index to yield
    index: usize,
    /// Distance to the index after that, `2i + 1` reduced modulo capacity
    step: usize,
    /// Length of the backing array
    capacity: usize,
    /// Probes left in the cycle
    remaining: usize,
}

impl QuadraticProbe {
    /// Starts a probe sequence at `home`
    fn new(home: usize, capacity: usize) -> Self {
        Self { index: home, step: 1, capacity, remaining: capacity }
    }
}

impl Iterator for QuadraticProbe {
    type Item = usize;

    #[allow(clippy::arithmetic_side_effects)]
    fn next(&mut self) -> Option<usize> {
        self.remaining = self.remaining.checked_sub(1)?;
        let current = self.index;
        // both terms are below `capacity`, so the sums cannot overflow
        self.index = (self.index + self.step) % self.capacity;
        self.step = (self.step + 2) % self.capacity;
        Some(current)
    }
}

/// A hash map resolving collisions by open addressing with quadratic probing.
///
/// Capacities are always odd primes and the load (live entries plus tombstones)
/// never exceeds half of the capacity, which guarantees that the first
/// `(capacity + 1) / 2` probes of any key visit distinct slots and that one of
/// them is free. Removal leaves a tombstone; tombstones are purged whenever the
/// table is rebuilt.
///
/// ```rust
/// use bucketry::OpenAddressingMap;
///
/// let mut map = OpenAddressingMap::new();
/// map.insert("apple", 1).unwrap();
/// assert_eq!(map.insert("apple", 10).unwrap(), Some(1));
/// assert_eq!(map.get("apple"), Some(&10));
/// assert_eq!(map.remove("apple"), Some(10));
/// assert!(map.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct OpenAddressingMap<K, V, S = DeterministicState> {
    /// The backing array; its length is the capacity
    slots: Vec<Slot<K, V>>,
    /// Number of live entries
    size: usize,
    /// Number of `Deleted` slots
    tombstones: usize,
    /// Growth threshold, in percent of the capacity
    load_factor_percent: usize,
    /// Hasher used to find the home slot of a key
    hash_builder: S,
}

impl<K, V> Default for OpenAddressingMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OpenAddressingMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty map with the default capacity (11) and a 50% growth threshold
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DeterministicState::default())
    }

    /// Creates an empty map with at least `capacity` slots, rounded up to a prime.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidCapacity`] if `capacity` is zero, [`MapError::CapacityOverflow`]
    /// if no prime that large fits in a `usize` and [`MapError::Allocation`] if the
    /// backing array cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, MapError> {
        Self::from_config(MapConfig::open_addressing().with_initial_capacity(capacity))
    }

    /// Creates an empty map from `config`.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidCapacity`] for a zero capacity, [`MapError::CapacityOverflow`]
    /// for one too large to round up to a prime, [`MapError::InvalidLoadFactor`]
    /// for a threshold outside `1..=50` percent and [`MapError::Allocation`] if the
    /// backing array cannot be allocated.
    pub fn from_config(config: MapConfig) -> Result<Self, MapError> {
        Self::from_config_and_hasher(config, DeterministicState::default())
    }
}

impl<K, V, S> OpenAddressingMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Creates an empty map with the default parameters that hashes keys with `hash_builder`
    pub fn with_hasher(hash_builder: S) -> Self {
        let config = MapConfig::open_addressing();
        // the default capacity is already prime
        let capacity = config.initial_capacity();
        Self {
            slots: iter::repeat_with(|| Slot::Empty).take(capacity).collect(),
            size: 0,
            tombstones: 0,
            load_factor_percent: config.load_factor_percent(),
            hash_builder,
        }
    }

    /// Creates an empty map from `config` that hashes keys with `hash_builder`.
    ///
    /// # Errors
    ///
    /// Same as [`OpenAddressingMap::from_config`].
    pub fn from_config_and_hasher(config: MapConfig, hash_builder: S) -> Result<Self, MapError> {
        let config = config.validate(MAX_LOAD_FACTOR_PERCENT)?;
        let capacity = prime_capacity(config.initial_capacity())?;
        Ok(Self {
            slots: allocate_with(capacity, || Slot::Empty)?,
            size: 0,
            tombstones: 0,
            load_factor_percent: config.load_factor_percent(),
            hash_builder,
        })
    }

    /// Probe sequence of a key under the current capacity
    fn probe<Q: Hash + ?Sized>(&self, key: &Q) -> QuadraticProbe {
        let capacity = self.slots.len();
        QuadraticProbe::new(bucket_index(&self.hash_builder, key, capacity), capacity)
    }

    /// Finds the slot holding `key`, with the number of slots inspected to reach it
    fn find<Q>(&self, key: &Q) -> Option<(usize, usize)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        for (probes, index) in self.probe(key).enumerate() {
            match self.slots.get(index)? {
                Slot::Empty => return None,
                Slot::Occupied { key: stored, .. } if stored.borrow() == key => {
                    return Some((index, probes.saturating_add(1)));
                }
                Slot::Occupied { .. } | Slot::Deleted => {}
            }
        }
        None
    }

    /// Finds where a key known to be absent would be stored: the first tombstone on
    /// its probe sequence, or else the empty slot that ends it
    fn vacant_slot(&self, key: &K) -> Option<Vacancy> {
        let mut first_tombstone = None;
        for index in self.probe(key) {
            match self.slots.get(index)? {
                Slot::Empty => {
                    return Some(first_tombstone.map_or(Vacancy::Empty(index), Vacancy::Tombstone));
                }
                Slot::Deleted if first_tombstone.is_none() => first_tombstone = Some(index),
                Slot::Deleted | Slot::Occupied { .. } => {}
            }
        }
        first_tombstone.map(Vacancy::Tombstone)
    }

    /// Stores a new entry in a vacant slot
    fn occupy(&mut self, index: usize, key: K, value: V) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Slot::Occupied { key, value };
            self.size = self.size.saturating_add(1);
        }
    }

    /// Slots that are not free to probe past: live entries plus tombstones
    fn used(&self) -> usize {
        self.size.saturating_add(self.tombstones)
    }

    /// Insert a key-value pair into the map, returning the previous value of the key.
    ///
    /// A new key first reuses a tombstone on its probe sequence. If it would claim an
    /// empty slot past the load factor threshold, the table is rebuilt before the write:
    /// in place when tombstones account for most of the load, larger otherwise.
    ///
    /// # Errors
    ///
    /// [`MapError::Allocation`] or [`MapError::CapacityOverflow`] if growing the table
    /// failed. The map is unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, MapError> {
        if let Some(current) = self.get_mut(&key) {
            return Ok(Some(mem::replace(current, value)));
        }

        loop {
            match self.vacant_slot(&key) {
                Some(Vacancy::Tombstone(index)) => {
                    self.tombstones = self.tombstones.saturating_sub(1);
                    self.occupy(index, key, value);
                    return Ok(None);
                }
                Some(Vacancy::Empty(index))
                    if !exceeds_load(
                        self.used().saturating_add(1),
                        self.capacity(),
                        self.load_factor_percent,
                    ) =>
                {
                    self.occupy(index, key, value);
                    return Ok(None);
                }
                Some(Vacancy::Empty(_)) | None => self.grow()?,
            }
        }
    }

    /// Retrieve a value for a given key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (index, _) = self.find(key)?;
        match self.slots.get(index)? {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty | Slot::Deleted => None,
        }
    }

    /// Get a mutable reference to a value for a given key
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (index, _) = self.find(key)?;
        match self.slots.get_mut(index)? {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty | Slot::Deleted => None,
        }
    }

    /// Returns true if the map holds `key`
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Removes a key, leaving a tombstone in its slot, and returns its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (index, _) = self.find(key)?;
        let slot = self.slots.get_mut(index)?;
        match mem::replace(slot, Slot::Deleted) {
            Slot::Occupied { value, .. } => {
                self.size = self.size.saturating_sub(1);
                self.tombstones = self.tombstones.saturating_add(1);
                Some(value)
            }
            vacant => {
                *slot = vacant;
                None
            }
        }
    }

    /// Number of slots inspected to reach `key`, starting at its home slot
    pub fn probe_length<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(|(_, probes)| probes)
    }

    /// Rebuilds the table with at least `new_capacity` slots, rounded up to a prime.
    ///
    /// Every live entry is re-inserted and tombstones are dropped.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidCapacity`] for zero, [`MapError::CapacityOverflow`] when no
    /// prime that large fits in a `usize`, [`MapError::CapacityTooSmall`] when the
    /// current entries would exceed the load factor threshold, and
    /// [`MapError::Allocation`] when the new array cannot be allocated. On error the
    /// map is unchanged.
    pub fn resize(&mut self, new_capacity: usize) -> Result<(), MapError> {
        if new_capacity == 0 {
            return Err(MapError::InvalidCapacity { requested: new_capacity });
        }
        let capacity = prime_capacity(new_capacity)?;
        if exceeds_load(self.size, capacity, self.load_factor_percent) {
            return Err(MapError::CapacityTooSmall { requested: capacity, len: self.size });
        }
        debug!("resizing open addressing map from {} to {} slots", self.capacity(), capacity);
        self.rehash(capacity)
    }

    /// Makes room for one more entry.
    ///
    /// While the live entries fill at most half of the threshold, the table is rebuilt
    /// at its current capacity to purge tombstones. Otherwise the capacity doubles,
    /// rounded up to a prime, until one more entry fits.
    fn grow(&mut self) -> Result<(), MapError> {
        let wanted = self.size.saturating_add(1);
        if !exceeds_load(wanted.saturating_mul(2), self.capacity(), self.load_factor_percent) {
            debug!(
                "open addressing map at {}/{} slots used, purging {} tombstones",
                self.used(),
                self.capacity(),
                self.tombstones
            );
            return self.rehash(self.capacity());
        }

        let mut capacity = prime_capacity(self.capacity().saturating_mul(2))?;
        while exceeds_load(wanted, capacity, self.load_factor_percent) {
            capacity = prime_capacity(capacity.saturating_mul(2))?;
        }
        debug!(
            "open addressing map at {}/{} slots used, growing to {}",
            self.used(),
            self.capacity(),
            capacity
        );
        self.rehash(capacity)
    }

    /// Moves every live entry into a fresh array of `capacity` slots
    fn rehash(&mut self, capacity: usize) -> Result<(), MapError> {
        let slots = allocate_with(capacity, || Slot::Empty)?;
        let old_slots = mem::replace(&mut self.slots, slots);
        trace!(
            "rehashing {} entries, dropping {} tombstones, into {} slots",
            self.size,
            self.tombstones,
            capacity
        );

        self.size = 0;
        self.tombstones = 0;
        for (key, value) in old_slots.into_iter().filter_map(Slot::into_entry) {
            if let Some(Vacancy::Empty(index) | Vacancy::Tombstone(index)) = self.vacant_slot(&key)
            {
                self.occupy(index, key, value);
            }
        }
        Ok(())
    }
}

impl<K, V, S> OpenAddressingMap<K, V, S> {
    /// Returns the number of live entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the map holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the number of slots in the backing array
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of tombstones
    #[must_use]
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Returns the slots available to a new key: empty slots plus tombstones
    #[must_use]
    pub fn empty_slots(&self) -> usize {
        self.slots.iter().filter(|slot| !matches!(slot, Slot::Occupied { .. })).count()
    }

    /// Returns the share of slots holding an entry or a tombstone
    #[must_use]
    #[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
    pub fn load_factor(&self) -> f64 {
        self.size.saturating_add(self.tombstones) as f64 / self.slots.len() as f64
    }

    /// Removes every entry and tombstone, keeping the capacity
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.size = 0;
        self.tombstones = 0;
    }

    /// Returns an iterator over the live key-value pairs, in slot order
    #[must_use]
    #[allow(clippy::iter_without_into_iter)]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { slots: self.slots.iter() }
    }
}

/// Iterator over the live entries of an [`OpenAddressingMap`]
#[derive(Debug, Clone)]
pub struct Iter<'a, K, V> {
    /// Remaining slots
    slots: slice::Iter<'a, Slot<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.find_map(|slot| match slot {
            Slot::Occupied { key, value } => Some((key, value)),
            Slot::Empty | Slot::Deleted => None,
        })
    }
}
