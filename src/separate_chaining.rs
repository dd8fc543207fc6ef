use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    iter, mem, slice, vec,
};

use log::{debug, trace};

use crate::{
    MapError,
    config::{MapConfig, exceeds_load},
    hash::{DeterministicState, bucket_index, prime_capacity},
    utils::allocate_with,
};

/// Highest growth threshold accepted for chaining, in percent
const MAX_LOAD_FACTOR_PERCENT: usize = 400;

/// Head of a chain, or the tail of an entry
type Link<K, V> = Option<Box<Entry<K, V>>>;

/// A key-value pair linked into a bucket's chain
#[derive(Debug)]
struct Entry<K, V> {
    /// The key in the key-value pair
    key: K,
    /// The value associated with the key
    value: V,
    /// The rest of the chain; owned by this entry
    next: Link<K, V>,
}

/// Entries of a chain, front to back
fn chain<K, V>(head: &Link<K, V>) -> impl Iterator<Item = &Entry<K, V>> {
    iter::successors(head.as_deref(), |entry| entry.next.as_deref())
}

/// Releases a chain one entry at a time instead of recursively
fn drop_chain<K, V>(mut link: Link<K, V>) {
    while let Some(mut entry) = link {
        link = entry.next.take();
    }
}

/// A hash map resolving collisions by separate chaining.
///
/// Every bucket heads a singly-linked chain of entries; each entry owns the rest of
/// its chain. New keys are prepended. When a new key would push `len / capacity`
/// over the load factor threshold, every entry is moved into a bucket array about
/// twice as large (rounded up to a prime) before the key is linked in.
///
/// ```rust
/// use bucketry::ChainedHashMap;
///
/// let mut map = ChainedHashMap::new();
/// for word in ["apple", "grape", "apple"] {
///     let count = map.get(word).copied().unwrap_or(0);
///     map.insert(word, count + 1).unwrap();
/// }
/// assert_eq!(map.get("apple"), Some(&2));
/// assert_eq!(map.len(), 2);
/// ```
pub struct ChainedHashMap<K, V, S = DeterministicState> {
    /// Bucket heads; the length is the capacity
    buckets: Vec<Link<K, V>>,
    /// Number of entries across all chains
    size: usize,
    /// Growth threshold, in percent of the capacity
    load_factor_percent: usize,
    /// Hasher used to pick a key's bucket
    hash_builder: S,
}

impl<K, V> Default for ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty map with the default capacity (11) and a 75% growth threshold
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DeterministicState::default())
    }

    /// Creates an empty map with at least `capacity` buckets, rounded up to a prime.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidCapacity`] if `capacity` is zero, [`MapError::CapacityOverflow`]
    /// if no prime that large fits in a `usize` and [`MapError::Allocation`] if the
    /// bucket array cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, MapError> {
        Self::from_config(MapConfig::separate_chaining().with_initial_capacity(capacity))
    }

    /// Creates an empty map from `config`.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidCapacity`] for a zero capacity, [`MapError::CapacityOverflow`]
    /// for one too large to round up to a prime, [`MapError::InvalidLoadFactor`]
    /// for a threshold outside `1..=400` percent and [`MapError::Allocation`] if the
    /// bucket array cannot be allocated.
    pub fn from_config(config: MapConfig) -> Result<Self, MapError> {
        Self::from_config_and_hasher(config, DeterministicState::default())
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Creates an empty map with the default parameters that hashes keys with `hash_builder`
    pub fn with_hasher(hash_builder: S) -> Self {
        let config = MapConfig::separate_chaining();
        // the default capacity is already prime
        let capacity = config.initial_capacity();
        Self {
            buckets: iter::repeat_with(|| None).take(capacity).collect(),
            size: 0,
            load_factor_percent: config.load_factor_percent(),
            hash_builder,
        }
    }

    /// Creates an empty map from `config` that hashes keys with `hash_builder`.
    ///
    /// # Errors
    ///
    /// Same as [`ChainedHashMap::from_config`].
    pub fn from_config_and_hasher(config: MapConfig, hash_builder: S) -> Result<Self, MapError> {
        let config = config.validate(MAX_LOAD_FACTOR_PERCENT)?;
        let capacity = prime_capacity(config.initial_capacity())?;
        Ok(Self {
            buckets: allocate_with(capacity, || None)?,
            size: 0,
            load_factor_percent: config.load_factor_percent(),
            hash_builder,
        })
    }

    /// Bucket of a key under the current capacity
    fn index_of<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        bucket_index(&self.hash_builder, key, self.buckets.len())
    }

    /// Insert a key-value pair into the map, returning the previous value of the key.
    ///
    /// # Errors
    ///
    /// [`MapError::Allocation`] if a new key required growing the bucket array and
    /// the allocation failed. The map is unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, MapError> {
        if let Some(current) = self.get_mut(&key) {
            return Ok(Some(mem::replace(current, value)));
        }

        if exceeds_load(self.size.saturating_add(1), self.capacity(), self.load_factor_percent) {
            self.grow()?;
        }

        let index = self.index_of(&key);
        if let Some(head) = self.buckets.get_mut(index) {
            let next = head.take();
            *head = Some(Box::new(Entry { key, value, next }));
            self.size = self.size.saturating_add(1);
        }
        Ok(None)
    }

    /// Retrieve a value for a given key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let head = self.buckets.get(self.index_of(key))?;
        chain(head).find(|entry| entry.key.borrow() == key).map(|entry| &entry.value)
    }

    /// Get a mutable reference to a value for a given key
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.index_of(key);
        let mut cursor = self.buckets.get_mut(index)?.as_deref_mut();
        while let Some(entry) = cursor {
            if entry.key.borrow() == key {
                return Some(&mut entry.value);
            }
            cursor = entry.next.as_deref_mut();
        }
        None
    }

    /// Returns true if the map holds `key`
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Unlinks the entry for `key` and returns its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.index_of(key);
        let mut link = self.buckets.get_mut(index)?;
        while link.as_ref().is_some_and(|entry| entry.key.borrow() != key) {
            link = &mut link.as_mut()?.next;
        }

        let mut removed = link.take()?;
        *link = removed.next.take();
        self.size = self.size.saturating_sub(1);
        let Entry { value, .. } = *removed;
        Some(value)
    }

    /// Rebuilds the bucket array with at least `new_capacity` buckets, rounded up to a prime.
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
        debug!("resizing chained map from {} to {} buckets", self.capacity(), capacity);
        self.rehash(capacity)
    }

    /// Doubles the bucket count, rounded up to a prime, so one more entry fits
    fn grow(&mut self) -> Result<(), MapError> {
        let mut capacity = prime_capacity(self.capacity().saturating_mul(2))?;
        while exceeds_load(self.size.saturating_add(1), capacity, self.load_factor_percent) {
            capacity = prime_capacity(capacity.saturating_mul(2))?;
        }
        debug!(
            "chained map holds {} entries in {} buckets, growing to {}",
            self.size,
            self.capacity(),
            capacity
        );
        self.rehash(capacity)
    }

    /// Moves every entry into a freshly allocated array of `capacity` buckets
    fn rehash(&mut self, capacity: usize) -> Result<(), MapError> {
        let mut buckets: Vec<Link<K, V>> = allocate_with(capacity, || None)?;
        trace!("rehashing {} entries into {} buckets", self.size, capacity);

        for head in &mut self.buckets {
            let mut link = head.take();
            while let Some(mut entry) = link {
                link = entry.next.take();
                let index = bucket_index(&self.hash_builder, &entry.key, capacity);
                if let Some(new_head) = buckets.get_mut(index) {
                    entry.next = new_head.take();
                    *new_head = Some(entry);
                }
            }
        }
        self.buckets = buckets;
        Ok(())
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    /// Returns the number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the map holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the number of buckets
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of buckets with an empty chain
    #[must_use]
    pub fn empty_buckets(&self) -> usize {
        self.buckets.iter().filter(|head| head.is_none()).count()
    }

    /// Returns the length of every chain, in bucket order
    pub fn chain_lengths(&self) -> impl Iterator<Item = usize> {
        self.buckets.iter().map(|head| chain(head).count())
    }

    /// Returns the average number of entries per bucket
    #[must_use]
    #[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
    pub fn load_factor(&self) -> f64 {
        self.size as f64 / self.buckets.len() as f64
    }

    /// Removes every entry, keeping the bucket count
    pub fn clear(&mut self) {
        for head in &mut self.buckets {
            drop_chain(head.take());
        }
        self.size = 0;
    }

    /// Returns an iterator over the key-value pairs: bucket by bucket, each chain front
    /// to back
    #[must_use]
    #[allow(clippy::iter_without_into_iter)]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { buckets: self.buckets.iter(), current: None }
    }
}

impl<K, V, S> Drop for ChainedHashMap<K, V, S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V, S> fmt::Debug for ChainedHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> IntoIterator for ChainedHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(mut self) -> Self::IntoIter {
        IntoIter { buckets: mem::take(&mut self.buckets).into_iter(), current: None }
    }
}

/// Iterator over the entries of a [`ChainedHashMap`]
#[derive(Debug, Clone)]
pub struct Iter<'a, K, V> {
    /// Buckets not yet visited
    buckets: slice::Iter<'a, Link<K, V>>,
    /// Next entry of the chain being walked
    current: Option<&'a Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current {
                self.current = entry.next.as_deref();
                return Some((&entry.key, &entry.value));
            }
            self.current = self.buckets.next()?.as_deref();
        }
    }
}

/// Owning iterator over the entries of a [`ChainedHashMap`]
#[derive(Debug)]
pub struct IntoIter<K, V> {
    /// Buckets not yet visited
    buckets: vec::IntoIter<Link<K, V>>,
    /// Remainder of the chain being walked
    current: Link<K, V>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.take() {
                let Entry { key, value, next } = *entry;
                self.current = next;
                return Some((key, value));
            }
            self.current = self.buckets.next()?;
        }
    }
}

impl<K, V> Drop for IntoIter<K, V> {
    fn drop(&mut self) {
        drop_chain(self.current.take());
        for head in self.buckets.by_ref() {
            drop_chain(head);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::hash::ByteSumState;

    /// A map whose anagram keys share a bucket
    fn colliding_map() -> Result<ChainedHashMap<&'static str, i32, ByteSumState>, MapError> {
        ChainedHashMap::from_config_and_hasher(
            MapConfig::separate_chaining().with_initial_capacity(53),
            ByteSumState::default(),
        )
    }

    #[test]
    fn test_insert_and_get() -> Result<(), MapError> {
        let mut map = ChainedHashMap::new();
        assert_eq!(map.insert("key1".to_string(), 1)?, None);
        assert_eq!(map.insert("key2".to_string(), 2)?, None);
        assert_eq!(map.insert("key3".to_string(), 3)?, None);

        assert_eq!(map.get("key1"), Some(&1));
        assert_eq!(map.get("key2"), Some(&2));
        assert_eq!(map.get("key3"), Some(&3));
        assert_eq!(map.get("key4"), None);
        Ok(())
    }

    #[test]
    fn test_update_keeps_size() -> Result<(), MapError> {
        let mut map = ChainedHashMap::with_capacity(101)?;
        map.insert("key1", 10)?;
        map.insert("key2", 20)?;
        assert_eq!(map.insert("key1", 30)?, Some(10));
        assert_eq!(map.len(), 2);
        assert!(map.empty_buckets() >= 99);
        assert_eq!(map.get("key1"), Some(&30));
        Ok(())
    }

    #[test]
    fn test_remove_from_any_chain_position() -> Result<(), MapError> {
        let mut map = colliding_map()?;
        for (i, key) in ["abc", "acb", "bac", "bca", "cab"].into_iter().enumerate() {
            map.insert(key, i32::try_from(i).unwrap_or_default())?;
        }
        assert_eq!(map.chain_lengths().max(), Some(5));

        // chains are prepended, so "cab" is the head and "abc" the tail
        assert_eq!(map.remove("bac"), Some(2));
        assert_eq!(map.remove("cab"), Some(4));
        assert_eq!(map.remove("abc"), Some(0));
        assert_eq!(map.remove("abc"), None);

        assert_eq!(map.len(), 2);
        assert_eq!(map.chain_lengths().max(), Some(2));
        assert_eq!(map.get("acb"), Some(&1));
        assert_eq!(map.get("bca"), Some(&3));

        assert_eq!(map.insert("abc", 7)?, None);
        assert_eq!(map.get("abc"), Some(&7));
        Ok(())
    }

    #[test]
    fn test_grows_to_next_prime() -> Result<(), MapError> {
        let mut map = ChainedHashMap::with_capacity(11)?;
        for i in 0..8 {
            map.insert(i, i)?;
        }
        assert_eq!(map.capacity(), 11);

        // the 9th entry would pass 75% of 11 buckets
        map.insert(8, 8)?;
        assert_eq!(map.capacity(), 23);
        assert_eq!(map.len(), 9);
        for i in 0..9 {
            assert_eq!(map.get(&i), Some(&i));
        }
        assert_eq!(map.chain_lengths().sum::<usize>(), 9);
        Ok(())
    }

    #[test]
    fn test_explicit_resize() -> Result<(), MapError> {
        let mut map = ChainedHashMap::with_capacity(23)?;
        map.insert("key1".to_string(), 10)?;
        map.resize(30)?;
        assert_eq!(map.capacity(), 31);
        assert_eq!(map.get("key1"), Some(&10));

        for i in 0..16 {
            map.insert(format!("key{i}"), i)?;
        }
        assert_eq!(map.len(), 16);
        assert_eq!(map.resize(1), Err(MapError::CapacityTooSmall { requested: 3, len: 16 }));
        assert_eq!(map.resize(0), Err(MapError::InvalidCapacity { requested: 0 }));

        map.resize(200)?;
        assert_eq!(map.capacity(), 211);
        assert_eq!(map.len(), 16);
        for i in 0..16 {
            assert_eq!(map.get(format!("key{i}").as_str()), Some(&i));
        }
        Ok(())
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_capacity_is_an_error() -> Result<(), MapError> {
        let map = ChainedHashMap::<u8, u8>::with_capacity(usize::MAX);
        assert_eq!(map.err(), Some(MapError::CapacityOverflow { requested: usize::MAX }));

        let mut map = ChainedHashMap::new();
        map.insert("key1".to_string(), 10)?;
        assert!(matches!(map.resize(1 << 60), Err(MapError::Allocation(_))));
        assert_eq!(
            map.resize(usize::MAX),
            Err(MapError::CapacityOverflow { requested: usize::MAX })
        );

        assert_eq!(map.capacity(), 11);
        assert_eq!(map.get("key1"), Some(&10));
        map.insert("key2".to_string(), 20)?;
        assert_eq!(map.len(), 2);
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let map = ChainedHashMap::<u8, u8>::with_capacity(0);
        assert_eq!(map.err(), Some(MapError::InvalidCapacity { requested: 0 }));

        let config = MapConfig::separate_chaining().with_load_factor_percent(500);
        let map = ChainedHashMap::<u8, u8>::from_config(config);
        assert_eq!(map.err(), Some(MapError::InvalidLoadFactor { percent: 500, max: 400 }));
    }

    #[test]
    fn test_high_load_factor_keeps_chains() -> Result<(), MapError> {
        let config = MapConfig::separate_chaining().with_load_factor_percent(400);
        let mut map = ChainedHashMap::from_config(config)?;
        for i in 0..44 {
            map.insert(i, i * 2)?;
        }
        assert_eq!(map.capacity(), 11);
        assert!((map.load_factor() - 4.0).abs() < 0.01);
        assert_eq!(map.chain_lengths().sum::<usize>(), 44);
        Ok(())
    }

    #[test]
    fn test_clear() -> Result<(), MapError> {
        let mut map = ChainedHashMap::new();
        map.insert("key1", 1)?;
        map.insert("key2", 2)?;
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 11);
        assert_eq!(map.empty_buckets(), 11);
        assert_eq!(map.get("key1"), None);
        Ok(())
    }

    #[test]
    fn test_iter_and_into_iter() -> Result<(), MapError> {
        let mut map = ChainedHashMap::new();
        for i in 1..=5 {
            map.insert(i.to_string(), i * 10)?;
        }
        map.remove("1");

        let sum: i32 = map.iter().map(|(_, v)| v).sum();
        assert_eq!(sum, 140);

        let mut owned: Vec<(String, i32)> = map.into_iter().collect();
        owned.sort();
        assert_eq!(owned.first(), Some(&("2".to_string(), 20)));
        assert_eq!(owned.len(), 4);
        Ok(())
    }

    #[test]
    fn test_partially_consumed_into_iter() -> Result<(), MapError> {
        let mut map = colliding_map()?;
        for key in ["abc", "acb", "bac", "bca", "cab", "xyz"] {
            map.insert(key, 0)?;
        }
        let mut entries = map.into_iter();
        assert!(entries.next().is_some());
        drop(entries);
        Ok(())
    }

    #[test]
    fn test_debug_prints_entries() -> Result<(), MapError> {
        let mut map = ChainedHashMap::new();
        map.insert("key1", 1)?;
        assert_eq!(format!("{map:?}"), r#"{"key1": 1}"#);
        Ok(())
    }

    #[test_log::test]
    fn test_many_keys() -> Result<(), MapError> {
        let mut map = ChainedHashMap::with_capacity(53)?;
        for i in 0..150 {
            map.insert(format!("str{i}"), i * 100)?;
        }
        for i in 0..150 {
            assert_eq!(map.get(format!("str{i}").as_str()), Some(&(i * 100)));
        }
        assert_eq!(map.len(), 150);
        assert!(map.load_factor() <= 0.75);
        assert_eq!(map.chain_lengths().sum::<usize>(), map.len());
        Ok(())
    }

    /// Applies a script of inserts (`true`) and removals (`false`) to a map and a model
    fn run_script<S: BuildHasher>(
        mut map: ChainedHashMap<u16, i32, S>,
        ops: &[(bool, u16, i32)],
    ) -> Result<(), TestCaseError> {
        let mut model = HashMap::new();
        for &(is_insert, key, value) in ops {
            if is_insert {
                let previous = map.insert(key, value).map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(previous, model.insert(key, value));
                prop_assert!(map.load_factor() <= 0.75);
            } else {
                prop_assert_eq!(map.remove(&key), model.remove(&key));
            }
            prop_assert_eq!(map.len(), model.len());
            prop_assert_eq!(map.chain_lengths().sum::<usize>(), map.len());
        }
        for (key, value) in &model {
            prop_assert_eq!(map.get(key), Some(value));
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_matches_std_map(ops in prop::collection::vec((any::<bool>(), 0u16..200, any::<i32>()), 0..400)) {
            run_script(ChainedHashMap::new(), &ops)?;
        }

        #[test]
        fn prop_matches_std_map_with_collisions(ops in prop::collection::vec((any::<bool>(), 0u16..200, any::<i32>()), 0..400)) {
            run_script(ChainedHashMap::with_hasher(ByteSumState::default()), &ops)?;
        }

        #[test]
        fn prop_resize_preserves_entries(keys in prop::collection::hash_set(any::<u32>(), 0..100), extra in 0usize..500) {
            let mut map = ChainedHashMap::new();
            for &key in &keys {
                map.insert(key, u64::from(key) * 2).map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
            map.resize(keys.len() * 2 + extra + 1).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(map.len(), keys.len());
            prop_assert_eq!(map.chain_lengths().sum::<usize>(), keys.len());
            for &key in &keys {
                prop_assert_eq!(map.get(&key), Some(&(u64::from(key) * 2)));
            }
        }
    }
}
