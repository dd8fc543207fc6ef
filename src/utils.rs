//! Utility functions and traits shared by the map implementations

use std::{
    borrow::Borrow,
    hash::{BuildHasher, Hash},
};

use crate::{ChainedHashMap, MapError, OpenAddressingMap};

/// Allocates a backing array of `len` elements built by `fill`.
///
/// The allocation is fallible so a failed resize can leave the old array in place.
pub(crate) fn allocate_with<T>(len: usize, fill: impl FnMut() -> T) -> Result<Vec<T>, MapError> {
    let mut items = Vec::new();
    items.try_reserve_exact(len)?;
    items.resize_with(len, fill);
    Ok(items)
}

/// Extension trait for map implementations that provides additional utility methods
pub trait HashMapExtensions<K, V> {
    /// Returns the keys of the hash map as a Vec
    fn keys(&self) -> Vec<K>;

    /// Returns the values of the hash map as a Vec
    fn values(&self) -> Vec<V>;

    /// Returns every key-value pair as a Vec, in the map's iteration order
    fn pairs(&self) -> Vec<(K, V)>;

    /// Returns true if the hash map contains the given key
    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;
}

impl<K, V, S> HashMapExtensions<K, V> for OpenAddressingMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn keys(&self) -> Vec<K> {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    fn values(&self) -> Vec<V> {
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    fn pairs(&self) -> Vec<(K, V)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.contains_key(key)
    }
}

impl<K, V, S> HashMapExtensions<K, V> for ChainedHashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn keys(&self) -> Vec<K> {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    fn values(&self) -> Vec<V> {
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    fn pairs(&self) -> Vec<(K, V)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.contains_key(key)
    }
}

/// Builds a [`ChainedHashMap`] from key-value pairs; later pairs win on duplicate keys.
///
/// # Errors
///
/// [`MapError::Allocation`] if the map cannot grow.
pub fn chained_from_pairs<K, V, I>(pairs: I) -> Result<ChainedHashMap<K, V>, MapError>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, V)>,
{
    let mut map = ChainedHashMap::new();
    for (key, value) in pairs {
        map.insert(key, value)?;
    }
    Ok(map)
}

/// Builds an [`OpenAddressingMap`] from key-value pairs; later pairs win on duplicate keys.
///
/// # Errors
///
/// [`MapError::Allocation`] if the map cannot grow.
pub fn open_addressing_from_pairs<K, V, I>(pairs: I) -> Result<OpenAddressingMap<K, V>, MapError>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, V)>,
{
    let mut map = OpenAddressingMap::new();
    for (key, value) in pairs {
        map.insert(key, value)?;
    }
    Ok(map)
}
