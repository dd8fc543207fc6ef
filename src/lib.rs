//! # Bucketry
//!
//! Hash maps built from first principles on top of a plain `Vec`, with two
//! collision-resolution strategies:
//!
//! - `OpenAddressingMap`: every entry lives in one array; collisions are resolved by
//!   quadratic probing, deletions leave tombstones
//! - `ChainedHashMap`: every bucket heads a singly-linked chain of entries
//!
//! Both keep their capacity at an odd prime and grow by doubling (rounded up to the
//! next prime) before a new key would push the load factor over its threshold: 50%
//! for open addressing, 75% for chaining.
//!
//! `find_mode` uses a `ChainedHashMap` to count a sequence and report its most frequent
//! values.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bucketry::{ChainedHashMap, MapError, OpenAddressingMap};
//!
//! fn main() -> Result<(), MapError> {
//!     let mut map = OpenAddressingMap::new();
//!
//!     // Insert values
//!     map.insert("apple".to_string(), 1)?;
//!     map.insert("banana".to_string(), 2)?;
//!
//!     // Retrieve values
//!     assert_eq!(map.get("apple"), Some(&1));
//!
//!     // Update values
//!     map.insert("apple".to_string(), 10)?;
//!     assert_eq!(map.get("apple"), Some(&10));
//!
//!     // Remove values
//!     map.remove("apple");
//!     assert_eq!(map.get("apple"), None);
//!
//!     // The chaining map has the same core operations
//!     let mut chained = ChainedHashMap::with_capacity(53)?;
//!     chained.insert(7, "seven")?;
//!     assert_eq!(chained.remove(&7), Some("seven"));
//!     Ok(())
//! }
//! ```
//!
//! ## Finding the Mode
//!
//! ```rust
//! use bucketry::find_mode;
//!
//! let mode = find_mode(["Arch", "Mint", "Mint", "Ubuntu", "Ubuntu"]).unwrap().sorted();
//! assert_eq!(mode.frequency(), 2);
//! assert_eq!(mode.values(), &["Mint", "Ubuntu"]);
//! ```

/// Construction parameters and growth thresholds
mod config;
/// Error type of the fallible map operations
mod error;
/// Hashing, bucket indexing and prime capacities
pub mod hash;
/// Mode finder built on the chaining map
mod mode;
/// Hash map with open addressing and quadratic probing
mod open_addressing;
/// Hash map with separate chaining
mod separate_chaining;
/// Utility functions and traits for the hash maps
mod utils;

pub use config::{
    DEFAULT_CAPACITY, MapConfig, OPEN_ADDRESSING_LOAD_FACTOR, SEPARATE_CHAINING_LOAD_FACTOR,
};
pub use error::MapError;
pub use mode::{Mode, find_mode, find_mode_with_hasher};
pub use open_addressing::{Iter as OpenAddressingIter, OpenAddressingMap};
pub use separate_chaining::{ChainedHashMap, IntoIter as ChainedIntoIter, Iter as ChainedIter};
pub use utils::{HashMapExtensions, chained_from_pairs, open_addressing_from_pairs};
