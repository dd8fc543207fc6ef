//! Hashing, bucket indexing and the prime capacity scheme shared by both maps

use std::{
    collections::hash_map::DefaultHasher,
    hash::{BuildHasher, BuildHasherDefault, Hash, Hasher},
};

use crate::MapError;

/// Unseeded SipHash: the same key hashes to the same value for the whole process.
pub type DeterministicState = BuildHasherDefault<DefaultHasher>;

/// Builds [`ByteSumHasher`]s.
pub type ByteSumState = BuildHasherDefault<ByteSumHasher>;

/// Adds up every byte written to it.
///
/// This is a deliberately weak hash: anagrams collide, and so do integers whose
/// bytes have the same sum. It is handy for exercising collision handling.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteSumHasher {
    /// Running sum of the bytes seen so far
    sum: u64,
}

impl Hasher for ByteSumHasher {
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.sum = self.sum.wrapping_add(u64::from(*byte));
        }
    }

    fn finish(&self) -> u64 {
        self.sum
    }
}

/// Maps a key to a bucket index in `0..capacity`.
///
/// `capacity` must be non-zero; both maps guarantee that for their backing arrays.
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub(crate) fn bucket_index<Q, S>(hash_builder: &S, key: &Q, capacity: usize) -> usize
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    let hash = hash_builder.hash_one(key);
    // the remainder is below `capacity`, so it always fits back into a usize
    (hash % capacity as u64) as usize
}

/// Bases that make Miller-Rabin exact for every 64-bit input
const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// `a * b mod modulus` without overflow
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    // the remainder is below `modulus`, so it fits back into a u64
    ((u128::from(a) * u128::from(b)) % u128::from(modulus)) as u64
}

/// `base ^ exponent mod modulus` by repeated squaring
#[allow(clippy::arithmetic_side_effects)]
fn pow_mod(mut base: u64, mut exponent: u64, modulus: u64) -> u64 {
    let mut result = 1;
    base %= modulus;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = mul_mod(result, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exponent >>= 1;
    }
    result
}

/// Returns true if `n` is prime
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub fn is_prime(n: usize) -> bool {
    let n = n as u64;
    if n < 2 {
        return false;
    }
    for witness in WITNESSES {
        if n % witness == 0 {
            return n == witness;
        }
    }

    // n - 1 = odd * 2^twos
    let mut odd = n - 1;
    let mut twos = 0_u32;
    while odd % 2 == 0 {
        odd /= 2;
        twos += 1;
    }

    'witness: for witness in WITNESSES {
        let mut x = pow_mod(witness, odd, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..twos {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Smallest odd prime that is at least `n`, or `None` if it does not fit in a `usize`.
///
/// Even inputs are bumped to the next odd number first, so `next_prime(2)` is 3.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub fn next_prime(n: usize) -> Option<usize> {
    let mut candidate = if n % 2 == 0 { n.checked_add(1)? } else { n };
    while !is_prime(candidate) {
        candidate = candidate.checked_add(2)?;
    }
    Some(candidate)
}

/// Prime capacity for a request of at least `requested` slots or buckets
pub(crate) fn prime_capacity(requested: usize) -> Result<usize, MapError> {
    next_prime(requested).ok_or(MapError::CapacityOverflow { requested })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_prime() {
        let primes: Vec<usize> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(is_prime(7919));
        assert!(!is_prime(7917));
        assert!(!is_prime(3 * 5 * 7 * 11 * 13 * 17 * 19 * 23));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_is_prime_near_usize_max() {
        // strong pseudoprime to the bases 2, 3, 5 and 7
        assert!(!is_prime(3_215_031_751));
        assert!(is_prime((1 << 61) - 1));
        assert!(is_prime(usize::MAX - 58));
        assert!(!is_prime(usize::MAX));
        assert_eq!(next_prime(1 << 60), Some((1 << 60) + 33));
        assert_eq!(next_prime(usize::MAX - 60), Some(usize::MAX - 58));
        assert_eq!(next_prime(usize::MAX - 57), None);
        assert_eq!(next_prime(usize::MAX), None);
        assert_eq!(
            prime_capacity(usize::MAX),
            Err(MapError::CapacityOverflow { requested: usize::MAX })
        );
    }

    #[test]
    fn test_next_prime() {
        assert_eq!(next_prime(0), Some(3));
        assert_eq!(next_prime(1), Some(3));
        assert_eq!(next_prime(2), Some(3));
        assert_eq!(next_prime(11), Some(11));
        assert_eq!(next_prime(22), Some(23));
        assert_eq!(next_prime(24), Some(29));
        assert_eq!(next_prime(100), Some(101));
    }

    #[test]
    fn test_bucket_index_is_stable_and_in_range() {
        let state = DeterministicState::default();
        for capacity in [3, 11, 101] {
            for key in 0..500_u32 {
                let index = bucket_index(&state, &key, capacity);
                assert!(index < capacity);
                assert_eq!(index, bucket_index(&state, &key, capacity));
            }
        }
        // a fresh builder hashes identically
        assert_eq!(
            bucket_index(&state, "key1", 101),
            bucket_index(&DeterministicState::default(), "key1", 101)
        );
    }

    #[test]
    fn test_byte_sum_collides_on_anagrams() {
        let state = ByteSumState::default();
        assert_eq!(state.hash_one("listen"), state.hash_one("silent"));
        assert_ne!(state.hash_one("listen"), state.hash_one("listens"));
        assert_eq!(state.hash_one(1_u32), 1);
        assert_eq!(state.hash_one(256_u32), 1);
    }
}
