//! Bucket selection strategies for [`ChainedHashTable`](crate::ChainedHashTable).
//!
//! A [`BucketHasher`] maps a key straight to a bucket index for a given bucket
//! count. The table never caches the result: after a resize every index is
//! recomputed against the new capacity.

use core::hash::BuildHasher;
use core::hash::Hash;
use core::hash::Hasher;

/// Maps keys to bucket indices.
///
/// Implementations must be deterministic for equal keys and must return a
/// value in `0..capacity`. `capacity` is always non-zero.
pub trait BucketHasher<K: ?Sized> {
    /// Returns the bucket index of `key` in a table of `capacity` buckets.
    fn bucket_index(&self, key: &K, capacity: usize) -> usize;
}

/// The positional summation scheme.
///
/// Every byte the key's [`Hash`] impl writes contributes
/// `(position + capacity) * byte` to a running sum, which is then reduced
/// modulo the capacity. For string keys each UTF-8 byte is one unit, followed
/// by the terminator byte that `str`'s `Hash` impl appends.
///
/// The scheme is cheap and stable but clusters badly for keys that share
/// characters; use [`Hashed`] when distribution matters.
///
/// # Examples
///
/// ```rust
/// use chain_hash::hashing::BucketHasher;
/// use chain_hash::hashing::Summation;
///
/// let index = Summation.bucket_index("Anna", 5);
/// assert!(index < 5);
/// assert_eq!(index, Summation.bucket_index("Anna", 5));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summation;

impl<K> BucketHasher<K> for Summation
where
    K: Hash + ?Sized,
{
    #[inline]
    fn bucket_index(&self, key: &K, capacity: usize) -> usize {
        let mut hasher = SummationHasher::new(capacity);
        key.hash(&mut hasher);
        (hasher.finish() % capacity as u64) as usize
    }
}

/// The [`Hasher`] behind [`Summation`].
///
/// The capacity is part of the hasher state, so a `SummationHasher` is only
/// meaningful for the table size it was built for.
#[derive(Debug, Clone)]
pub struct SummationHasher {
    capacity: u64,
    position: u64,
    sum: u64,
}

impl SummationHasher {
    /// Creates a hasher seeded with a table capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity as u64,
            position: 0,
            sum: 0,
        }
    }
}

impl Hasher for SummationHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let weight = self.position.wrapping_add(self.capacity);
            self.sum = self.sum.wrapping_add(weight.wrapping_mul(u64::from(byte)));
            self.position += 1;
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.sum
    }
}

/// Adapts any [`BuildHasher`] into a [`BucketHasher`] by reducing the full
/// 64-bit hash modulo the capacity.
///
/// # Examples
///
/// ```rust
/// use std::collections::hash_map::RandomState;
///
/// use chain_hash::ChainedHashTable;
/// use chain_hash::hashing::Hashed;
///
/// let mut table = ChainedHashTable::with_capacity_and_hasher(8, Hashed(RandomState::new()))?;
/// table.insert("key", 1);
/// assert_eq!(table.get(&"key"), Ok(&1));
/// # Ok::<(), chain_hash::Error>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Hashed<S>(pub S);

impl<K, S> BucketHasher<K> for Hashed<S>
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    #[inline]
    fn bucket_index(&self, key: &K, capacity: usize) -> usize {
        (self.0.hash_one(key) % capacity as u64) as usize
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hash builder used by [`DefaultHashed`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;

        /// [`Hashed`] over the crate's default hash builder.
        pub type DefaultHashed = Hashed<DefaultHashBuilder>;
    } else if #[cfg(feature = "std")] {
        /// The hash builder used by [`DefaultHashed`].
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;

        /// [`Hashed`] over the crate's default hash builder.
        pub type DefaultHashed = Hashed<DefaultHashBuilder>;
    }
}

#[cfg(test)]
mod tests {
    use siphasher::sip::SipHasher;

    use super::*;

    /// Writes its bytes verbatim, so the expected sums are easy to derive.
    struct Units(&'static [u8]);

    impl Hash for Units {
        fn hash<H: Hasher>(&self, state: &mut H) {
            state.write(self.0);
        }
    }

    #[derive(Clone, Default)]
    struct SipBuilder;

    impl BuildHasher for SipBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(7, 11)
        }
    }

    #[test]
    fn summation_weights_units_by_position_and_capacity() {
        // (0 + 5) * 'A' + (1 + 5) * 'B' = 5 * 65 + 6 * 66 = 721
        let mut hasher = SummationHasher::new(5);
        Units(b"AB").hash(&mut hasher);
        assert_eq!(hasher.finish(), 721);
        assert_eq!(Summation.bucket_index(&Units(b"AB"), 5), 721 % 5);
        assert_eq!(
            Summation.bucket_index(&Units(b"AB"), 11),
            (11 * 65 + 12 * 66) % 11
        );
    }

    #[test]
    fn summation_of_empty_key_is_bucket_zero() {
        assert_eq!(Summation.bucket_index(&Units(b""), 7), 0);
    }

    #[test]
    fn summation_is_deterministic_and_in_range() {
        for capacity in [1usize, 2, 5, 11, 23, 100, 1021] {
            for key in ["Anna", "Lilit", "Hayk", "Vazgen", "", "a much longer key"] {
                let first = Summation.bucket_index(key, capacity);
                assert!(first < capacity);
                assert_eq!(first, Summation.bucket_index(key, capacity));
            }
        }
    }

    #[test]
    fn summation_handles_wide_keys() {
        for key in [0u64, 1, u64::MAX, 0xDEAD_BEEF] {
            assert!(Summation.bucket_index(&key, 13) < 13);
        }
    }

    #[test]
    fn hashed_adapter_reduces_into_range() {
        let hasher = Hashed(SipBuilder);
        for key in 0..1000u32 {
            let index = hasher.bucket_index(&key, 17);
            assert!(index < 17);
            assert_eq!(index, hasher.bucket_index(&key, 17));
        }
    }

    #[cfg(any(feature = "foldhash", feature = "std"))]
    #[test]
    fn default_hashed_reduces_into_range() {
        let hasher = DefaultHashed::default();
        for key in ["a", "b", "c"] {
            assert!(hasher.bucket_index(key, 3) < 3);
        }
    }
}
