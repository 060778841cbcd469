use alloc::boxed::Box;
#[cfg(any(test, feature = "stats"))]
use alloc::vec::Vec;
use core::fmt::Debug;
use core::fmt::Display;
use core::iter::FusedIterator;

use log::debug;
use log::trace;
use snafu::OptionExt;
use snafu::ensure;

use crate::error::Error;
use crate::error::InvalidCapacitySnafu;
use crate::error::KeyNotFoundSnafu;
use crate::hashing::BucketHasher;
use crate::hashing::Summation;

/// Bucket count used by [`ChainedHashTable::new`] and [`Default`].
pub const DEFAULT_CAPACITY: usize = 100;

/// Load factor above which an insertion grows the table.
pub const MAX_LOAD_FACTOR: f64 = 0.7;

#[inline(always)]
fn grown_capacity(capacity: usize) -> usize {
    capacity * 2 + 1
}

type Link<K, V> = Option<Box<Entry<K, V>>>;

/// One key-value pair and the owned remainder of its chain.
struct Entry<K, V> {
    key: K,
    value: V,
    next: Link<K, V>,
}

impl<K, V> Entry<K, V> {
    fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            next: None,
        }
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Box<[Link<K, V>]> {
    core::iter::repeat_with(|| None).take(capacity).collect()
}

fn entries<K, V>(link: &Link<K, V>) -> impl Iterator<Item = &Entry<K, V>> {
    core::iter::successors(link.as_deref(), |entry| entry.next.as_deref())
}

/// Appends `entry` at the tail of the chain starting at `cursor`.
///
/// The caller guarantees the key is not already present in the chain.
fn append<K, V>(mut cursor: &mut Link<K, V>, entry: Box<Entry<K, V>>) {
    while let Some(existing) = cursor {
        cursor = &mut existing.next;
    }
    *cursor = Some(entry);
}

/// Drops a chain one entry at a time so long chains never recurse through
/// nested `Box` drops.
fn release_chain<K, V>(mut link: Link<K, V>) {
    while let Some(mut entry) = link {
        link = entry.next.take();
    }
}

/// The outcome of [`ChainedHashTable::remove`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal<V> {
    /// The key was present; its value has been unlinked from the table.
    Removed(V),
    /// The key was absent and the table is unchanged.
    NotFound,
}

impl<V> Removal<V> {
    /// Returns `true` if an entry was removed.
    pub fn is_removed(&self) -> bool {
        matches!(self, Removal::Removed(_))
    }

    /// Returns `true` if the key was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Removal::NotFound)
    }

    /// Converts the outcome into the removed value, if any.
    pub fn into_value(self) -> Option<V> {
        match self {
            Removal::Removed(value) => Some(value),
            Removal::NotFound => None,
        }
    }
}

/// Chain-length statistics for a table.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of entries in the table
    pub populated: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Number of buckets holding at least one entry
    pub occupied_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Bucket utilization (occupied_buckets / capacity)
    pub bucket_utilization: f64,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Chained Hash Table Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Bucket Usage: {}/{} ({:.2}% utilization)",
            self.occupied_buckets,
            self.capacity,
            self.bucket_utilization * 100.0
        );
        println!("Longest Chain: {} entries", self.longest_chain);
    }
}

/// A hash table using separate chaining.
///
/// `ChainedHashTable<K, V, H>` keeps a fixed-length array of buckets, each
/// owning a singly linked chain of entries. A [`BucketHasher`] `H` maps every
/// key to its bucket; the default is the positional [`Summation`] scheme.
///
/// Inserting a new key recomputes the load factor (`len / capacity`). Once it
/// exceeds [`MAX_LOAD_FACTOR`], the table grows to `2 * capacity + 1` buckets
/// and every entry is moved to its bucket under the new capacity. Removal
/// never shrinks the table.
///
/// ## Example
///
/// ```rust
/// use chain_hash::ChainedHashTable;
/// use chain_hash::Error;
/// use chain_hash::Removal;
///
/// let mut ages = ChainedHashTable::with_capacity(5)?;
/// ages.insert("Anna", 19);
/// ages.insert("Lilit", 18);
/// ages.insert("Lilit", 23);
///
/// assert_eq!(ages.get(&"Lilit"), Ok(&23));
/// assert_eq!(ages.len(), 2);
///
/// assert_eq!(ages.remove(&"Anna"), Removal::Removed(19));
/// assert_eq!(ages.get(&"Anna"), Err(Error::KeyNotFound));
/// # Ok::<(), Error>(())
/// ```
pub struct ChainedHashTable<K, V, H = Summation> {
    buckets: Box<[Link<K, V>]>,
    populated: usize,
    load_factor: f64,
    hasher: H,
}

impl<K, V, H> Debug for ChainedHashTable<K, V, H>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, H> Clone for ChainedHashTable<K, V, H>
where
    K: Clone + Eq,
    V: Clone,
    H: BucketHasher<K> + Clone,
{
    /// Builds a table with the same capacity and re-inserts every pair of
    /// `self`, walking buckets in order.
    fn clone(&self) -> Self {
        let mut table = Self::from_parts(empty_buckets(self.capacity()), self.hasher.clone());
        table.insert_cloned_from(self);
        debug_assert_eq!(table.populated, self.populated);
        table
    }

    /// Releases every entry of `self`, adopts the capacity of `source` and
    /// re-inserts its pairs. The slot array is only reallocated when the
    /// capacities differ.
    fn clone_from(&mut self, source: &Self) {
        self.clear();
        if self.capacity() != source.capacity() {
            self.buckets = empty_buckets(source.capacity());
        }
        self.hasher.clone_from(&source.hasher);
        self.insert_cloned_from(source);
    }
}

impl<K, V, H> Drop for ChainedHashTable<K, V, H> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> ChainedHashTable<K, V, Summation> {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] buckets and the
    /// [`Summation`] hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::ChainedHashTable;
    /// #
    /// let table: ChainedHashTable<String, u32> = ChainedHashTable::new();
    /// assert_eq!(table.capacity(), 100);
    /// assert!(table.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(Summation)
    }

    /// Creates an empty table with `capacity` buckets and the [`Summation`]
    /// hasher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::ChainedHashTable;
    /// # use chain_hash::Error;
    /// #
    /// let table: ChainedHashTable<String, u32> = ChainedHashTable::with_capacity(5)?;
    /// assert_eq!(table.capacity(), 5);
    ///
    /// let invalid = ChainedHashTable::<String, u32>::with_capacity(0);
    /// assert_eq!(invalid.err(), Some(Error::InvalidCapacity { capacity: 0 }));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::with_capacity_and_hasher(capacity, Summation)
    }
}

impl<K, V, H> ChainedHashTable<K, V, H> {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] buckets and the given
    /// hasher.
    pub fn with_hasher(hasher: H) -> Self {
        Self::from_parts(empty_buckets(DEFAULT_CAPACITY), hasher)
    }

    /// Creates an empty table with `capacity` buckets and the given hasher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Result<Self, Error> {
        ensure!(capacity > 0, InvalidCapacitySnafu { capacity });
        Ok(Self::from_parts(empty_buckets(capacity), hasher))
    }

    fn from_parts(buckets: Box<[Link<K, V>]>, hasher: H) -> Self {
        debug_assert!(!buckets.is_empty());
        Self {
            buckets,
            populated: 0,
            load_factor: 0.0,
            hasher,
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `len / capacity` as of the last structural change.
    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Returns a reference to the table's bucket hasher.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    fn update_load_factor(&mut self) {
        self.load_factor = self.populated as f64 / self.buckets.len() as f64;
    }

    /// Removes every entry, keeping the bucket array and its capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::ChainedHashTable;
    /// #
    /// let mut table = ChainedHashTable::new();
    /// table.insert("key", 1);
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 100);
    /// assert_eq!(table.load_factor(), 0.0);
    /// ```
    pub fn clear(&mut self) {
        for slot in self.buckets.iter_mut() {
            release_chain(slot.take());
        }
        self.populated = 0;
        self.load_factor = 0.0;
    }

    /// Returns an iterator over all pairs, in bucket order and then chain
    /// order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: Chain { next: None },
            remaining: self.populated,
        }
    }

    /// Returns a view of the table grouped by bucket, for diagnostics.
    ///
    /// The view yields one `(bucket_index, chain)` group per non-empty
    /// bucket. When keys and values implement [`Display`], so does the view:
    /// one line of `[key:value] ` items per non-empty bucket, followed by an
    /// empty line. The layout is not a stable format.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::ChainedHashTable;
    /// #
    /// let mut table = ChainedHashTable::with_capacity(1)?;
    /// table.insert("Nare", 43);
    ///
    /// assert_eq!(table.format_contents().to_string(), "[Nare:43] \n\n");
    /// assert_eq!(table.format_contents().groups().count(), 1);
    /// # Ok::<(), chain_hash::Error>(())
    /// ```
    pub fn format_contents(&self) -> Contents<'_, K, V> {
        Contents {
            buckets: &self.buckets,
        }
    }

    /// Returns the number of buckets for each chain length.
    ///
    /// Index `n` of the result counts the buckets whose chain holds exactly
    /// `n` entries; index 0 counts empty buckets.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; 1];
        for slot in self.buckets.iter() {
            let length = entries(slot).count();
            if length >= hist.len() {
                hist.resize(length + 1, 0);
            }
            hist[length] += 1;
        }
        hist
    }

    /// Returns chain-length statistics for the table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.chain_histogram();
        let capacity = self.capacity();
        let occupied_buckets = capacity - hist[0];

        DebugStats {
            populated: self.populated,
            capacity,
            occupied_buckets,
            longest_chain: hist.len() - 1,
            load_factor: self.load_factor,
            bucket_utilization: occupied_buckets as f64 / capacity as f64,
        }
    }
}

impl<K, V, H> ChainedHashTable<K, V, H>
where
    K: Eq,
    H: BucketHasher<K>,
{
    #[inline]
    fn bucket_index(&self, key: &K) -> usize {
        let index = self.hasher.bucket_index(key, self.buckets.len());
        debug_assert!(index < self.buckets.len());
        index
    }

    fn find(&self, key: &K) -> Option<&Entry<K, V>> {
        entries(&self.buckets[self.bucket_index(key)]).find(|entry| entry.key == *key)
    }

    /// Inserts a key-value pair, overwriting the value of an equal key.
    ///
    /// Returns the previous value if the key was present; the entry count is
    /// then unchanged. Inserting a new key appends it to the tail of its
    /// chain and may grow the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::ChainedHashTable;
    /// #
    /// let mut table = ChainedHashTable::with_capacity(1)?;
    /// assert_eq!(table.insert("Lilit", 18), None);
    /// assert_eq!(table.insert("Lilit", 23), Some(18));
    /// assert_eq!(table.get(&"Lilit"), Ok(&23));
    ///
    /// // One entry in one bucket crosses the load factor threshold.
    /// assert_eq!(table.capacity(), 3);
    /// # Ok::<(), chain_hash::Error>(())
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let index = self.bucket_index(&key);

        let mut cursor = &mut self.buckets[index];
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(core::mem::replace(&mut entry.value, value));
            }
            cursor = &mut entry.next;
        }
        *cursor = Some(Box::new(Entry::new(key, value)));

        self.populated += 1;
        self.update_load_factor();
        if self.load_factor > MAX_LOAD_FACTOR {
            self.grow();
        }

        None
    }

    fn grow(&mut self) {
        let old_capacity = self.buckets.len();
        let capacity = grown_capacity(old_capacity);
        let mut buckets = empty_buckets(capacity);

        for slot in self.buckets.iter_mut() {
            let mut link = slot.take();
            while let Some(mut entry) = link {
                link = entry.next.take();
                let index = self.hasher.bucket_index(&entry.key, capacity);
                debug_assert!(index < capacity);
                append(&mut buckets[index], entry);
            }
        }

        self.buckets = buckets;
        self.update_load_factor();

        debug!(
            "grew chained hash table from {} to {} buckets ({} entries, load factor {:.3})",
            old_capacity, capacity, self.populated, self.load_factor
        );
    }

    fn insert_cloned_from(&mut self, source: &Self)
    where
        K: Clone,
        V: Clone,
    {
        for (key, value) in source.iter() {
            self.insert(key.clone(), value.clone());
        }
    }

    /// Returns a reference to the value stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::ChainedHashTable;
    /// # use chain_hash::Error;
    /// #
    /// let mut table = ChainedHashTable::new();
    /// table.insert("Hayk", 20);
    /// assert_eq!(table.get(&"Hayk"), Ok(&20));
    /// assert_eq!(table.get(&"Karine"), Err(Error::KeyNotFound));
    /// ```
    pub fn get(&self, key: &K) -> Result<&V, Error> {
        self.find(key)
            .map(|entry| &entry.value)
            .context(KeyNotFoundSnafu)
    }

    /// Returns a mutable reference to the value stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is absent.
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V, Error> {
        let index = self.bucket_index(key);

        let mut cursor = self.buckets[index].as_deref_mut();
        while let Some(entry) = cursor {
            if entry.key == *key {
                return Ok(&mut entry.value);
            }
            cursor = entry.next.as_deref_mut();
        }

        KeyNotFoundSnafu.fail()
    }

    /// Returns `true` if the table holds an entry for `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Removes the entry for `key`, reporting whether it was present.
    ///
    /// Removing an absent key leaves the table untouched. The table never
    /// shrinks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::ChainedHashTable;
    /// # use chain_hash::Removal;
    /// #
    /// let mut table = ChainedHashTable::new();
    /// table.insert("Anna", 19);
    ///
    /// assert_eq!(table.remove(&"Vazgen"), Removal::NotFound);
    /// assert_eq!(table.remove(&"Anna"), Removal::Removed(19));
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(&mut self, key: &K) -> Removal<V> {
        match self.remove_entry(key) {
            Some((_, value)) => Removal::Removed(value),
            None => Removal::NotFound,
        }
    }

    /// Removes the entry for `key` and returns the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let index = self.bucket_index(key);

        let Some(position) = entries(&self.buckets[index]).position(|entry| entry.key == *key)
        else {
            trace!("remove missed in bucket {index}");
            return None;
        };

        let mut cursor = &mut self.buckets[index];
        for _ in 0..position {
            cursor = &mut cursor.as_mut()?.next;
        }
        let mut removed = cursor.take()?;
        *cursor = removed.next.take();

        self.populated -= 1;
        self.update_load_factor();

        let Entry { key, value, .. } = *removed;
        Some((key, value))
    }

    /// Returns the number of entries chained in the bucket `key` maps to.
    ///
    /// This measures collision depth at that bucket: the count includes
    /// entries for other keys and is non-zero even when `key` itself is
    /// absent, as long as its bucket is occupied.
    pub fn chain_length_at(&self, key: &K) -> usize {
        entries(&self.buckets[self.bucket_index(key)]).count()
    }
}

impl<K, V, H> Default for ChainedHashTable<K, V, H>
where
    H: Default,
{
    fn default() -> Self {
        Self::with_hasher(H::default())
    }
}

impl<K, V, H> Extend<(K, V)> for ChainedHashTable<K, V, H>
where
    K: Eq,
    H: BucketHasher<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, H> FromIterator<(K, V)> for ChainedHashTable<K, V, H>
where
    K: Eq,
    H: BucketHasher<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::default();
        table.extend(iter);
        table
    }
}

impl<'a, K, V, H> IntoIterator for &'a ChainedHashTable<K, V, H> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the pairs of a single chain, head first.
pub struct Chain<'a, K, V> {
    next: Option<&'a Entry<K, V>>,
}

impl<'a, K, V> Chain<'a, K, V> {
    fn new(link: &'a Link<K, V>) -> Self {
        Self {
            next: link.as_deref(),
        }
    }
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.next?;
        self.next = entry.next.as_deref();
        Some((&entry.key, &entry.value))
    }
}

impl<K, V> FusedIterator for Chain<'_, K, V> {}

/// An iterator over the pairs of a [`ChainedHashTable`].
///
/// This struct is created by the [`iter`] method on [`ChainedHashTable`].
///
/// [`iter`]: ChainedHashTable::iter
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, Link<K, V>>,
    chain: Chain<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.chain.next() {
                self.remaining -= 1;
                return Some(pair);
            }
            self.chain = Chain::new(self.buckets.next()?);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A bucket-grouped view of a [`ChainedHashTable`].
///
/// This struct is created by the [`format_contents`] method on
/// [`ChainedHashTable`].
///
/// [`format_contents`]: ChainedHashTable::format_contents
pub struct Contents<'a, K, V> {
    buckets: &'a [Link<K, V>],
}

impl<'a, K, V> Contents<'a, K, V> {
    /// Returns the `(bucket_index, chain)` groups of every non-empty bucket.
    pub fn groups(&self) -> Groups<'a, K, V> {
        Groups {
            buckets: self.buckets.iter().enumerate(),
        }
    }
}

impl<'a, K, V> IntoIterator for Contents<'a, K, V> {
    type Item = (usize, Chain<'a, K, V>);
    type IntoIter = Groups<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups()
    }
}

impl<K, V> Display for Contents<'_, K, V>
where
    K: Display,
    V: Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (_, chain) in self.groups() {
            for (key, value) in chain {
                write!(f, "[{key}:{value}] ")?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }
}

/// The non-empty buckets of a [`Contents`] view.
pub struct Groups<'a, K, V> {
    buckets: core::iter::Enumerate<core::slice::Iter<'a, Link<K, V>>>,
}

impl<'a, K, V> Iterator for Groups<'a, K, V> {
    type Item = (usize, Chain<'a, K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        self.buckets
            .by_ref()
            .find(|(_, slot)| slot.is_some())
            .map(|(index, slot)| (index, Chain::new(slot)))
    }
}

impl<K, V> FusedIterator for Groups<'_, K, V> {}
