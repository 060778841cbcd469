#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Errors reported by table construction and lookup.
pub mod error;

/// A hash table using separate chaining.
///
/// This module provides [`ChainedHashTable`], its iterators and the
/// bucket-grouped [`Contents`](hash_table::Contents) view used for
/// diagnostics.
pub mod hash_table;

pub mod hashing;

pub use error::Error;
pub use hash_table::ChainedHashTable;
pub use hash_table::Removal;
pub use hashing::BucketHasher;
pub use hashing::Hashed;
pub use hashing::Summation;
