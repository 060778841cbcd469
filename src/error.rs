use snafu::Snafu;

/// Failures reported by [`ChainedHashTable`](crate::ChainedHashTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The requested key has no entry in the table.
    #[snafu(display("key not found in table"))]
    KeyNotFound,

    /// A table was requested with a bucket count that cannot hold a chain.
    #[snafu(display("invalid table capacity {capacity}: at least one bucket is required"))]
    InvalidCapacity {
        /// The rejected bucket count.
        capacity: usize,
    },
}
