pub mod merge;

pub use merge::MergeIterator;

use crate::error::Result;

/// Cursor over one sorted source of key-value pairs.
///
/// Memory runs, disk runs and the merged view all implement this, so a
/// merge can take `Vec<Box<dyn RunIterator<K, V>>>` without caring where
/// the data lives. Keys are strictly increasing along a single source.
pub trait RunIterator<K, V> {
    /// Returns the current key. Only valid when is_valid() is true.
    fn key(&self) -> K;

    /// Returns the current value. Only valid when is_valid() is true.
    fn value(&self) -> V;

    /// Returns true if the iterator is positioned at a valid entry.
    fn is_valid(&self) -> bool;

    /// Advances to the next entry. Disk-backed sources may fail here.
    fn next(&mut self) -> Result<()>;
}
