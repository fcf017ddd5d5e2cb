//! Iteration over sorted table contents.
//!
//! The version subsystem does not read blocks itself; it composes iterators
//! supplied by the external table reader. [`InternalIterator`] is the seam,
//! and [`FileSliceIterator`] is the decorator that confines a table iterator
//! to one file slice.

mod slice_iter;

pub use slice_iter::FileSliceIterator;

use crate::types::InternalKey;
use crate::Result;

/// Iterator over internally-keyed entries of a table.
///
/// Mirrors the cursor style of the storage layer: position first, then read
/// `key`/`value` only while `valid()` holds.
pub trait InternalIterator {
    /// Whether the iterator is positioned on an entry.
    fn valid(&self) -> bool;

    /// Position on the first entry.
    fn seek_to_first(&mut self);

    /// Position on the last entry.
    fn seek_to_last(&mut self);

    /// Position on the first entry at or after `target`.
    fn seek(&mut self, target: &InternalKey);

    /// Advance to the next entry.
    fn next(&mut self);

    /// Step back to the previous entry.
    fn prev(&mut self);

    /// Current key. Only valid while `valid()` is true.
    fn key(&self) -> &InternalKey;

    /// Current value. Only valid while `valid()` is true.
    fn value(&self) -> &[u8];

    /// Status of the underlying read.
    fn status(&self) -> Result<()>;
}
