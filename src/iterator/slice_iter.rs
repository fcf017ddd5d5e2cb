//! Iterator confined to one file slice.

use std::cmp::Ordering;

use crate::metrics::CompactionIoMetrics;
use crate::types::InternalKey;
use crate::util::comparator::InternalKeyComparator;
use crate::version::FileSlice;
use crate::Result;

use super::InternalIterator;

/// Decorator that restricts a table iterator to a slice's key range.
///
/// Positions the wrapped iterator at the slice's smallest key (respecting
/// `is_contain_smallest`) and reports invalid once past the slice's largest
/// key. Forward traversal feeds the compaction input-byte sink and asserts
/// strictly increasing keys.
pub struct FileSliceIterator<I> {
    icmp: InternalKeyComparator,
    inner: I,
    smallest: InternalKey,
    largest: InternalKey,
    is_contain_smallest: bool,
    io_metrics: CompactionIoMetrics,
}

impl<I: InternalIterator> FileSliceIterator<I> {
    /// Create an iterator over `slice`'s range of `inner`.
    pub fn new(
        slice: &FileSlice,
        inner: I,
        icmp: InternalKeyComparator,
        io_metrics: CompactionIoMetrics,
    ) -> Self {
        let mut iter = Self {
            icmp,
            inner,
            smallest: slice.smallest().clone(),
            largest: slice.largest().clone(),
            is_contain_smallest: slice.is_contain_smallest(),
            io_metrics,
        };
        iter.seek_to_first();
        iter
    }

    fn in_bounds(&self) -> bool {
        let key = self.inner.key();

        let scmp = self.icmp.compare(key, &self.smallest);
        if scmp == Ordering::Less || (scmp == Ordering::Equal && !self.is_contain_smallest) {
            return false;
        }

        self.icmp.compare(key, &self.largest) != Ordering::Greater
    }
}

impl<I: InternalIterator> InternalIterator for FileSliceIterator<I> {
    fn valid(&self) -> bool {
        self.inner.valid() && self.in_bounds()
    }

    fn seek_to_first(&mut self) {
        self.inner.seek(&self.smallest);
        if !self.is_contain_smallest
            && self.inner.valid()
            && self.icmp.compare(self.inner.key(), &self.smallest) == Ordering::Equal
        {
            self.inner.next();
        }
    }

    fn seek_to_last(&mut self) {
        self.inner.seek(&self.largest);
    }

    fn seek(&mut self, target: &InternalKey) {
        self.inner.seek(target);
    }

    fn next(&mut self) {
        if !self.valid() {
            return;
        }

        let prev_key = self.inner.key().clone();
        self.io_metrics
            .input_bytes
            .add((prev_key.encoded_len() + self.inner.value().len()) as u64);
        self.inner.next();
        if self.valid() {
            // Table iterators hand out internal keys in strictly increasing
            // order; anything else is a corrupt slice.
            assert!(
                self.icmp.compare(self.inner.key(), &prev_key) == Ordering::Greater,
                "file slice iterator regressed"
            );
        }
    }

    fn prev(&mut self) {
        if self.valid() {
            self.inner.prev();
        }
    }

    fn key(&self) -> &InternalKey {
        assert!(self.valid());
        self.inner.key()
    }

    fn value(&self) -> &[u8] {
        assert!(self.valid());
        self.inner.value()
    }

    fn status(&self) -> Result<()> {
        self.inner.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::testing::VecIterator;
    use crate::types::ValueType;
    use crate::version::FileSlice;
    use bytes::Bytes;

    fn make_key(user_key: &[u8], seq: u64) -> InternalKey {
        InternalKey::new(Bytes::copy_from_slice(user_key), seq, ValueType::Value)
    }

    fn table_iter() -> VecIterator {
        VecIterator::new(vec![
            (make_key(b"a", 1), b"va".to_vec()),
            (make_key(b"c", 1), b"vc".to_vec()),
            (make_key(b"e", 1), b"ve".to_vec()),
            (make_key(b"g", 1), b"vg".to_vec()),
        ])
    }

    fn slice(smallest: InternalKey, largest: InternalKey, contain_smallest: bool) -> FileSlice {
        FileSlice::detached(smallest, largest, contain_smallest, 99)
    }

    #[test]
    fn test_slice_bounds() {
        let s = slice(make_key(b"c", 1), make_key(b"e", 1), true);
        let mut iter = FileSliceIterator::new(
            &s,
            table_iter(),
            InternalKeyComparator::default(),
            CompactionIoMetrics::new(),
        );

        assert!(iter.valid());
        assert_eq!(iter.key().user_key(), b"c");
        iter.next();
        assert!(iter.valid());
        assert_eq!(iter.key().user_key(), b"e");
        iter.next();
        // Past the slice largest: invalid even though the table continues.
        assert!(!iter.valid());
    }

    #[test]
    fn test_exclusive_smallest() {
        let s = slice(make_key(b"c", 1), make_key(b"g", 1), false);
        let iter = FileSliceIterator::new(
            &s,
            table_iter(),
            InternalKeyComparator::default(),
            CompactionIoMetrics::new(),
        );

        assert!(iter.valid());
        assert_eq!(iter.key().user_key(), b"e");
    }

    #[test]
    fn test_input_bytes_accumulate() {
        let s = slice(make_key(b"a", 1), make_key(b"g", 1), true);
        let metrics = CompactionIoMetrics::new();
        let mut iter = FileSliceIterator::new(
            &s,
            table_iter(),
            InternalKeyComparator::default(),
            metrics.clone(),
        );

        let mut drained = 0;
        while iter.valid() {
            iter.next();
            drained += 1;
        }

        assert_eq!(drained, 4);
        // Each entry: 1 byte user key + 8 byte tail + 2 byte value.
        assert_eq!(metrics.input_bytes.get(), 4 * (1 + 8 + 2));
    }

    #[test]
    fn test_empty_slice_range() {
        // Range between entries: nothing to yield.
        let s = slice(make_key(b"b", 1), make_key(b"b", 0), true);
        let iter = FileSliceIterator::new(
            &s,
            table_iter(),
            InternalKeyComparator::default(),
            CompactionIoMetrics::new(),
        );
        assert!(!iter.valid());
    }
}
