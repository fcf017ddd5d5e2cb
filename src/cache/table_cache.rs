//! Table cache for open table-reader handles.
//!
//! The version subsystem never parses table blocks; it opens readers through
//! [`TableOpener`] and caches the resulting handles so repeated opens of the
//! same file number are free.

use std::sync::Arc;

use crate::iterator::InternalIterator;
use crate::Result;

use super::lru::LruCache;

/// Reader over one immutable table file. Implemented by the external
/// block-level SST layer.
pub trait TableReader: Send + Sync {
    /// A fresh iterator over the table's entries.
    fn new_iterator(&self) -> Box<dyn InternalIterator + '_>;

    /// Approximate on-disk size of the table.
    fn approximate_size(&self) -> u64;
}

/// Opens table readers. Implemented by the external SST layer.
pub trait TableOpener: Send + Sync {
    /// Open a reader for the table with the given file number, stored in the
    /// directory identified by `path_id`.
    fn open(&self, file_number: u64, path_id: u32) -> Result<Arc<dyn TableReader>>;
}

/// A cached, shareable table-reader handle.
pub struct TableHandle {
    file_number: u64,
    reader: Arc<dyn TableReader>,
}

impl TableHandle {
    /// The file number this handle reads.
    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    /// The table reader behind this handle.
    pub fn reader(&self) -> &Arc<dyn TableReader> {
        &self.reader
    }
}

impl std::fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHandle")
            .field("file_number", &self.file_number)
            .finish()
    }
}

/// Cache of open table-reader handles keyed by file number.
pub struct TableCache {
    cache: LruCache<u64, Arc<TableHandle>>,
    opener: Arc<dyn TableOpener>,
}

impl TableCache {
    /// Create a table cache over the given opener.
    pub fn new(opener: Arc<dyn TableOpener>, capacity: usize) -> Self {
        Self {
            cache: LruCache::new(capacity),
            opener,
        }
    }

    /// Get or open the handle for a table file.
    pub fn find_table(&self, file_number: u64, path_id: u32) -> Result<Arc<TableHandle>> {
        if let Some(handle) = self.cache.get(&file_number) {
            return Ok(handle);
        }

        let reader = self.opener.open(file_number, path_id)?;
        let handle = Arc::new(TableHandle {
            file_number,
            reader,
        });
        self.cache.insert(file_number, Arc::clone(&handle));
        Ok(handle)
    }

    /// Drop the cached handle for a deleted table file.
    pub fn evict(&self, file_number: u64) {
        self.cache.remove(&file_number);
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockOpener;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_find_table_caches() {
        let opener = Arc::new(MockOpener::new());
        let opener_dyn: Arc<dyn TableOpener> = opener.clone();
        let cache = TableCache::new(opener_dyn, 10);

        let h1 = cache.find_table(1, 0).unwrap();
        let h2 = cache.find_table(1, 0).unwrap();

        assert_eq!(h1.file_number(), 1);
        assert!(Arc::ptr_eq(&h1, &h2));
        assert_eq!(opener.opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_find_table_error_not_cached() {
        let opener = Arc::new(MockOpener::new());
        opener.fail_for(7);
        let opener_dyn: Arc<dyn TableOpener> = opener.clone();
        let cache = TableCache::new(opener_dyn, 10);

        assert!(cache.find_table(7, 0).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evict() {
        let opener = Arc::new(MockOpener::new());
        let opener_dyn: Arc<dyn TableOpener> = opener.clone();
        let cache = TableCache::new(opener_dyn, 10);

        cache.find_table(1, 0).unwrap();
        assert_eq!(cache.len(), 1);
        cache.evict(1);
        assert!(cache.is_empty());

        // Next lookup reopens.
        cache.find_table(1, 0).unwrap();
        assert_eq!(opener.opens.load(Ordering::SeqCst), 2);
    }
}
