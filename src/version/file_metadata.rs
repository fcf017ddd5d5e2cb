//! File metadata and file slices.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::cache::TableHandle;
use crate::types::{InternalKey, SequenceNumber};
use crate::util::comparator::InternalKeyComparator;
use crate::Error;

/// Metadata for one immutable SSTable file.
///
/// Shared across snapshots; `refs` counts snapshot membership, `slice_refs`
/// counts live slices carved from this file. The record (and the underlying
/// table file) stays alive while either count is positive.
pub struct FileMetadata {
    /// Unique, monotonically assigned file number.
    file_number: u64,
    /// Which configured storage directory holds the file.
    path_id: u32,
    /// File size in bytes.
    file_size: u64,
    /// Smallest internal key in the file.
    smallest: InternalKey,
    /// Largest internal key in the file.
    largest: InternalKey,
    /// Smallest sequence number in the file.
    smallest_seqno: SequenceNumber,
    /// Largest sequence number in the file.
    largest_seqno: SequenceNumber,
    /// Snapshot-membership reference count.
    refs: AtomicI64,
    /// Count of live slices whose parent is this file.
    slice_refs: AtomicI64,
    /// Cached table-reader handle, released when refs reaches zero.
    table_handle: ArcSwapOption<TableHandle>,
    /// Slices logically assigned into this file at its level.
    file_slices: Mutex<Vec<FileSlice>>,
    /// Error from the parallel handle loader, surfaced at read time.
    load_error: Mutex<Option<Error>>,
}

impl FileMetadata {
    /// Create new file metadata.
    pub fn new(
        file_number: u64,
        path_id: u32,
        file_size: u64,
        smallest: InternalKey,
        largest: InternalKey,
        smallest_seqno: SequenceNumber,
        largest_seqno: SequenceNumber,
    ) -> Self {
        debug_assert!(smallest_seqno <= largest_seqno);
        Self {
            file_number,
            path_id,
            file_size,
            smallest,
            largest,
            smallest_seqno,
            largest_seqno,
            refs: AtomicI64::new(0),
            slice_refs: AtomicI64::new(0),
            table_handle: ArcSwapOption::empty(),
            file_slices: Mutex::new(Vec::new()),
            load_error: Mutex::new(None),
        }
    }

    /// Get the file number.
    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    /// Get the storage directory index.
    pub fn path_id(&self) -> u32 {
        self.path_id
    }

    /// Get the file size.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get the smallest key.
    pub fn smallest(&self) -> &InternalKey {
        &self.smallest
    }

    /// Get the largest key.
    pub fn largest(&self) -> &InternalKey {
        &self.largest
    }

    /// Get the smallest sequence number.
    pub fn smallest_seqno(&self) -> SequenceNumber {
        self.smallest_seqno
    }

    /// Get the largest sequence number.
    pub fn largest_seqno(&self) -> SequenceNumber {
        self.largest_seqno
    }

    /// Whether this file was ingested externally (single global seqno).
    pub fn is_ingested(&self) -> bool {
        self.smallest_seqno == self.largest_seqno
    }

    /// Increment the snapshot reference count, returning the new count.
    pub fn add_ref(&self) -> i64 {
        self.refs.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    /// Decrement the snapshot reference count, returning the new count.
    ///
    /// The caller that observes zero must release the table handle before
    /// letting the record go.
    pub fn unref(&self) -> i64 {
        let refs = self.refs.fetch_sub(1, AtomicOrdering::SeqCst) - 1;
        debug_assert!(refs >= 0, "file {} over-unreffed", self.file_number);
        refs
    }

    /// Current snapshot reference count.
    pub fn refs(&self) -> i64 {
        self.refs.load(AtomicOrdering::SeqCst)
    }

    /// Increment the slice-parent reference count, returning the new count.
    pub fn add_slice_ref(&self) -> i64 {
        self.slice_refs.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    /// Decrement the slice-parent reference count, returning the new count.
    pub fn unref_slice(&self) -> i64 {
        let refs = self.slice_refs.fetch_sub(1, AtomicOrdering::SeqCst) - 1;
        assert!(
            refs >= 0,
            "file {} slice_refs went negative",
            self.file_number
        );
        refs
    }

    /// Current slice-parent reference count.
    pub fn slice_refs(&self) -> i64 {
        self.slice_refs.load(AtomicOrdering::SeqCst)
    }

    /// Stash the cached table-reader handle.
    pub fn set_table_handle(&self, handle: Arc<TableHandle>) {
        self.table_handle.store(Some(handle));
    }

    /// Get the cached table-reader handle, if loaded.
    pub fn table_handle(&self) -> Option<Arc<TableHandle>> {
        self.table_handle.load_full()
    }

    /// Release the cached handle back to the table cache.
    pub fn release_table_handle(&self) {
        self.table_handle.store(None);
    }

    /// Record a table-open failure for later surfacing at read time.
    pub fn set_load_error(&self, err: Error) {
        *self.load_error.lock() = Some(err);
    }

    /// The recorded table-open failure, if any.
    pub fn load_error(&self) -> Option<Error> {
        self.load_error.lock().clone()
    }

    /// Attach a slice assigned into this file at its level.
    pub(crate) fn attach_slice(&self, slice: FileSlice) {
        self.file_slices.lock().push(slice);
    }

    /// Snapshot of the slices assigned into this file.
    pub fn slices(&self) -> Vec<FileSlice> {
        self.file_slices.lock().clone()
    }

    /// Number of slices assigned into this file.
    pub fn slice_count(&self) -> usize {
        self.file_slices.lock().len()
    }
}

impl std::fmt::Debug for FileMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMetadata")
            .field("file_number", &self.file_number)
            .field("path_id", &self.path_id)
            .field("file_size", &self.file_size)
            .field("refs", &self.refs())
            .field("slice_refs", &self.slice_refs())
            .field("slice_count", &self.slice_count())
            .finish()
    }
}

impl PartialEq for FileMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.file_number == other.file_number
    }
}

impl Eq for FileMetadata {}

/// A sub-range of a parent file, logically owned by a level without
/// physically rewriting the parent.
///
/// The parent is held weakly: strong ownership of the parent lives in the
/// level lists and the frozen set, and `slice_refs > 0` keeps it there.
/// `largest` is inclusive; `smallest` is inclusive iff `is_contain_smallest`.
#[derive(Clone)]
pub struct FileSlice {
    parent: Weak<FileMetadata>,
    parent_number: u64,
    smallest: InternalKey,
    largest: InternalKey,
    is_contain_smallest: bool,
    output_file_number: u64,
}

impl FileSlice {
    /// Create a slice of `parent`.
    pub fn new(
        parent: &Arc<FileMetadata>,
        smallest: InternalKey,
        largest: InternalKey,
        is_contain_smallest: bool,
        output_file_number: u64,
    ) -> Self {
        Self {
            parent: Arc::downgrade(parent),
            parent_number: parent.file_number(),
            smallest,
            largest,
            is_contain_smallest,
            output_file_number,
        }
    }

    /// Create a slice not yet bound to a parent record, for callers that
    /// only need the range (e.g. iterating a slice of an open table).
    pub fn detached(
        smallest: InternalKey,
        largest: InternalKey,
        is_contain_smallest: bool,
        output_file_number: u64,
    ) -> Self {
        Self {
            parent: Weak::new(),
            parent_number: 0,
            smallest,
            largest,
            is_contain_smallest,
            output_file_number,
        }
    }

    /// The parent file, while it is still reachable.
    pub fn parent(&self) -> Option<Arc<FileMetadata>> {
        self.parent.upgrade()
    }

    /// The parent's file number.
    pub fn parent_number(&self) -> u64 {
        self.parent_number
    }

    /// The file number this slice is logically assigned into at its level.
    pub fn output_file_number(&self) -> u64 {
        self.output_file_number
    }

    /// Smallest key of the slice.
    pub fn smallest(&self) -> &InternalKey {
        &self.smallest
    }

    /// Largest key of the slice (inclusive).
    pub fn largest(&self) -> &InternalKey {
        &self.largest
    }

    /// Whether the smallest boundary is inclusive.
    pub fn is_contain_smallest(&self) -> bool {
        self.is_contain_smallest
    }

    pub(crate) fn clear_contain_smallest(&mut self) {
        self.is_contain_smallest = false;
    }
}

impl std::fmt::Debug for FileSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSlice")
            .field("parent_number", &self.parent_number)
            .field("output_file_number", &self.output_file_number)
            .field("is_contain_smallest", &self.is_contain_smallest)
            .finish()
    }
}

/// Sort order for level-0 files: newest first by
/// (largest_seqno desc, smallest_seqno desc, file number desc).
pub fn newest_first_by_seqno(a: &FileMetadata, b: &FileMetadata) -> Ordering {
    b.largest_seqno()
        .cmp(&a.largest_seqno())
        .then_with(|| b.smallest_seqno().cmp(&a.smallest_seqno()))
        .then_with(|| b.file_number().cmp(&a.file_number()))
}

/// Sort order for levels above 0: (smallest key asc, file number asc).
pub fn by_smallest_key(a: &FileMetadata, b: &FileMetadata, icmp: &InternalKeyComparator) -> Ordering {
    icmp.compare(a.smallest(), b.smallest())
        .then_with(|| a.file_number().cmp(&b.file_number()))
}
