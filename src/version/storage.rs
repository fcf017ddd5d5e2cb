//! VersionStorage - one immutable snapshot of the file set.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::util::comparator::InternalKeyComparator;

use super::file_metadata::{by_smallest_key, newest_first_by_seqno, FileMetadata, FileSlice};

/// Aggregate statistics for one level.
#[derive(Debug, Default, Clone)]
pub struct LevelStats {
    /// Files live at this level.
    pub num_files: usize,
    /// Total size of live files at this level.
    pub total_file_size: u64,
    /// Slices attached to files at this level.
    pub num_slices: usize,
    /// Files removed from this level while building the snapshot.
    pub dropped_files: usize,
    /// Bytes removed from this level while building the snapshot.
    pub dropped_bytes: u64,
}

/// One immutable snapshot of which files constitute the database.
///
/// Level 0 is ordered newest first; higher levels are ordered by smallest
/// key with non-overlapping ranges. The frozen set holds files kept on disk
/// only because slices of them are still live. Once sealed and handed to
/// readers the storage is logically immutable.
pub struct VersionStorage {
    icmp: InternalKeyComparator,
    num_levels: usize,
    files: Vec<Vec<Arc<FileMetadata>>>,
    frozen_files: HashMap<u64, Arc<FileMetadata>>,
    level_stats: Vec<LevelStats>,
    version_number: u64,
    force_consistency_checks: bool,
    /// Reference count for readers holding this snapshot.
    refs: AtomicUsize,
}

impl VersionStorage {
    /// Create an empty storage.
    pub fn new(
        icmp: InternalKeyComparator,
        num_levels: usize,
        force_consistency_checks: bool,
        version_number: u64,
    ) -> Self {
        Self {
            icmp,
            num_levels,
            files: vec![Vec::new(); num_levels],
            frozen_files: HashMap::new(),
            level_stats: vec![LevelStats::default(); num_levels],
            version_number,
            force_consistency_checks,
            refs: AtomicUsize::new(0),
        }
    }

    /// Number of configured levels.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Monotonic number of this snapshot.
    pub fn version_number(&self) -> u64 {
        self.version_number
    }

    /// The internal key comparator.
    pub fn internal_comparator(&self) -> &InternalKeyComparator {
        &self.icmp
    }

    /// Whether release builds run consistency checks.
    pub fn force_consistency_checks(&self) -> bool {
        self.force_consistency_checks
    }

    /// Pre-size a level before a merge.
    pub fn reserve(&mut self, level: usize, capacity: usize) {
        self.files[level].reserve(capacity);
    }

    /// Append a file to a level, taking a snapshot reference on it.
    ///
    /// Files must be appended in the level's sort order; `check_consistency`
    /// verifies the result.
    pub fn add_file(&mut self, level: usize, f: Arc<FileMetadata>) {
        f.add_ref();
        let stats = &mut self.level_stats[level];
        stats.num_files += 1;
        stats.total_file_size += f.file_size();
        self.files[level].push(f);
    }

    /// Put a file into the frozen set. `level` is the level the file last
    /// lived at.
    pub fn add_frozen_file(&mut self, _level: usize, file_number: u64, f: Arc<FileMetadata>) {
        self.insert_frozen_with_number(file_number, f);
    }

    /// Insert a file into the frozen set, taking a reference unless it is
    /// already present.
    pub fn insert_frozen(&mut self, f: Arc<FileMetadata>) {
        self.insert_frozen_with_number(f.file_number(), f);
    }

    fn insert_frozen_with_number(&mut self, file_number: u64, f: Arc<FileMetadata>) {
        use std::collections::hash_map::Entry;
        if let Entry::Vacant(entry) = self.frozen_files.entry(file_number) {
            f.add_ref();
            entry.insert(f);
        }
    }

    /// Attach a slice to `f`, which lives at `level`.
    ///
    /// A slice whose smallest key equals the previous file's largest key has
    /// its inclusive-smallest flag cleared: the boundary key belongs to the
    /// preceding file. Increments the parent's `slice_refs`.
    pub fn add_file_slice(
        &mut self,
        level: usize,
        f: &Arc<FileMetadata>,
        mut slice: FileSlice,
        last_file: Option<&Arc<FileMetadata>>,
    ) {
        debug_assert_eq!(slice.output_file_number(), f.file_number());

        if let Some(last) = last_file {
            if self.icmp.compare(slice.smallest(), last.largest()) == std::cmp::Ordering::Equal {
                slice.clear_contain_smallest();
            }
        }

        let parent = slice
            .parent()
            .unwrap_or_else(|| panic!("slice parent {} unreachable", slice.parent_number()));
        debug_assert!(
            self.icmp.compare(slice.smallest(), parent.smallest()) != std::cmp::Ordering::Less
                && self.icmp.compare(slice.largest(), parent.largest())
                    != std::cmp::Ordering::Greater,
            "slice range escapes parent {}",
            parent.file_number()
        );
        parent.add_slice_ref();

        f.attach_slice(slice);
        self.level_stats[level].num_slices += 1;
    }

    /// Account a file dropped from a level while building this snapshot.
    pub fn remove_current_stats(&mut self, level: usize, f: &FileMetadata) {
        let stats = &mut self.level_stats[level];
        stats.dropped_files += 1;
        stats.dropped_bytes += f.file_size();
    }

    /// Files at a level, in the level's sort order.
    pub fn level_files(&self, level: usize) -> &[Arc<FileMetadata>] {
        &self.files[level]
    }

    /// Number of files at a level.
    pub fn num_level_files(&self, level: usize) -> usize {
        self.files[level].len()
    }

    /// Total files across all levels (frozen set excluded).
    pub fn total_files(&self) -> usize {
        self.files.iter().map(|f| f.len()).sum()
    }

    /// The frozen-file set, keyed by file number.
    pub fn frozen_files(&self) -> &HashMap<u64, Arc<FileMetadata>> {
        &self.frozen_files
    }

    /// Statistics for a level.
    pub fn level_stats(&self, level: usize) -> &LevelStats {
        &self.level_stats[level]
    }

    /// Collect every file number this snapshot keeps alive: level files,
    /// frozen files, and slice parents.
    pub fn collect_live_files(&self, live: &mut HashSet<u64>) {
        for level_files in &self.files {
            for f in level_files {
                live.insert(f.file_number());
                for slice in f.slices() {
                    live.insert(slice.parent_number());
                }
            }
        }
        for number in self.frozen_files.keys() {
            live.insert(*number);
        }
    }

    /// Increment the reader reference count.
    pub fn add_ref(&self) -> usize {
        self.refs.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrement the reader reference count, returning the new count.
    pub fn release_ref(&self) -> usize {
        let refs = self.refs.load(Ordering::SeqCst);
        assert!(refs > 0, "version storage over-released");
        self.refs.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// Current reader reference count.
    pub fn refs(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    /// Drop this snapshot's stake in every file it lists.
    ///
    /// Files driven to zero references have their table handle released;
    /// those with no remaining slice references either are returned as
    /// obsolete.
    pub fn retire_files(&self) -> Vec<Arc<FileMetadata>> {
        let mut obsolete = Vec::new();

        let mut drop_one = |f: &Arc<FileMetadata>| {
            if f.unref() == 0 {
                f.release_table_handle();
                if f.slice_refs() == 0 {
                    obsolete.push(Arc::clone(f));
                }
            }
        };

        for level_files in &self.files {
            for f in level_files {
                drop_one(f);
            }
        }
        for f in self.frozen_files.values() {
            drop_one(f);
        }

        obsolete
    }

    /// Verify the snapshot invariants, aborting on violation.
    ///
    /// Always runs in debug builds; release builds only check when
    /// `force_consistency_checks` is set. Violations are bugs, not errors.
    pub fn check_consistency(&self) {
        if !cfg!(debug_assertions) && !self.force_consistency_checks {
            return;
        }

        for level in 0..self.num_levels {
            let level_files = &self.files[level];
            for i in 1..level_files.len() {
                let f1 = &level_files[i - 1];
                let f2 = &level_files[i];
                if level == 0 {
                    if newest_first_by_seqno(f1, f2) != std::cmp::Ordering::Less {
                        panic!("L0 files are not sorted properly");
                    }

                    if f2.is_ingested() {
                        // An externally ingested file carries one global
                        // seqno; it must be older than its neighbour or 0.
                        let external_seqno = f2.smallest_seqno();
                        if !(external_seqno < f1.largest_seqno() || external_seqno == 0) {
                            panic!(
                                "L0 file seqno {} {} vs. file with global seqno {}",
                                f1.smallest_seqno(),
                                f1.largest_seqno(),
                                external_seqno
                            );
                        }
                    } else if f1.smallest_seqno() <= f2.smallest_seqno() {
                        panic!(
                            "L0 files seqno {} {} vs. {} {}",
                            f1.smallest_seqno(),
                            f1.largest_seqno(),
                            f2.smallest_seqno(),
                            f2.largest_seqno()
                        );
                    }
                } else {
                    if by_smallest_key(f1, f2, &self.icmp) != std::cmp::Ordering::Less {
                        panic!("L{} files are not sorted properly", level);
                    }

                    // No overlap in levels above 0.
                    if self.icmp.compare(f1.largest(), f2.smallest()) != std::cmp::Ordering::Less {
                        panic!(
                            "L{} has overlapping ranges: file {} vs. file {}",
                            level,
                            f1.file_number(),
                            f2.file_number()
                        );
                    }
                }
            }
        }

        // A file number may appear at one level at most, and never both in
        // a level and the frozen set.
        let mut seen: HashSet<u64> = HashSet::new();
        for level_files in &self.files {
            for f in level_files {
                if !seen.insert(f.file_number()) {
                    panic!("file {} appears on more than one level", f.file_number());
                }
            }
        }
        for number in self.frozen_files.keys() {
            if seen.contains(number) {
                panic!("file {} is both live and frozen", number);
            }
        }

        for f in self.frozen_files.values() {
            if f.slice_refs() <= 0 {
                panic!(
                    "frozen file {} has no live slices (slice_refs = {})",
                    f.file_number(),
                    f.slice_refs()
                );
            }
        }
    }
}

impl std::fmt::Debug for VersionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionStorage")
            .field("version_number", &self.version_number)
            .field("num_levels", &self.num_levels)
            .field("total_files", &self.total_files())
            .field("frozen_files", &self.frozen_files.len())
            .finish()
    }
}
