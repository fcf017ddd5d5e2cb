//! VersionBuilder - applies edits over a base snapshot to produce the next.
//!
//! A builder stages any number of edits without materialising intermediate
//! versions, then merges the staged state with the base in one pass.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use tracing::warn;

use crate::cache::TableCache;
use crate::options::CompactionOptionsTwoPc;
use crate::util::comparator::InternalKeyComparator;

use super::edit::{FileSliceRecord, VersionEdit};
use super::file_metadata::{by_smallest_key, newest_first_by_seqno, FileMetadata, FileSlice};
use super::merge::{MergeTask, MergeTaskSet};
use super::storage::VersionStorage;

/// Staged mutations for one level.
#[derive(Default)]
struct LevelState {
    deleted_files: HashSet<u64>,
    /// Map from file number to staged metadata.
    added_files: HashMap<u64, Arc<FileMetadata>>,
    /// New slices grouped by the output file number they attach to.
    added_file_slices: HashMap<u64, Vec<FileSliceRecord>>,
    /// Files moved into the frozen set, by file number.
    added_frozen_files: HashMap<u64, Arc<FileMetadata>>,
}

/// Applies a sequence of edits to a base snapshot, yielding a new one.
pub struct VersionBuilder {
    icmp: InternalKeyComparator,
    table_cache: Arc<TableCache>,
    base: Arc<VersionStorage>,
    num_levels: usize,
    levels: Vec<LevelState>,
    /// Staged file numbers on levels at or beyond `num_levels`. The edit
    /// batch is only valid if these cancel out.
    invalid_levels: BTreeMap<usize, HashSet<u64>>,
    has_invalid_levels: bool,
    merge_tasks: Arc<MergeTaskSet>,
    two_pc_options: CompactionOptionsTwoPc,
}

impl VersionBuilder {
    /// Create a builder over `base`.
    pub fn new(
        table_cache: Arc<TableCache>,
        base: Arc<VersionStorage>,
        merge_tasks: Arc<MergeTaskSet>,
        two_pc_options: CompactionOptionsTwoPc,
    ) -> Self {
        let num_levels = base.num_levels();
        let mut levels = Vec::with_capacity(num_levels);
        levels.resize_with(num_levels, LevelState::default);

        Self {
            icmp: base.internal_comparator().clone(),
            table_cache,
            base,
            num_levels,
            levels,
            invalid_levels: BTreeMap::new(),
            has_invalid_levels: false,
            merge_tasks,
            two_pc_options,
        }
    }

    /// Apply one edit to the staged state.
    ///
    /// Staging order within the edit: frozen moves, then new slices, then
    /// deletions, then additions, so earlier mutations cannot be undone by
    /// later ones.
    pub fn apply(&mut self, edit: &VersionEdit) {
        self.base.check_consistency();

        // Move files to the frozen region.
        for &(level, number) in &edit.frozen_files {
            if level < self.num_levels {
                let f = self
                    .resolve_file(number)
                    .unwrap_or_else(|| panic!("frozen move of unknown file {}", number));
                self.levels[level].added_frozen_files.insert(number, f);
            } else {
                debug_assert!(false, "frozen move to invalid level {}", level);
            }
        }

        // Stage new file slices.
        for (level, record) in &edit.new_file_slices {
            if *level < self.num_levels {
                self.levels[*level]
                    .added_file_slices
                    .entry(record.output_file_number)
                    .or_default()
                    .push(record.clone());
            } else {
                debug_assert!(false, "file slice on invalid level {}", level);
            }
        }

        // Delete files.
        for &(level, number) in &edit.deleted_files {
            if level < self.num_levels {
                self.levels[level].deleted_files.insert(number);
                self.check_consistency_for_deletes(number, level);

                if let Some(existing) = self.levels[level].added_files.remove(&number) {
                    self.unref_file(&existing);
                }
            } else {
                // Beyond the configured level count: the deletion may cancel
                // a staged invalid add; otherwise the batch is bad.
                let staged = self.invalid_levels.entry(level).or_default();
                if !staged.remove(&number) {
                    self.has_invalid_levels = true;
                }
            }
        }

        // Add new files.
        for (level, entry) in &edit.new_files {
            if *level < self.num_levels {
                let f = Arc::new(FileMetadata::new(
                    entry.file_number,
                    entry.path_id,
                    entry.file_size,
                    entry.smallest.clone(),
                    entry.largest.clone(),
                    entry.smallest_seqno,
                    entry.largest_seqno,
                ));
                f.add_ref();

                assert!(
                    !self.levels[*level].added_files.contains_key(&entry.file_number),
                    "duplicate add of file {} at level {}",
                    entry.file_number,
                    level
                );
                self.levels[*level].deleted_files.remove(&entry.file_number);
                self.levels[*level]
                    .added_files
                    .insert(entry.file_number, f);
            } else {
                let staged = self.invalid_levels.entry(*level).or_default();
                if !staged.insert(entry.file_number) {
                    // Creating an already-staged file on an invalid level.
                    self.has_invalid_levels = true;
                }
            }
        }
    }

    /// A file targeted for deletion must exist in the base snapshot, or be
    /// staged at this level or a higher one (a file can migrate levels
    /// within one edit batch).
    fn check_consistency_for_deletes(&self, number: u64, level: usize) {
        if !cfg!(debug_assertions) && !self.base.force_consistency_checks() {
            return;
        }

        let mut found = false;
        for l in 0..self.num_levels {
            if self
                .base
                .level_files(l)
                .iter()
                .any(|f| f.file_number() == number)
            {
                found = true;
                break;
            }
        }

        if !found {
            for l in (level + 1)..self.num_levels {
                if self.levels[l].added_files.contains_key(&number) {
                    found = true;
                    break;
                }
            }
        }

        // Maybe the file was added by an earlier edit in this batch.
        if !found && self.levels[level].added_files.contains_key(&number) {
            found = true;
        }

        if !found {
            panic!("deleted file {} not found at any level", number);
        }
    }

    /// Whether the staged state references no unresolved invalid levels.
    pub fn check_consistency_for_num_levels(&self) -> bool {
        if self.has_invalid_levels {
            return false;
        }
        self.invalid_levels.values().all(|staged| staged.is_empty())
    }

    /// Materialise the staged state into a new snapshot.
    pub fn save_to(&self) -> VersionStorage {
        self.base.check_consistency();

        let mut vstorage = VersionStorage::new(
            self.icmp.clone(),
            self.num_levels,
            self.base.force_consistency_checks(),
            self.base.version_number() + 1,
        );

        for level in 0..self.num_levels {
            let level_cmp = |a: &FileMetadata, b: &FileMetadata| -> Ordering {
                if level == 0 {
                    newest_first_by_seqno(a, b)
                } else {
                    by_smallest_key(a, b, &self.icmp)
                }
            };

            // Merge the sorted added files with the pre-existing base files,
            // dropping deleted ones along the way.
            let base_files = self.base.level_files(level);
            let state = &self.levels[level];
            vstorage.reserve(level, base_files.len() + state.added_files.len());

            let mut added: Vec<Arc<FileMetadata>> = state.added_files.values().cloned().collect();
            added.sort_by(|a, b| level_cmp(a, b));

            let mut last_file: Option<Arc<FileMetadata>> = None;
            let mut base_idx = 0;

            #[cfg(debug_assertions)]
            let mut prev_added: Option<&Arc<FileMetadata>> = None;

            for added_file in &added {
                #[cfg(debug_assertions)]
                {
                    if level > 0 {
                        if let Some(prev) = prev_added {
                            debug_assert!(
                                self.icmp.compare(prev.smallest(), added_file.smallest())
                                    != Ordering::Greater
                            );
                        }
                    }
                    prev_added = Some(added_file);
                }

                // Emit every base file sorting before the added one.
                let remaining = &base_files[base_idx..];
                let upper =
                    remaining.partition_point(|b| level_cmp(b, added_file) != Ordering::Greater);
                for base_file in &remaining[..upper] {
                    self.maybe_add_file(&mut vstorage, level, base_file, &mut last_file);
                }
                base_idx += upper;

                self.maybe_add_file(&mut vstorage, level, added_file, &mut last_file);
            }

            // Add remaining base files.
            for base_file in &base_files[base_idx..] {
                self.maybe_add_file(&mut vstorage, level, base_file, &mut last_file);
            }

            for f in state.added_frozen_files.values() {
                vstorage.insert_frozen(Arc::clone(f));
            }
        }

        // Carry forward frozen parents that still back live slices.
        for f in self.base.frozen_files().values() {
            if f.slice_refs() > 0 {
                vstorage.insert_frozen(Arc::clone(f));
            }
        }

        vstorage.check_consistency();
        vstorage
    }

    /// Route one merge-emitted file into the new snapshot.
    fn maybe_add_file(
        &self,
        vstorage: &mut VersionStorage,
        level: usize,
        f: &Arc<FileMetadata>,
        last_file: &mut Option<Arc<FileMetadata>>,
    ) {
        let state = &self.levels[level];
        let number = f.file_number();

        if state.deleted_files.contains(&number) {
            // The file leaves the level; its slices no longer pin their
            // parents.
            for slice in f.slices() {
                match slice.parent() {
                    Some(parent) => {
                        parent.unref_slice();
                    }
                    None => debug_assert!(
                        false,
                        "parent {} of a live slice already gone",
                        slice.parent_number()
                    ),
                }
            }
            vstorage.remove_current_stats(level, f);
        } else if state.added_frozen_files.contains_key(&number) {
            // Frozen files are parents only; a file carrying its own slices
            // cannot be frozen.
            assert!(
                f.slice_count() == 0,
                "file {} moved to frozen while holding slices",
                number
            );
            vstorage.add_frozen_file(level, number, Arc::clone(f));
            vstorage.remove_current_stats(level, f);
        } else {
            vstorage.add_file(level, Arc::clone(f));

            let mut attached_slices = false;
            if let Some(records) = state.added_file_slices.get(&number) {
                for record in records {
                    let parent =
                        self.resolve_file(record.parent_file_number).unwrap_or_else(|| {
                            panic!("slice parent {} not found", record.parent_file_number)
                        });
                    let slice = FileSlice::new(
                        &parent,
                        record.smallest.clone(),
                        record.largest.clone(),
                        record.is_contain_smallest,
                        record.output_file_number,
                    );
                    vstorage.add_file_slice(level, f, slice, last_file.as_ref());
                    attached_slices = true;
                }
            }

            if attached_slices && f.slice_count() > self.two_pc_options.merge_threshold {
                self.merge_tasks.insert(MergeTask::new(
                    level,
                    f.smallest().clone(),
                    f.largest().clone(),
                ));
            }

            *last_file = Some(Arc::clone(f));
        }
    }

    /// Open table handles for every staged added file.
    ///
    /// Up to `max_threads` workers claim files through a shared atomic
    /// index. An open failure is recorded on the metadata and surfaced at
    /// read time; the load itself never fails.
    pub fn load_table_handles(&self, max_threads: usize) {
        let mut files_meta: Vec<(Arc<FileMetadata>, usize)> = Vec::new();
        for (level, state) in self.levels.iter().enumerate() {
            for f in state.added_files.values() {
                debug_assert!(f.table_handle().is_none());
                files_meta.push((Arc::clone(f), level));
            }
        }

        let next_file_meta_idx = AtomicUsize::new(0);
        let load_handles = || loop {
            let file_idx = next_file_meta_idx.fetch_add(1, AtomicOrdering::SeqCst);
            if file_idx >= files_meta.len() {
                break;
            }

            let (f, level) = &files_meta[file_idx];
            match self.table_cache.find_table(f.file_number(), f.path_id()) {
                Ok(handle) => f.set_table_handle(handle),
                Err(err) => {
                    warn!(
                        file_number = f.file_number(),
                        level = *level,
                        %err,
                        "failed to open table handle"
                    );
                    f.set_load_error(err);
                }
            }
        };

        if max_threads <= 1 {
            load_handles();
        } else {
            std::thread::scope(|scope| {
                for _ in 0..max_threads {
                    scope.spawn(&load_handles);
                }
            });
        }
    }

    /// Find a file's metadata in the staged state or the base snapshot.
    fn resolve_file(&self, number: u64) -> Option<Arc<FileMetadata>> {
        for state in &self.levels {
            if let Some(f) = state.added_frozen_files.get(&number) {
                return Some(Arc::clone(f));
            }
            if let Some(f) = state.added_files.get(&number) {
                return Some(Arc::clone(f));
            }
        }
        for level in 0..self.num_levels {
            if let Some(f) = self
                .base
                .level_files(level)
                .iter()
                .find(|f| f.file_number() == number)
            {
                return Some(Arc::clone(f));
            }
        }
        self.base.frozen_files().get(&number).map(Arc::clone)
    }

    fn unref_file(&self, f: &Arc<FileMetadata>) {
        if f.unref() == 0 {
            f.release_table_handle();
        }
    }
}

impl Drop for VersionBuilder {
    fn drop(&mut self) {
        for level in 0..self.num_levels {
            for f in self.levels[level].added_files.values() {
                if f.unref() == 0 {
                    f.release_table_handle();
                }
            }
        }
    }
}
