//! VersionSet - manages the current version and applies edits atomically.
//!
//! The VersionSet is responsible for:
//! - Tracking the current version and every snapshot readers still hold
//! - Applying edits through the builder to produce new versions
//! - File number and sequence number allocation
//! - Pending-output reservations for in-flight compactions
//! - Feeding the obsolete-file lists consumed by the cleaner
//! - Managing the CURRENT file and manifest

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::TableCache;
use crate::options::Options;
use crate::util::comparator::InternalKeyComparator;
use crate::{Error, Result};

use crate::util::filename::descriptor_file_name;

use super::builder::VersionBuilder;
use super::edit::VersionEdit;
use super::manifest::{
    manifest_file_path, parse_manifest_filename, read_current_manifest, set_current_file, Manifest,
    ManifestReader,
};
use super::merge::MergeTaskSet;
use super::storage::VersionStorage;

/// Identity of an obsolete table file awaiting deletion.
#[derive(Debug, Clone)]
pub struct ObsoleteSst {
    /// File number.
    pub file_number: u64,
    /// Storage directory index.
    pub path_id: u32,
    /// File size in bytes.
    pub file_size: u64,
}

/// Manages the set of versions and the shared file metadata.
pub struct VersionSet {
    /// Primary database directory.
    db_path: PathBuf,
    /// Database options.
    options: Arc<Options>,
    /// Internal key comparator shared with every snapshot.
    icmp: InternalKeyComparator,
    /// Table cache used by the builder's handle loader.
    table_cache: Arc<TableCache>,
    /// Current version (atomically swappable).
    current: ArcSwap<VersionStorage>,
    /// Every installed version still potentially held by a reader.
    snapshots: Mutex<Vec<Weak<VersionStorage>>>,
    /// Next file number to allocate.
    next_file_number: AtomicU64,
    /// Last used sequence number.
    last_sequence: AtomicU64,
    /// Minimum WAL number still holding unflushed data.
    log_number: AtomicU64,
    /// Previous log number (for recovery).
    prev_log_number: AtomicU64,
    /// Monotonic number handed to each new version.
    version_number: AtomicU64,
    /// Current manifest writer.
    manifest: Mutex<Option<Manifest>>,
    /// Manifest file number.
    manifest_number: AtomicU64,
    /// Manifest number being written during a roll, 0 otherwise.
    pending_manifest_number: AtomicU64,
    /// File numbers reserved by in-flight jobs.
    pending_outputs: Mutex<BTreeSet<u64>>,
    /// Table files whose last reference was dropped.
    obsolete_ssts: Mutex<Vec<ObsoleteSst>>,
    /// File names of superseded manifests.
    obsolete_manifests: Mutex<Vec<String>>,
    /// Deferred slice merges scheduled by the builder.
    merge_tasks: Arc<MergeTaskSet>,
    /// Comparator name recorded in the first edit.
    comparator_name: String,
}

impl VersionSet {
    /// Create a new VersionSet rooted at the options' primary path.
    pub fn new(
        options: Arc<Options>,
        icmp: InternalKeyComparator,
        table_cache: Arc<TableCache>,
    ) -> Self {
        let comparator_name = icmp.user_comparator().name().to_string();
        let first = Arc::new(VersionStorage::new(
            icmp.clone(),
            options.num_levels,
            options.force_consistency_checks,
            1,
        ));
        first.add_ref();

        Self {
            db_path: options.primary_path().clone(),
            options,
            icmp,
            table_cache,
            current: ArcSwap::from(Arc::clone(&first)),
            snapshots: Mutex::new(vec![Arc::downgrade(&first)]),
            next_file_number: AtomicU64::new(2), // 1 is reserved for the manifest
            last_sequence: AtomicU64::new(0),
            log_number: AtomicU64::new(0),
            prev_log_number: AtomicU64::new(0),
            version_number: AtomicU64::new(1),
            manifest: Mutex::new(None),
            manifest_number: AtomicU64::new(0),
            pending_manifest_number: AtomicU64::new(0),
            pending_outputs: Mutex::new(BTreeSet::new()),
            obsolete_ssts: Mutex::new(Vec::new()),
            obsolete_manifests: Mutex::new(Vec::new()),
            merge_tasks: Arc::new(MergeTaskSet::new()),
            comparator_name,
        }
    }

    /// The primary database directory.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// The database options.
    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    /// The table cache.
    pub fn table_cache(&self) -> &Arc<TableCache> {
        &self.table_cache
    }

    /// The merge-task set the builder schedules into.
    pub fn merge_tasks(&self) -> &Arc<MergeTaskSet> {
        &self.merge_tasks
    }

    /// The internal key comparator.
    pub fn internal_comparator(&self) -> &InternalKeyComparator {
        &self.icmp
    }

    /// The current version.
    pub fn current(&self) -> Arc<VersionStorage> {
        self.current.load_full()
    }

    /// Take a reader reference on the current version.
    ///
    /// Must be paired with [`release_version`](Self::release_version).
    pub fn acquire_version(&self) -> Arc<VersionStorage> {
        let version = self.current.load_full();
        version.add_ref();
        version
    }

    /// Drop a reader reference; the last one retires the snapshot and
    /// feeds its dead files to the obsolete list.
    pub fn release_version(&self, version: &Arc<VersionStorage>) {
        if version.release_ref() == 0 {
            self.retire_version(version);
        }
    }

    /// Allocate and return a new file number.
    pub fn new_file_number(&self) -> u64 {
        self.next_file_number.fetch_add(1, Ordering::SeqCst)
    }

    /// Current next file number without allocating.
    pub fn next_file_number(&self) -> u64 {
        self.next_file_number.load(Ordering::SeqCst)
    }

    /// Mark a file number as used (during recovery).
    pub fn mark_file_number_used(&self, num: u64) {
        if num >= self.next_file_number() {
            self.next_file_number.store(num + 1, Ordering::SeqCst);
        }
    }

    /// Get the last sequence number.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    /// Set the last sequence number.
    pub fn set_last_sequence(&self, seq: u64) {
        self.last_sequence.store(seq, Ordering::SeqCst);
    }

    /// Minimum WAL number still holding unflushed data.
    pub fn log_number(&self) -> u64 {
        self.log_number.load(Ordering::SeqCst)
    }

    /// Set the log number.
    pub fn set_log_number(&self, num: u64) {
        self.log_number.store(num, Ordering::SeqCst);
    }

    /// Alias for the version set's WAL floor, before 2PC adjustment.
    pub fn min_log_number(&self) -> u64 {
        self.log_number()
    }

    /// Get the previous log number.
    pub fn prev_log_number(&self) -> u64 {
        self.prev_log_number.load(Ordering::SeqCst)
    }

    /// Get the manifest number.
    pub fn manifest_number(&self) -> u64 {
        self.manifest_number.load(Ordering::SeqCst)
    }

    /// Manifest number being written during a roll, 0 otherwise.
    pub fn pending_manifest_number(&self) -> u64 {
        self.pending_manifest_number.load(Ordering::SeqCst)
    }

    /// The comparator name.
    pub fn comparator_name(&self) -> &str {
        &self.comparator_name
    }

    /// Reserve a file number for an in-flight job's output.
    pub fn register_pending_output(&self, number: u64) {
        self.pending_outputs.lock().insert(number);
    }

    /// Release a pending-output reservation.
    pub fn release_pending_output(&self, number: u64) {
        self.pending_outputs.lock().remove(&number);
    }

    /// The deletion watermark: the smallest reserved file number, or
    /// `u64::MAX` when nothing is reserved.
    pub fn min_pending_output(&self) -> u64 {
        self.pending_outputs
            .lock()
            .iter()
            .next()
            .copied()
            .unwrap_or(u64::MAX)
    }

    /// Create the first manifest and point CURRENT at it.
    pub fn create_new_manifest(&self, first_edit: &VersionEdit) -> Result<()> {
        let manifest_number = self.new_file_number();
        self.pending_manifest_number
            .store(manifest_number, Ordering::SeqCst);

        let result = (|| -> Result<()> {
            let mut manifest =
                Manifest::create(&self.db_path, manifest_number, self.options.sync_mode)?;
            manifest.log_edit(first_edit)?;
            manifest.sync()?;

            set_current_file(&self.db_path, manifest_number)?;

            let old_number = self.manifest_number.swap(manifest_number, Ordering::SeqCst);
            let mut guard = self.manifest.lock();
            if guard.is_some() && old_number != 0 {
                self.obsolete_manifests
                    .lock()
                    .push(descriptor_file_name(old_number));
            }
            *guard = Some(manifest);
            Ok(())
        })();

        self.pending_manifest_number.store(0, Ordering::SeqCst);
        result
    }

    /// Log a VersionEdit to the manifest and install the resulting version.
    ///
    /// Returns `Error::InvalidVersionEdit` when the edit references levels
    /// beyond the configured count and they do not cancel out; the edit is
    /// not applied in that case.
    pub fn log_and_apply(&self, edit: &mut VersionEdit) -> Result<Arc<VersionStorage>> {
        if edit.log_number.is_none() {
            edit.set_log_number(self.log_number());
        }
        if edit.prev_log_number.is_none() {
            edit.set_prev_log_number(self.prev_log_number());
        }
        if edit.next_file_number.is_none() {
            edit.set_next_file_number(self.next_file_number());
        }
        if edit.last_sequence.is_none() {
            edit.set_last_sequence(self.last_sequence());
        }

        let current = self.current();
        let mut builder = VersionBuilder::new(
            Arc::clone(&self.table_cache),
            current,
            Arc::clone(&self.merge_tasks),
            self.options.compaction_options_2pc.clone(),
        );
        builder.apply(edit);

        if !builder.check_consistency_for_num_levels() {
            return Err(Error::InvalidVersionEdit);
        }

        builder.load_table_handles(self.options.max_file_opening_threads);
        let new_version = Arc::new(builder.save_to());
        drop(builder);

        {
            let mut guard = self.manifest.lock();
            let manifest = guard
                .as_mut()
                .ok_or_else(|| Error::internal("no active manifest"))?;
            manifest.log_edit(edit)?;
            manifest.sync()?;
        }

        self.install(Arc::clone(&new_version));

        if let Some(num) = edit.log_number {
            self.set_log_number(num);
        }
        if let Some(num) = edit.prev_log_number {
            self.prev_log_number.store(num, Ordering::SeqCst);
        }

        debug!(
            version_number = new_version.version_number(),
            total_files = new_version.total_files(),
            "installed new version"
        );

        Ok(new_version)
    }

    /// Install a freshly built version as current.
    fn install(&self, new_version: Arc<VersionStorage>) {
        new_version.add_ref();
        self.version_number
            .store(new_version.version_number(), Ordering::SeqCst);
        self.snapshots.lock().push(Arc::downgrade(&new_version));

        let old = self.current.swap(new_version);
        if old.release_ref() == 0 {
            self.retire_version(&old);
        }
    }

    /// Drop a retired snapshot's file references; files driven fully dead
    /// become obsolete-SST candidates.
    fn retire_version(&self, version: &Arc<VersionStorage>) {
        // A retired snapshot no longer contributes to the live set.
        self.snapshots.lock().retain(|weak| match weak.upgrade() {
            Some(v) => !Arc::ptr_eq(&v, version),
            None => false,
        });

        let dead = version.retire_files();
        if dead.is_empty() {
            return;
        }
        let mut obsolete = self.obsolete_ssts.lock();
        for f in dead {
            obsolete.push(ObsoleteSst {
                file_number: f.file_number(),
                path_id: f.path_id(),
                file_size: f.file_size(),
            });
        }
    }

    /// Collect every file number reachable from any held snapshot plus the
    /// pending-output reservations.
    pub fn add_live_files(&self, live: &mut HashSet<u64>) {
        let mut snapshots = self.snapshots.lock();
        snapshots.retain(|weak| match weak.upgrade() {
            Some(version) => {
                version.collect_live_files(live);
                true
            }
            None => false,
        });
        drop(snapshots);

        for number in self.pending_outputs.lock().iter() {
            live.insert(*number);
        }
    }

    /// Drain the obsolete file lists gathered from retired versions.
    ///
    /// Table files at or above `min_pending_output` stay parked: they may
    /// belong to an in-flight job that has not committed yet.
    pub fn get_obsolete_files(
        &self,
        min_pending_output: u64,
    ) -> (Vec<ObsoleteSst>, Vec<String>) {
        let mut ssts = self.obsolete_ssts.lock();
        let (ready, pending): (Vec<_>, Vec<_>) = ssts
            .drain(..)
            .partition(|f| f.file_number < min_pending_output);
        *ssts = pending;
        drop(ssts);

        let manifests = std::mem::take(&mut *self.obsolete_manifests.lock());
        (ready, manifests)
    }

    /// Recover the version set by replaying the active manifest.
    ///
    /// Returns false when no CURRENT file exists (fresh database).
    pub fn recover(&self) -> Result<bool> {
        let manifest_name = match read_current_manifest(&self.db_path)? {
            Some(name) => name,
            None => return Ok(false),
        };
        let manifest_number = parse_manifest_filename(&manifest_name)
            .ok_or_else(|| Error::corruption("invalid manifest name in CURRENT"))?;

        let manifest_path = manifest_file_path(&self.db_path, manifest_number);
        let mut reader = ManifestReader::new(&manifest_path, manifest_number)?;

        let mut log_number = None;
        let mut prev_log_number = 0u64;
        let mut next_file_number = None;
        let mut last_sequence = None;

        let mut builder = VersionBuilder::new(
            Arc::clone(&self.table_cache),
            self.current(),
            Arc::clone(&self.merge_tasks),
            self.options.compaction_options_2pc.clone(),
        );

        while let Some(edit) = reader.read_edit()? {
            builder.apply(&edit);

            if let Some(num) = edit.log_number {
                log_number = Some(num);
            }
            if let Some(num) = edit.prev_log_number {
                prev_log_number = num;
            }
            if let Some(num) = edit.next_file_number {
                next_file_number = Some(num);
            }
            if let Some(seq) = edit.last_sequence {
                last_sequence = Some(seq);
            }
        }

        if !builder.check_consistency_for_num_levels() {
            return Err(Error::corruption(
                "manifest references levels beyond num_levels",
            ));
        }

        let next_file_number =
            next_file_number.ok_or_else(|| Error::corruption("no next_file_number in manifest"))?;
        let log_number =
            log_number.ok_or_else(|| Error::corruption("no log_number in manifest"))?;
        let last_sequence =
            last_sequence.ok_or_else(|| Error::corruption("no last_sequence in manifest"))?;

        builder.load_table_handles(self.options.max_file_opening_threads);
        let new_version = Arc::new(builder.save_to());
        drop(builder);

        self.next_file_number.store(next_file_number, Ordering::SeqCst);
        self.mark_file_number_used(log_number);
        self.mark_file_number_used(prev_log_number);
        self.set_last_sequence(last_sequence);
        self.set_log_number(log_number);
        self.prev_log_number.store(prev_log_number, Ordering::SeqCst);
        self.manifest_number.store(manifest_number, Ordering::SeqCst);

        self.install(new_version);

        // Reopen the manifest for appending.
        let manifest = Manifest::open(&self.db_path, manifest_number, self.options.sync_mode)?;
        *self.manifest.lock() = Some(manifest);

        Ok(true)
    }

    /// One line per non-empty level.
    pub fn summary(&self) -> String {
        let current = self.current();
        let mut summary = String::new();
        for level in 0..current.num_levels() {
            let stats = current.level_stats(level);
            if stats.num_files > 0 {
                summary.push_str(&format!(
                    "L{}: {} files ({:.2} MB, {} slices)\n",
                    level,
                    stats.num_files,
                    stats.total_file_size as f64 / (1024.0 * 1024.0),
                    stats.num_slices,
                ));
            }
        }
        summary
    }
}

/// Check if a database exists at the given path.
pub fn database_exists(db_path: &Path) -> bool {
    db_path.join("CURRENT").exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::MockOpener;
    use crate::cache::TableOpener;
    use crate::types::{InternalKey, ValueType};
    use crate::util::comparator::InternalKeyComparator;
    use crate::version::edit::NewFileEntry;
    use bytes::Bytes;
    use tempfile::tempdir;

    fn make_key(user_key: &[u8], seq: u64) -> InternalKey {
        InternalKey::new(Bytes::copy_from_slice(user_key), seq, ValueType::Value)
    }

    fn make_entry(number: u64, smallest: &[u8], largest: &[u8]) -> NewFileEntry {
        NewFileEntry {
            file_number: number,
            path_id: 0,
            file_size: 1024,
            smallest: make_key(smallest, 100),
            largest: make_key(largest, 1),
            smallest_seqno: 1,
            largest_seqno: 100,
        }
    }

    fn make_version_set(db_path: &Path) -> VersionSet {
        let mut options = Options::new(db_path);
        options.force_consistency_checks = true;
        let opener: Arc<dyn TableOpener> = Arc::new(MockOpener::new());
        VersionSet::new(
            Arc::new(options),
            InternalKeyComparator::default(),
            Arc::new(TableCache::new(opener, 100)),
        )
    }

    fn init_manifest(vs: &VersionSet) {
        let mut edit = VersionEdit::new();
        edit.set_comparator(vs.comparator_name());
        edit.set_log_number(1);
        edit.set_next_file_number(vs.next_file_number());
        edit.set_last_sequence(0);
        vs.create_new_manifest(&edit).unwrap();
    }

    #[test]
    fn test_new_version_set() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());

        assert_eq!(vs.next_file_number(), 2);
        assert_eq!(vs.last_sequence(), 0);
        assert_eq!(vs.log_number(), 0);
        assert_eq!(vs.current().total_files(), 0);
        assert_eq!(vs.min_pending_output(), u64::MAX);
    }

    #[test]
    fn test_file_number_allocation() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());

        assert_eq!(vs.new_file_number(), 2);
        assert_eq!(vs.new_file_number(), 3);
        vs.mark_file_number_used(10);
        assert_eq!(vs.new_file_number(), 11);
        vs.mark_file_number_used(5);
        assert_eq!(vs.next_file_number(), 12);
    }

    #[test]
    fn test_pending_outputs_watermark() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());

        vs.register_pending_output(200);
        vs.register_pending_output(150);
        assert_eq!(vs.min_pending_output(), 150);

        vs.release_pending_output(150);
        assert_eq!(vs.min_pending_output(), 200);

        vs.release_pending_output(200);
        assert_eq!(vs.min_pending_output(), u64::MAX);
    }

    #[test]
    fn test_log_and_apply_installs_version() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        init_manifest(&vs);

        let mut edit = VersionEdit::new();
        edit.add_file(1, make_entry(10, b"a", b"m"));
        vs.log_and_apply(&mut edit).unwrap();

        let current = vs.current();
        assert_eq!(current.num_level_files(1), 1);
        assert_eq!(current.level_files(1)[0].file_number(), 10);
        // The handle loader ran for the added file.
        assert!(current.level_files(1)[0].table_handle().is_some());
    }

    #[test]
    fn test_invalid_levels_reject_batch() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        init_manifest(&vs);

        let mut edit = VersionEdit::new();
        edit.add_file(99, make_entry(10, b"a", b"m"));
        let err = vs.log_and_apply(&mut edit).unwrap_err();
        assert!(matches!(err, Error::InvalidVersionEdit));

        // Nothing was installed.
        assert_eq!(vs.current().total_files(), 0);
    }

    #[test]
    fn test_retired_version_feeds_obsolete_list() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        init_manifest(&vs);

        let mut edit = VersionEdit::new();
        edit.add_file(1, make_entry(10, b"a", b"m"));
        vs.log_and_apply(&mut edit).unwrap();

        let mut edit = VersionEdit::new();
        edit.delete_file(1, 10);
        vs.log_and_apply(&mut edit).unwrap();

        let (ssts, _manifests) = vs.get_obsolete_files(u64::MAX);
        assert_eq!(ssts.len(), 1);
        assert_eq!(ssts[0].file_number, 10);

        // The list drains once.
        let (ssts, _) = vs.get_obsolete_files(u64::MAX);
        assert!(ssts.is_empty());
    }

    #[test]
    fn test_obsolete_files_respect_watermark() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        init_manifest(&vs);

        let mut edit = VersionEdit::new();
        edit.add_file(1, make_entry(10, b"a", b"m"));
        edit.add_file(1, make_entry(300, b"n", b"z"));
        vs.log_and_apply(&mut edit).unwrap();

        let mut edit = VersionEdit::new();
        edit.delete_file(1, 10);
        edit.delete_file(1, 300);
        vs.log_and_apply(&mut edit).unwrap();

        // Only numbers below the watermark are handed out.
        let (ssts, _) = vs.get_obsolete_files(200);
        let numbers: Vec<u64> = ssts.iter().map(|f| f.file_number).collect();
        assert_eq!(numbers, vec![10]);

        // The parked file shows up once the watermark moves.
        let (ssts, _) = vs.get_obsolete_files(u64::MAX);
        let numbers: Vec<u64> = ssts.iter().map(|f| f.file_number).collect();
        assert_eq!(numbers, vec![300]);
    }

    #[test]
    fn test_reader_snapshot_defers_retirement() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        init_manifest(&vs);

        let mut edit = VersionEdit::new();
        edit.add_file(1, make_entry(10, b"a", b"m"));
        vs.log_and_apply(&mut edit).unwrap();

        let snapshot = vs.acquire_version();

        let mut edit = VersionEdit::new();
        edit.delete_file(1, 10);
        vs.log_and_apply(&mut edit).unwrap();

        // The reader still sees file 10 and keeps it live.
        assert_eq!(snapshot.num_level_files(1), 1);
        let (ssts, _) = vs.get_obsolete_files(u64::MAX);
        assert!(ssts.is_empty());

        let mut live = HashSet::new();
        vs.add_live_files(&mut live);
        assert!(live.contains(&10));

        // Releasing the snapshot retires it.
        vs.release_version(&snapshot);
        let (ssts, _) = vs.get_obsolete_files(u64::MAX);
        assert_eq!(ssts.len(), 1);
        assert_eq!(ssts[0].file_number, 10);

        let mut live = HashSet::new();
        vs.add_live_files(&mut live);
        assert!(!live.contains(&10));
    }

    #[test]
    fn test_live_files_include_pending_outputs() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        vs.register_pending_output(42);

        let mut live = HashSet::new();
        vs.add_live_files(&mut live);
        assert!(live.contains(&42));
    }

    #[test]
    fn test_recover_roundtrip() {
        let dir = tempdir().unwrap();

        {
            let vs = make_version_set(dir.path());
            init_manifest(&vs);
            vs.mark_file_number_used(12);

            let mut edit = VersionEdit::new();
            edit.add_file(0, make_entry(10, b"a", b"m"));
            edit.add_file(1, make_entry(11, b"a", b"m"));
            vs.log_and_apply(&mut edit).unwrap();

            vs.set_last_sequence(500);
            let mut edit = VersionEdit::new();
            edit.add_file(1, make_entry(12, b"n", b"z"));
            edit.set_last_sequence(500);
            vs.log_and_apply(&mut edit).unwrap();
        }

        let vs = make_version_set(dir.path());
        let recovered = vs.recover().unwrap();
        assert!(recovered);

        let current = vs.current();
        assert_eq!(current.num_level_files(0), 1);
        assert_eq!(current.num_level_files(1), 2);
        assert!(vs.last_sequence() >= 500);
        assert!(vs.next_file_number() > 12);
        assert!(database_exists(dir.path()));
    }

    #[test]
    fn test_recover_fresh_database() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        assert!(!vs.recover().unwrap());
        assert!(!database_exists(dir.path()));
    }

    #[test]
    fn test_manifest_roll_records_old_manifest() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        init_manifest(&vs);
        let first_manifest = vs.manifest_number();

        let mut edit = VersionEdit::new();
        edit.set_comparator(vs.comparator_name());
        edit.set_log_number(vs.log_number());
        edit.set_next_file_number(vs.next_file_number());
        edit.set_last_sequence(vs.last_sequence());
        vs.create_new_manifest(&edit).unwrap();

        assert!(vs.manifest_number() > first_manifest);
        let (_, manifests) = vs.get_obsolete_files(u64::MAX);
        assert_eq!(manifests, vec![descriptor_file_name(first_manifest)]);
    }

    #[test]
    fn test_summary() {
        let dir = tempdir().unwrap();
        let vs = make_version_set(dir.path());
        init_manifest(&vs);

        let mut edit = VersionEdit::new();
        edit.add_file(1, make_entry(10, b"a", b"m"));
        vs.log_and_apply(&mut edit).unwrap();

        assert!(vs.summary().contains("L1: 1 files"));
    }
}
