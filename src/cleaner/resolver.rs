//! ObsoleteFileResolver - classifies every candidate file as keep, delete,
//! recycle, or archive.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::env::Env;
use crate::options::Options;
use crate::twopc::TwoPhaseLogRetention;
use crate::util::filename::{
    info_log_prefix, parse_file_name, table_file_name, table_file_path, FileType,
    OPTIONS_FILE_PREFIX,
};
use crate::version::VersionSet;
use crate::wal::{WalArchiver, WalSet};

use super::job_context::{CandidateFile, PurgeJobContext};

/// A deletion deferred onto the purge queue.
#[derive(Debug)]
struct PendingPurge {
    full_path: PathBuf,
    file_type: FileType,
    number: u64,
    path_id: u32,
    job_id: u64,
}

/// Decides which on-disk files are still needed and disposes of the rest.
///
/// Discovery (`find_obsolete_files`) gathers a consistent view of the live
/// set, retention floors, and directory contents. Purging
/// (`purge_obsolete_files`) then performs the filesystem work without
/// blocking writers. Per-file failures are logged and skipped; the purge is
/// best-effort and never aborts.
pub struct ObsoleteFileResolver {
    env: Arc<dyn Env>,
    options: Arc<Options>,
    versions: Arc<VersionSet>,
    wal: Arc<WalSet>,
    retention: Arc<TwoPhaseLogRetention>,
    archiver: Arc<dyn WalArchiver>,
    next_job_id: AtomicU64,
    /// Timestamp of the last full scan, in env microseconds.
    last_full_scan_micros: AtomicU64,
    /// Nestable disable count; discovery is a no-op while positive.
    disabled: AtomicI64,
    pending_purges: Mutex<Vec<PendingPurge>>,
}

impl ObsoleteFileResolver {
    /// Create a resolver over the subsystem's shared state.
    pub fn new(
        env: Arc<dyn Env>,
        options: Arc<Options>,
        versions: Arc<VersionSet>,
        wal: Arc<WalSet>,
        retention: Arc<TwoPhaseLogRetention>,
        archiver: Arc<dyn WalArchiver>,
    ) -> Self {
        Self {
            env,
            options,
            versions,
            wal,
            retention,
            archiver,
            next_job_id: AtomicU64::new(1),
            last_full_scan_micros: AtomicU64::new(0),
            disabled: AtomicI64::new(0),
            pending_purges: Mutex::new(Vec::new()),
        }
    }

    /// Suspend file deletions. Nestable.
    pub fn disable_file_deletions(&self) {
        self.disabled.fetch_add(1, Ordering::SeqCst);
    }

    /// Re-enable file deletions after a matching disable.
    pub fn enable_file_deletions(&self) {
        let prev = self.disabled.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0);
    }

    fn deletions_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst) > 0
    }

    /// Find obsolete files and capture the state needed to purge them.
    ///
    /// `no_full_scan` suppresses directory listings entirely; `force`
    /// performs one regardless of the configured minimum period. Between
    /// full scans the builder's deletion log is trusted.
    pub fn find_obsolete_files(&self, force: bool, no_full_scan: bool) -> PurgeJobContext {
        let mut ctx = PurgeJobContext::new(self.next_job_id.fetch_add(1, Ordering::SeqCst));

        if self.deletions_disabled() {
            // manifest_file_number stays 0: the purge step will refuse.
            return ctx;
        }

        let period = self.options.delete_obsolete_files_period_micros;
        ctx.doing_the_full_scan = if no_full_scan {
            false
        } else if force || period == 0 {
            true
        } else {
            let now = self.env.now_micros();
            let last = self.last_full_scan_micros.load(Ordering::SeqCst);
            if last + period < now {
                self.last_full_scan_micros.store(now, Ordering::SeqCst);
                true
            } else {
                false
            }
        };

        // Files numbered at or above the watermark may still be written by
        // an in-flight job and are never classified deletable.
        ctx.min_pending_output = self.versions.min_pending_output();

        let (sst_delete, manifest_delete) =
            self.versions.get_obsolete_files(ctx.min_pending_output);
        ctx.sst_delete_files = sst_delete;
        ctx.manifest_delete_files = manifest_delete;

        ctx.manifest_file_number = self.versions.manifest_number();
        ctx.pending_manifest_file_number = self.versions.pending_manifest_number();
        ctx.log_number = self
            .retention
            .min_log_number_to_keep(self.versions.min_log_number());
        ctx.prev_log_number = self.versions.prev_log_number();

        self.versions.add_live_files(&mut ctx.sst_live);

        if ctx.doing_the_full_scan {
            for (path_id, db_path) in self.options.db_paths.iter().enumerate() {
                // Listing failures leave the directory out of this pass.
                if let Ok(files) = self.env.get_children(&db_path.path) {
                    for file in files {
                        ctx.full_scan_candidate_files
                            .push(CandidateFile::new(file, path_id as u32));
                    }
                }
            }

            if self.options.wal_path() != self.options.primary_path() {
                if let Ok(files) = self.env.get_children(self.options.wal_path()) {
                    for file in files {
                        ctx.full_scan_candidate_files.push(CandidateFile::new(file, 0));
                    }
                }
            }

            if let Some(db_log_dir) = &self.options.db_log_dir {
                if db_log_dir != self.options.primary_path() {
                    if let Ok(files) = self.env.get_children(db_log_dir) {
                        for file in files {
                            ctx.full_scan_candidate_files.push(CandidateFile::new(file, 0));
                        }
                    }
                }
            }
        }

        let reaped = self
            .wal
            .reap_obsolete_logs(ctx.log_number, self.options.recycle_log_file_num);
        ctx.log_delete_files = reaped.deleted;
        ctx.size_log_to_delete = reaped.size_reaped;
        ctx.prev_total_log_size = reaped.prev_total_log_size;
        ctx.num_alive_log_files = reaped.num_alive_log_files;
        ctx.log_recycle_files = self.wal.recycle_logs();

        ctx
    }

    /// Dispose of everything `find_obsolete_files` classified as
    /// deletable. Runs without any subsystem lock held.
    pub fn purge_obsolete_files(&self, ctx: PurgeJobContext, schedule_only: bool) {
        // Discovery never ran (or was disabled): nothing trustworthy here.
        if ctx.manifest_file_number == 0 {
            return;
        }

        let recycle_set: HashSet<u64> = ctx.log_recycle_files.iter().copied().collect();

        let mut candidate_files = ctx.full_scan_candidate_files;
        candidate_files.reserve(
            ctx.sst_delete_files.len()
                + ctx.log_delete_files.len()
                + ctx.manifest_delete_files.len(),
        );

        for sst in &ctx.sst_delete_files {
            candidate_files.push(CandidateFile::new(
                table_file_name(sst.file_number),
                sst.path_id,
            ));
        }
        for &number in &ctx.log_delete_files {
            if number > 0 {
                candidate_files.push(CandidateFile::new(format!("{:06}.log", number), 0));
            }
        }
        for name in &ctx.manifest_delete_files {
            candidate_files.push(CandidateFile::new(name.clone(), 0));
        }

        // Dedup so a file listed by the scan and by a delete list is only
        // handled once.
        candidate_files.sort_by(|a, b| {
            b.file_name
                .cmp(&a.file_name)
                .then_with(|| b.path_id.cmp(&a.path_id))
        });
        candidate_files.dedup();

        if ctx.prev_total_log_size > 0 {
            info!(
                job_id = ctx.job_id,
                size_to_delete = ctx.size_log_to_delete,
                prev_total_log_size = ctx.prev_total_log_size,
                num_alive_log_files = ctx.num_alive_log_files,
                "reaping WAL files"
            );
        }

        let prefix = info_log_prefix(
            self.options.db_log_dir.is_some(),
            self.options.primary_path(),
        );
        let mut old_info_log_files: Vec<String> = Vec::new();

        for candidate in &candidate_files {
            // Unrecognised names are left alone.
            let (file_type, number) = match parse_file_name(&candidate.file_name, &prefix) {
                Some(parsed) => parsed,
                None => continue,
            };

            let keep = match file_type {
                FileType::Log => {
                    number >= ctx.log_number
                        || number == ctx.prev_log_number
                        || recycle_set.contains(&number)
                }
                // Keep my manifest and any newer incarnation (a roll may be
                // in progress).
                FileType::Descriptor => number >= ctx.manifest_file_number,
                FileType::Table => {
                    ctx.sst_live.contains(&number) || number >= ctx.min_pending_output
                }
                // Temp files being written by in-flight jobs are covered by
                // pending outputs; the manifest roll writes a temp file that
                // equals the pending manifest number.
                FileType::Temp => {
                    ctx.sst_live.contains(&number)
                        || number == ctx.pending_manifest_file_number
                        || candidate.file_name.contains(OPTIONS_FILE_PREFIX)
                }
                FileType::InfoLog => {
                    if number != 0 {
                        old_info_log_files
                            .push(candidate.file_name.trim_start_matches('/').to_string());
                    }
                    true
                }
                FileType::Current
                | FileType::DbLock
                | FileType::Identity
                | FileType::MetaDatabase
                | FileType::OptionsFile
                | FileType::Blob => true,
            };

            if keep {
                continue;
            }

            let bare_name = candidate.file_name.trim_start_matches('/');
            let full_path = match file_type {
                FileType::Table => {
                    self.versions.table_cache().evict(number);
                    table_file_path(&self.options.db_paths, number, candidate.path_id)
                }
                FileType::Log => self.options.wal_path().join(bare_name),
                _ => self.options.primary_path().join(bare_name),
            };

            if file_type == FileType::Log && self.options.wal_archival_enabled() {
                if let Err(err) = self.archiver.archive_wal_file(&full_path, number) {
                    error!(
                        job_id = ctx.job_id,
                        path = %full_path.display(),
                        %err,
                        "failed to archive WAL file"
                    );
                }
                continue;
            }

            if schedule_only {
                self.pending_purges.lock().push(PendingPurge {
                    full_path,
                    file_type,
                    number,
                    path_id: candidate.path_id,
                    job_id: ctx.job_id,
                });
            } else {
                self.delete_obsolete_file(
                    ctx.job_id,
                    &full_path,
                    file_type,
                    number,
                    candidate.path_id,
                );
            }
        }

        self.delete_old_info_logs(ctx.job_id, old_info_log_files);

        if let Err(err) = self.archiver.purge_obsolete_wal_files() {
            error!(job_id = ctx.job_id, %err, "WAL archive purge failed");
        }
    }

    /// Age out surplus info log files, oldest first.
    fn delete_old_info_logs(&self, job_id: u64, mut old_info_log_files: Vec<String>) {
        let count = old_info_log_files.len();
        let keep = self.options.keep_log_file_num;
        if count <= keep {
            return;
        }

        old_info_log_files.sort();
        for name in &old_info_log_files[..count - keep] {
            let full_path = self.options.info_log_path().join(name);
            info!(job_id, path = %full_path.display(), "deleting old info log");
            if let Err(err) = self.env.delete_file(&full_path) {
                if err.is_not_found() {
                    info!(
                        job_id,
                        path = %full_path.display(),
                        "tried to delete non-existing info log"
                    );
                } else {
                    error!(job_id, path = %full_path.display(), %err, "info log delete failed");
                }
            }
        }
    }

    /// Delete one file, logging the outcome. NotFound means the file is
    /// already gone and is only informational.
    fn delete_obsolete_file(
        &self,
        job_id: u64,
        full_path: &PathBuf,
        file_type: FileType,
        number: u64,
        path_id: u32,
    ) {
        match self.env.delete_file(full_path) {
            Ok(()) => {
                debug!(
                    job_id,
                    path = %full_path.display(),
                    ?file_type,
                    number,
                    "deleted obsolete file"
                );
            }
            Err(err) if err.is_not_found() => {
                info!(
                    job_id,
                    path = %full_path.display(),
                    ?file_type,
                    number,
                    "tried to delete a non-existing file"
                );
            }
            Err(err) => {
                error!(
                    job_id,
                    path = %full_path.display(),
                    ?file_type,
                    number,
                    %err,
                    "failed to delete obsolete file"
                );
            }
        }

        if file_type == FileType::Table {
            info!(job_id, number, path_id, "table file deletion event");
        }
    }

    /// Drain deletions parked by a `schedule_only` purge.
    pub fn service_pending_purges(&self) {
        let pending = std::mem::take(&mut *self.pending_purges.lock());
        for purge in pending {
            self.delete_obsolete_file(
                purge.job_id,
                &purge.full_path,
                purge.file_type,
                purge.number,
                purge.path_id,
            );
        }
    }

    /// Number of deletions waiting on the purge queue.
    pub fn pending_purge_count(&self) -> usize {
        self.pending_purges.lock().len()
    }

    /// Discover and purge in one step, with a forced full scan.
    pub fn delete_obsolete_files(&self) {
        let ctx = self.find_obsolete_files(true, false);
        if ctx.have_something_to_delete() {
            self.purge_obsolete_files(ctx, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::MockOpener;
    use crate::cache::{TableCache, TableOpener};
    use crate::env::StdEnv;
    use crate::options::DbPath;
    use crate::types::{InternalKey, ValueType};
    use crate::util::comparator::InternalKeyComparator;
    use crate::version::{NewFileEntry, VersionEdit};
    use crate::wal::NoopWalArchiver;
    use bytes::Bytes;
    use std::path::Path;
    use tempfile::tempdir;

    /// StdEnv with a controllable clock.
    struct TestEnv {
        fs: StdEnv,
        now: AtomicU64,
    }

    impl TestEnv {
        fn new() -> Self {
            Self {
                fs: StdEnv::new(),
                now: AtomicU64::new(10_000_000),
            }
        }

        fn advance(&self, micros: u64) {
            self.now.fetch_add(micros, Ordering::SeqCst);
        }
    }

    impl Env for TestEnv {
        fn get_children(&self, dir: &Path) -> crate::Result<Vec<String>> {
            self.fs.get_children(dir)
        }

        fn delete_file(&self, path: &Path) -> crate::Result<()> {
            self.fs.delete_file(path)
        }

        fn file_exists(&self, path: &Path) -> bool {
            self.fs.file_exists(path)
        }

        fn now_micros(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }
    }

    struct Harness {
        env: Arc<TestEnv>,
        versions: Arc<VersionSet>,
        wal: Arc<WalSet>,
        retention: Arc<TwoPhaseLogRetention>,
        resolver: ObsoleteFileResolver,
    }

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

    fn harness(db_path: &Path, configure: impl FnOnce(&mut Options)) -> Harness {
        let mut options = Options::default();
        options.db_paths = vec![DbPath::new(db_path, 0)];
        options.force_consistency_checks = true;
        configure(&mut options);
        let options = Arc::new(options);

        let env = Arc::new(TestEnv::new());
        let table_cache = Arc::new(TableCache::new(
            Arc::new(MockOpener::new()) as Arc<dyn TableOpener>,
            100,
        ));
        let versions = Arc::new(VersionSet::new(
            Arc::clone(&options),
            InternalKeyComparator::default(),
            table_cache,
        ));
        let wal = Arc::new(WalSet::new());
        let retention = Arc::new(TwoPhaseLogRetention::new(options.allow_2pc));

        let env_dyn: Arc<dyn Env> = env.clone();
        let resolver = ObsoleteFileResolver::new(
            env_dyn,
            Arc::clone(&options),
            Arc::clone(&versions),
            Arc::clone(&wal),
            Arc::clone(&retention),
            Arc::new(NoopWalArchiver),
        );

        Harness {
            env,
            versions,
            wal,
            retention,
            resolver,
        }
    }

    fn init_manifest(versions: &VersionSet) {
        let mut edit = VersionEdit::new();
        edit.set_comparator(versions.comparator_name());
        edit.set_log_number(0);
        edit.set_next_file_number(versions.next_file_number());
        edit.set_last_sequence(0);
        versions.create_new_manifest(&edit).unwrap();
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_full_scan_classification() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |_| {});
        init_manifest(&h.versions);

        // Live table 100 via an installed version; 150 is an orphan.
        let mut edit = VersionEdit::new();
        edit.add_file(1, make_entry(100, b"a", b"m"));
        h.versions.log_and_apply(&mut edit).unwrap();

        // Pending output at 200: everything at or above stays.
        h.versions.register_pending_output(200);

        // WAL floor: logs 50 and up stay, 48 is the previous log.
        h.versions.set_log_number(50);
        h.wal.add_log(50);

        touch(dir.path(), "000030.log");
        touch(dir.path(), "000050.log");
        touch(dir.path(), "000100.sst");
        touch(dir.path(), "000150.sst");
        touch(dir.path(), "000250.sst");
        touch(dir.path(), "000200.dbtmp");
        touch(dir.path(), "MANIFEST-000001");
        // A newer manifest incarnation, as during a roll.
        touch(dir.path(), "MANIFEST-000009");

        let manifest_number = h.versions.manifest_number();
        assert!(manifest_number > 1);

        let ctx = h.resolver.find_obsolete_files(true, false);
        assert!(ctx.doing_the_full_scan);
        assert_eq!(ctx.min_pending_output, 200);
        assert!(ctx.sst_live.contains(&100));
        assert_eq!(ctx.log_number, 50);

        h.resolver.purge_obsolete_files(ctx, false);

        // Obsolete log, orphan table below the watermark, and the
        // superseded manifest are gone.
        assert!(!dir.path().join("000030.log").exists());
        assert!(!dir.path().join("000150.sst").exists());
        assert!(!dir.path().join("MANIFEST-000001").exists());

        // Everything else stays.
        assert!(dir.path().join("000050.log").exists());
        assert!(dir.path().join("000100.sst").exists());
        assert!(dir.path().join("000250.sst").exists());
        assert!(dir.path().join("000200.dbtmp").exists());
        assert!(dir
            .path()
            .join(crate::util::filename::descriptor_file_name(manifest_number))
            .exists());
        assert!(dir.path().join("MANIFEST-000009").exists());
    }

    #[test]
    fn test_old_manifest_deleted() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |_| {});
        init_manifest(&h.versions);

        touch(dir.path(), "MANIFEST-000000");

        let ctx = h.resolver.find_obsolete_files(true, false);
        h.resolver.purge_obsolete_files(ctx, false);

        assert!(!dir.path().join("MANIFEST-000000").exists());
    }

    #[test]
    fn test_no_full_scan_skips_listing() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |_| {});
        init_manifest(&h.versions);

        touch(dir.path(), "000150.sst");

        let ctx = h.resolver.find_obsolete_files(true, true);
        assert!(!ctx.doing_the_full_scan);
        assert!(ctx.full_scan_candidate_files.is_empty());

        // The orphan survives: only the builder's deletion log is trusted.
        h.resolver.purge_obsolete_files(ctx, false);
        assert!(dir.path().join("000150.sst").exists());
    }

    #[test]
    fn test_scan_period_gating() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |options| {
            options.delete_obsolete_files_period_micros = 1_000_000;
        });
        init_manifest(&h.versions);

        // First unforced call scans (last run is long past).
        let ctx = h.resolver.find_obsolete_files(false, false);
        assert!(ctx.doing_the_full_scan);

        // Within the period: no scan.
        h.env.advance(10);
        let ctx = h.resolver.find_obsolete_files(false, false);
        assert!(!ctx.doing_the_full_scan);

        // After the period elapses: scan again.
        h.env.advance(2_000_000);
        let ctx = h.resolver.find_obsolete_files(false, false);
        assert!(ctx.doing_the_full_scan);

        // Force overrides the period.
        let ctx = h.resolver.find_obsolete_files(true, false);
        assert!(ctx.doing_the_full_scan);
    }

    #[test]
    fn test_disable_file_deletions() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |_| {});
        init_manifest(&h.versions);

        touch(dir.path(), "000150.sst");

        h.resolver.disable_file_deletions();
        let ctx = h.resolver.find_obsolete_files(true, false);
        assert_eq!(ctx.manifest_file_number, 0);
        h.resolver.purge_obsolete_files(ctx, false);
        assert!(dir.path().join("000150.sst").exists());

        h.resolver.enable_file_deletions();
        h.resolver.delete_obsolete_files();
        assert!(!dir.path().join("000150.sst").exists());
    }

    #[test]
    fn test_wal_recycling_keeps_files() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |options| {
            options.recycle_log_file_num = 1;
        });
        init_manifest(&h.versions);

        h.versions.set_log_number(4);
        for n in 1..=4 {
            h.wal.add_log(n);
        }
        touch(dir.path(), "000001.log");
        touch(dir.path(), "000002.log");
        touch(dir.path(), "000003.log");
        touch(dir.path(), "000004.log");

        let ctx = h.resolver.find_obsolete_files(true, false);
        assert_eq!(ctx.log_recycle_files, vec![1]);
        assert_eq!(ctx.log_delete_files, vec![2, 3]);

        h.resolver.purge_obsolete_files(ctx, false);

        // The recycled log survives, the rest are deleted.
        assert!(dir.path().join("000001.log").exists());
        assert!(!dir.path().join("000002.log").exists());
        assert!(!dir.path().join("000003.log").exists());
        assert!(dir.path().join("000004.log").exists());
    }

    #[test]
    fn test_schedule_only_defers_deletions() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |_| {});
        init_manifest(&h.versions);

        touch(dir.path(), "000150.sst");

        let ctx = h.resolver.find_obsolete_files(true, false);
        h.resolver.purge_obsolete_files(ctx, true);

        assert!(dir.path().join("000150.sst").exists());
        assert_eq!(h.resolver.pending_purge_count(), 1);

        h.resolver.service_pending_purges();
        assert!(!dir.path().join("000150.sst").exists());
        assert_eq!(h.resolver.pending_purge_count(), 0);
    }

    #[test]
    fn test_2pc_floor_protects_logs() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |options| {
            options.allow_2pc = true;
        });
        init_manifest(&h.versions);

        // Version floor says 50, but log 20 still holds an outstanding
        // prepared section.
        h.versions.set_log_number(50);
        h.retention.tracker().mark_log_containing_prep_section(20);
        for n in [20, 30, 50] {
            h.wal.add_log(n);
        }
        touch(dir.path(), "000020.log");
        touch(dir.path(), "000030.log");
        touch(dir.path(), "000050.log");

        let ctx = h.resolver.find_obsolete_files(true, false);
        assert_eq!(ctx.log_number, 20);

        h.resolver.purge_obsolete_files(ctx, false);
        assert!(dir.path().join("000020.log").exists());
        assert!(dir.path().join("000030.log").exists());
        assert!(dir.path().join("000050.log").exists());
    }

    #[test]
    fn test_info_log_retention() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path(), |options| {
            options.keep_log_file_num = 2;
        });
        init_manifest(&h.versions);

        touch(dir.path(), "LOG");
        touch(dir.path(), "LOG.old.100");
        touch(dir.path(), "LOG.old.200");
        touch(dir.path(), "LOG.old.300");
        touch(dir.path(), "LOG.old.400");

        let ctx = h.resolver.find_obsolete_files(true, false);
        h.resolver.purge_obsolete_files(ctx, false);

        // 4 old logs, keep 2: the oldest two go.
        assert!(dir.path().join("LOG").exists());
        assert!(!dir.path().join("LOG.old.100").exists());
        assert!(!dir.path().join("LOG.old.200").exists());
        assert!(dir.path().join("LOG.old.300").exists());
        assert!(dir.path().join("LOG.old.400").exists());
    }

    #[test]
    fn test_wal_archival_instead_of_delete() {
        struct CollectingArchiver {
            archived: Mutex<Vec<u64>>,
        }

        impl WalArchiver for CollectingArchiver {
            fn archive_wal_file(&self, _path: &Path, number: u64) -> crate::Result<()> {
                self.archived.lock().push(number);
                Ok(())
            }

            fn purge_obsolete_wal_files(&self) -> crate::Result<()> {
                Ok(())
            }
        }

        let dir = tempdir().unwrap();
        let mut options = Options::default();
        options.db_paths = vec![DbPath::new(dir.path(), 0)];
        options.wal_ttl_seconds = 60;
        let options = Arc::new(options);

        let env = Arc::new(TestEnv::new());
        let table_cache = Arc::new(TableCache::new(
            Arc::new(MockOpener::new()) as Arc<dyn TableOpener>,
            100,
        ));
        let versions = Arc::new(VersionSet::new(
            Arc::clone(&options),
            InternalKeyComparator::default(),
            table_cache,
        ));
        init_manifest(&versions);
        let wal = Arc::new(WalSet::new());
        let retention = Arc::new(TwoPhaseLogRetention::new(false));
        let archiver = Arc::new(CollectingArchiver {
            archived: Mutex::new(Vec::new()),
        });

        let archiver_dyn: Arc<dyn WalArchiver> = archiver.clone();
        let resolver = ObsoleteFileResolver::new(
            env,
            Arc::clone(&options),
            Arc::clone(&versions),
            Arc::clone(&wal),
            retention,
            archiver_dyn,
        );

        versions.set_log_number(10);
        wal.add_log(5);
        wal.add_log(10);
        touch(dir.path(), "000005.log");

        let ctx = resolver.find_obsolete_files(true, false);
        resolver.purge_obsolete_files(ctx, false);

        // The log was routed to the archiver, not deleted here.
        assert_eq!(*archiver.archived.lock(), vec![5]);
        assert!(dir.path().join("000005.log").exists());
    }

    #[test]
    fn test_live_table_in_second_path() {
        let dir = tempdir().unwrap();
        let fast = tempdir().unwrap();
        let h = harness(dir.path(), |options| {
            options.db_paths.push(DbPath::new(fast.path(), 0));
        });
        init_manifest(&h.versions);

        // Orphan in the secondary path.
        touch(fast.path(), "000150.sst");

        let ctx = h.resolver.find_obsolete_files(true, false);
        let found = ctx
            .full_scan_candidate_files
            .iter()
            .any(|c| c.file_name == "/000150.sst" && c.path_id == 1);
        assert!(found);

        h.resolver.purge_obsolete_files(ctx, false);
        assert!(!fast.path().join("000150.sst").exists());
    }
}
