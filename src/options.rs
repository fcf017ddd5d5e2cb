//! Configuration options for slicedb.

use std::path::PathBuf;

/// Default number of LSM levels.
pub const DEFAULT_NUM_LEVELS: usize = 7;

/// Default minimum interval between full obsolete-file scans (6 hours).
pub const DEFAULT_DELETE_OBSOLETE_FILES_PERIOD_MICROS: u64 = 6 * 60 * 60 * 1_000_000;

/// Default number of info log files kept before age-based deletion.
pub const DEFAULT_KEEP_LOG_FILE_NUM: usize = 1000;

/// Default number of worker threads opening table handles.
pub const DEFAULT_MAX_FILE_OPENING_THREADS: usize = 16;

/// A configured storage directory for table files.
///
/// Table files carry a `path_id` indexing into `Options::db_paths`.
#[derive(Debug, Clone)]
pub struct DbPath {
    /// Directory path.
    pub path: PathBuf,
    /// Soft target for total bytes placed in this directory.
    pub target_size: u64,
}

impl DbPath {
    /// Create a new path entry.
    pub fn new(path: impl Into<PathBuf>, target_size: u64) -> Self {
        Self {
            path: path.into(),
            target_size,
        }
    }
}

/// Options controlling file-slice compaction.
#[derive(Debug, Clone)]
pub struct CompactionOptionsTwoPc {
    /// First level at which slices may be produced.
    pub start_level: usize,
    /// A file holding more slices than this schedules a deferred merge.
    pub merge_threshold: usize,
}

impl Default for CompactionOptionsTwoPc {
    fn default() -> Self {
        Self {
            start_level: 1,
            merge_threshold: 5,
        }
    }
}

/// Manifest sync mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Sync on every record (safest, slowest).
    Always,
    /// Sync after N bytes written.
    Bytes {
        /// Number of bytes before sync.
        bytes: usize,
    },
    /// Let OS decide when to sync.
    None,
}

impl Default for SyncMode {
    fn default() -> Self {
        SyncMode::Always
    }
}

/// Configuration for the version and file-lifecycle subsystem.
#[derive(Debug, Clone)]
pub struct Options {
    // === Layout ===
    /// Number of LSM levels.
    pub num_levels: usize,

    /// Storage directories for table files. The first entry is the primary
    /// database directory; must not be empty.
    pub db_paths: Vec<DbPath>,

    /// Directory holding WAL files. Defaults to the primary db path.
    pub wal_dir: Option<PathBuf>,

    /// Directory holding info log files. Defaults to the primary db path.
    pub db_log_dir: Option<PathBuf>,

    // === Obsolete-file resolution ===
    /// Minimum interval between full directory scans, in microseconds.
    /// 0 means scan on every call.
    pub delete_obsolete_files_period_micros: u64,

    /// Cap on WAL files kept aside for recycling instead of deletion.
    pub recycle_log_file_num: usize,

    /// WAL time-to-live; non-zero switches WAL deletion to archival.
    pub wal_ttl_seconds: u64,

    /// WAL archive size limit in MB; non-zero switches WAL deletion to
    /// archival.
    pub wal_size_limit_mb: u64,

    /// Number of info log files retained.
    pub keep_log_file_num: usize,

    // === Version builder ===
    /// Run consistency checks in release builds too.
    pub force_consistency_checks: bool,

    /// Worker threads used when opening table handles for new files.
    pub max_file_opening_threads: usize,

    /// Capacity of the table handle cache.
    pub max_open_files: usize,

    // === Two-phase commit ===
    /// Enable the WAL prepared-section retention machinery.
    pub allow_2pc: bool,

    /// File-slice compaction options.
    pub compaction_options_2pc: CompactionOptionsTwoPc,

    // === Durability ===
    /// Manifest sync mode.
    pub sync_mode: SyncMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            num_levels: DEFAULT_NUM_LEVELS,
            db_paths: vec![DbPath::new("", 0)],
            wal_dir: None,
            db_log_dir: None,
            delete_obsolete_files_period_micros: DEFAULT_DELETE_OBSOLETE_FILES_PERIOD_MICROS,
            recycle_log_file_num: 0,
            wal_ttl_seconds: 0,
            wal_size_limit_mb: 0,
            keep_log_file_num: DEFAULT_KEEP_LOG_FILE_NUM,
            force_consistency_checks: false,
            max_file_opening_threads: DEFAULT_MAX_FILE_OPENING_THREADS,
            max_open_files: 1000,
            allow_2pc: false,
            compaction_options_2pc: CompactionOptionsTwoPc::default(),
            sync_mode: SyncMode::default(),
        }
    }
}

impl Options {
    /// Create options rooted at the given primary database directory.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_paths: vec![DbPath::new(db_path, 0)],
            ..Default::default()
        }
    }

    /// The primary database directory.
    pub fn primary_path(&self) -> &PathBuf {
        &self.db_paths[0].path
    }

    /// Directory for WAL files.
    pub fn wal_path(&self) -> &PathBuf {
        self.wal_dir.as_ref().unwrap_or_else(|| self.primary_path())
    }

    /// Directory for info log files.
    pub fn info_log_path(&self) -> &PathBuf {
        self.db_log_dir
            .as_ref()
            .unwrap_or_else(|| self.primary_path())
    }

    /// Whether deleted WAL files are archived rather than removed.
    pub fn wal_archival_enabled(&self) -> bool {
        self.wal_ttl_seconds > 0 || self.wal_size_limit_mb > 0
    }

    /// Validate the options.
    pub fn validate(&self) -> crate::Result<()> {
        if self.num_levels < 2 {
            return Err(crate::Error::InvalidConfiguration(
                "num_levels must be at least 2".into(),
            ));
        }

        if self.db_paths.is_empty() {
            return Err(crate::Error::InvalidConfiguration(
                "db_paths must not be empty".into(),
            ));
        }

        if self.max_file_opening_threads == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "max_file_opening_threads must be at least 1".into(),
            ));
        }

        if self.keep_log_file_num == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "keep_log_file_num must be at least 1".into(),
            ));
        }

        if self.compaction_options_2pc.merge_threshold == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "merge_threshold must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
