//! # slicedb
//!
//! The version and file-lifecycle core of an LSM-tree storage engine with
//! file slices.
//!
//! ## What lives here
//!
//! - **Versions**: immutable snapshots of the table-file set, built from
//!   incremental edits produced by flushes and compactions
//! - **File slices**: logical sub-ranges of a table file owned by a level
//!   without rewriting the file, with deferred merges once fan-out grows
//! - **File lifecycle**: reference-counted metadata, a pending-output
//!   watermark, and an obsolete-file resolver deciding keep vs. delete vs.
//!   recycle for every on-disk file
//! - **2PC WAL retention**: the floor below which write-ahead logs must
//!   survive because of prepared-but-uncommitted transactions
//!
//! Block-level SST reading and writing, memtables, and compaction picking
//! are external collaborators reached through the `TableOpener`,
//! `InternalIterator`, and `ColumnFamilyLogView` seams.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use slicedb::{Options, VersionEdit, VersionSet};
//!
//! let versions = VersionSet::new(options, icmp, table_cache);
//! versions.recover()?;
//!
//! // A flush produced table 12 at level 0.
//! let mut edit = VersionEdit::new();
//! edit.add_file(0, new_file_entry);
//! versions.log_and_apply(&mut edit)?;
//! ```

// Public modules
pub mod env;
pub mod error;
pub mod options;
pub mod types;

// Internal modules
mod cache;
mod cleaner;
mod iterator;
mod metrics;
mod twopc;
mod util;
mod version;
mod wal;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use options::{CompactionOptionsTwoPc, DbPath, Options, SyncMode};
pub use types::{InternalKey, SequenceNumber, ValueType};

// Environment
pub use env::{Env, StdEnv};

// Versions
pub use version::{
    database_exists, FileMetadata, FileSlice, FileSliceRecord, LevelStats, MergeTask,
    MergeTaskSet, NewFileEntry, ObsoleteSst, VersionBuilder, VersionEdit, VersionSet,
    VersionStorage,
};

// Cleaner
pub use cleaner::{CandidateFile, ObsoleteFileResolver, PurgeJobContext};

// Two-phase commit retention
pub use twopc::{ColumnFamilyLogView, PrepTracker, TwoPhaseLogRetention};

// WAL bookkeeping
pub use wal::{AliveLogFile, NoopWalArchiver, WalArchiver, WalSet};

// Caches and reader seams
pub use cache::{CacheStats, LruCache, TableCache, TableHandle, TableOpener, TableReader};

// Iterators
pub use iterator::{FileSliceIterator, InternalIterator};

// Metrics
pub use metrics::{CompactionIoMetrics, Counter, Gauge};

// Comparators and file naming
pub use util::comparator::{BytewiseComparator, Comparator, InternalKeyComparator};
pub use util::filename::{parse_file_name, FileType};
