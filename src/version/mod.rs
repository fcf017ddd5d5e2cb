//! Version management: the metadata machinery tracking which table files
//! constitute the database.
//!
//! - **FileMetadata / FileSlice**: identity, key ranges, reference counts
//! - **VersionStorage**: one immutable snapshot with per-level ordering and
//!   a frozen set for sliced-up parents
//! - **VersionEdit**: delta between two consecutive snapshots
//! - **VersionBuilder**: applies edits over a base snapshot, enforcing the
//!   level invariants and scheduling deferred slice merges
//! - **Manifest**: append-only log of edits for recovery
//! - **VersionSet**: the current version, file numbers, pending outputs,
//!   and the obsolete-file feed
//!
//! # File organization
//!
//! ```text
//! Level 0:  [SST-9] [SST-8] [SST-7]        (overlapping keys, newest first)
//! Level 1:  [SST-4][SST-5][SST-6]          (non-overlapping, sorted)
//! Level 2:  [SST-1][SST-2][SST-3]          (non-overlapping, sorted)
//! Frozen:   {SST-0}                        (kept alive by slices only)
//! ```

mod builder;
mod edit;
mod file_metadata;
mod manifest;
mod merge;
mod storage;
mod version_set;

pub use builder::VersionBuilder;
pub use edit::{FileSliceRecord, NewFileEntry, VersionEdit};
pub use file_metadata::{by_smallest_key, newest_first_by_seqno, FileMetadata, FileSlice};
pub use manifest::{
    manifest_file_path, parse_manifest_filename, read_current_manifest, set_current_file, Manifest,
    ManifestReader, ManifestWriter,
};
pub use merge::{MergeTask, MergeTaskSet};
pub use storage::{LevelStats, VersionStorage};
pub use version_set::{database_exists, ObsoleteSst, VersionSet};

/// Tag values for encoding VersionEdit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EditTag {
    /// Comparator name.
    Comparator = 1,
    /// Log number.
    LogNumber = 2,
    /// Previous log number.
    PrevLogNumber = 3,
    /// Next file number.
    NextFileNumber = 4,
    /// Last sequence number.
    LastSequence = 5,
    /// Manifest number.
    ManifestNumber = 6,
    /// Deleted file (level, file_number).
    DeletedFile = 7,
    /// New file (level, metadata).
    NewFile = 8,
    /// File moved to the frozen set (level, file_number).
    FrozenFile = 9,
    /// New file slice (level, slice record).
    FileSlice = 10,
}

impl EditTag {
    /// Create from byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(EditTag::Comparator),
            2 => Some(EditTag::LogNumber),
            3 => Some(EditTag::PrevLogNumber),
            4 => Some(EditTag::NextFileNumber),
            5 => Some(EditTag::LastSequence),
            6 => Some(EditTag::ManifestNumber),
            7 => Some(EditTag::DeletedFile),
            8 => Some(EditTag::NewFile),
            9 => Some(EditTag::FrozenFile),
            10 => Some(EditTag::FileSlice),
            _ => None,
        }
    }

    /// Convert to byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}
