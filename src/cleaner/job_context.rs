//! State captured by one obsolete-file discovery pass.

use std::collections::HashSet;

use crate::version::ObsoleteSst;

/// One file name found by a full directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Slash-prefixed file name (no directory).
    pub file_name: String,
    /// Storage directory index the name was listed in.
    pub path_id: u32,
}

impl CandidateFile {
    /// Create a candidate, normalising the name with a leading slash.
    pub fn new(file_name: impl Into<String>, path_id: u32) -> Self {
        let mut file_name = file_name.into();
        if !file_name.starts_with('/') {
            file_name.insert(0, '/');
        }
        Self { file_name, path_id }
    }
}

/// Everything one discovery pass learned, handed to the purge step.
#[derive(Debug, Default)]
pub struct PurgeJobContext {
    /// Identifier for log correlation.
    pub job_id: u64,
    /// Whether a full directory scan was performed.
    pub doing_the_full_scan: bool,
    /// All files seen by the full scan, slash-prefixed.
    pub full_scan_candidate_files: Vec<CandidateFile>,
    /// Table files whose last reference was dropped.
    pub sst_delete_files: Vec<ObsoleteSst>,
    /// WAL numbers to delete.
    pub log_delete_files: Vec<u64>,
    /// WAL numbers currently parked for recycling.
    pub log_recycle_files: Vec<u64>,
    /// Manifest file names to delete.
    pub manifest_delete_files: Vec<String>,
    /// Every file number reachable from a live snapshot.
    pub sst_live: HashSet<u64>,
    /// Current manifest number; 0 means discovery never ran.
    pub manifest_file_number: u64,
    /// Manifest number being written during a roll, 0 otherwise.
    pub pending_manifest_file_number: u64,
    /// WAL retention floor (includes the 2PC adjustment).
    pub log_number: u64,
    /// Previous log number.
    pub prev_log_number: u64,
    /// Deletion watermark from the pending-output set.
    pub min_pending_output: u64,
    /// Bytes of WAL reaped this pass.
    pub size_log_to_delete: u64,
    /// Total live WAL bytes before reaping.
    pub prev_total_log_size: u64,
    /// Alive WAL count before reaping.
    pub num_alive_log_files: usize,
}

impl PurgeJobContext {
    /// Create an empty context for a job.
    pub fn new(job_id: u64) -> Self {
        Self {
            job_id,
            ..Default::default()
        }
    }

    /// Whether the purge step has any work.
    pub fn have_something_to_delete(&self) -> bool {
        !self.full_scan_candidate_files.is_empty()
            || !self.sst_delete_files.is_empty()
            || !self.log_delete_files.is_empty()
            || !self.manifest_delete_files.is_empty()
    }
}
