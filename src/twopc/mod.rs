//! Two-phase-commit WAL retention.
//!
//! A prepared transaction may sit in the WAL before reaching a memtable, or
//! in a memtable before reaching an SST, so two overlapping structures
//! decide how far back WALs must be kept:
//!
//! - **PrepTracker**: a min-heap of WAL numbers holding prepared sections,
//!   with a companion completion-count map used to tombstone entries whose
//!   sections have since been flushed
//! - **ColumnFamilyLogView**: per-family minimum prep-log numbers reported
//!   by the active and immutable memtables
//!
//! The tracker has its own lock: flush callbacks update it without holding
//! any other subsystem lock.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

#[derive(Default)]
struct PrepHeapState {
    heap: BinaryHeap<Reverse<u64>>,
    /// Per-log count of prepared sections whose commit has been flushed.
    /// A positive count tombstones that many heap entries for the log.
    completed: HashMap<u64, u64>,
}

/// Tracks WAL numbers containing prepared-but-uncommitted sections.
#[derive(Default)]
pub struct PrepTracker {
    state: Mutex<PrepHeapState>,
}

impl PrepTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Note that `log` contains a prepared section.
    pub fn mark_log_containing_prep_section(&self, log: u64) {
        assert!(log != 0);
        let mut state = self.state.lock();
        state.heap.push(Reverse(log));
        state.completed.entry(log).or_insert(0);
    }

    /// Note that one prepared section in `log` has been flushed to an SST.
    pub fn mark_log_with_prep_section_flushed(&self, log: u64) {
        assert!(log != 0);
        let mut state = self.state.lock();
        let count = state
            .completed
            .get_mut(&log)
            .expect("log was never marked as containing a prep section");
        *count += 1;
    }

    /// The smallest WAL number still holding an outstanding prepared
    /// section, or 0 when none remain.
    ///
    /// Tombstoned heap tops (completion count > 0) are popped lazily on the
    /// way to the answer.
    pub fn find_min_log_containing_outstanding_prep(&self) -> u64 {
        let mut state = self.state.lock();

        loop {
            let min_log = match state.heap.peek() {
                Some(&Reverse(min_log)) => min_log,
                None => return 0,
            };

            let tombstoned = match state.completed.get_mut(&min_log) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    true
                }
                _ => false,
            };

            if tombstoned {
                state.heap.pop();
            } else {
                return min_log;
            }
        }
    }
}

/// Per-column-family view of the minimum WAL numbers referenced by
/// prepared sections still living in memtables.
///
/// 0 means "no prepared sections".
pub trait ColumnFamilyLogView: Send + Sync {
    /// Whether the column family has been dropped.
    fn is_dropped(&self) -> bool;

    /// Minimum prep-log number referenced by the active memtable.
    fn min_prep_log_memtable(&self) -> u64;

    /// Minimum prep-log number referenced by the immutable memtable list.
    fn min_prep_log_immutable(&self) -> u64;
}

/// Computes the WAL retention floor under two-phase commit.
pub struct TwoPhaseLogRetention {
    allow_2pc: bool,
    tracker: PrepTracker,
    views: RwLock<Vec<Arc<dyn ColumnFamilyLogView>>>,
}

impl TwoPhaseLogRetention {
    /// Create the retention machinery. With `allow_2pc` off, every query
    /// returns the version set's floor unchanged.
    pub fn new(allow_2pc: bool) -> Self {
        Self {
            allow_2pc,
            tracker: PrepTracker::new(),
            views: RwLock::new(Vec::new()),
        }
    }

    /// The prepared-section tracker.
    pub fn tracker(&self) -> &PrepTracker {
        &self.tracker
    }

    /// Register a column family's memtable view.
    pub fn register_view(&self, view: Arc<dyn ColumnFamilyLogView>) {
        self.views.write().push(view);
    }

    /// Minimum WAL holding an outstanding prepared section, or 0.
    pub fn find_min_log_containing_outstanding_prep(&self) -> u64 {
        if !self.allow_2pc {
            return 0;
        }
        self.tracker.find_min_log_containing_outstanding_prep()
    }

    /// Minimum prep-log referenced by any non-dropped family's memtables,
    /// or 0.
    pub fn find_min_prep_log_referenced_by_memtables(&self) -> u64 {
        if !self.allow_2pc {
            return 0;
        }

        let mut min_log = 0u64;
        for view in self.views.read().iter() {
            if view.is_dropped() {
                continue;
            }

            for log in [view.min_prep_log_immutable(), view.min_prep_log_memtable()] {
                if log > 0 && (min_log == 0 || log < min_log) {
                    min_log = log;
                }
            }
        }
        min_log
    }

    /// The WAL retention floor: the version set's minimum log, lowered by
    /// outstanding prepared sections and memtable-resident prep sections.
    ///
    /// The prep heap is consulted before the memtables because a log can
    /// move from the heap into a memtable concurrently; checking in the
    /// other order could miss it in both.
    pub fn min_log_number_to_keep(&self, versions_min_log: u64) -> u64 {
        let mut log_number = versions_min_log;

        if self.allow_2pc {
            let min_log_in_prep_heap = self.find_min_log_containing_outstanding_prep();
            if min_log_in_prep_heap != 0 && min_log_in_prep_heap < log_number {
                log_number = min_log_in_prep_heap;
            }

            let min_log_refed_by_mem = self.find_min_prep_log_referenced_by_memtables();
            if min_log_refed_by_mem != 0 && min_log_refed_by_mem < log_number {
                log_number = min_log_refed_by_mem;
            }
        }

        log_number
    }
}
