//! Deferred slice-merge scheduling.
//!
//! When a file accumulates more slices than `merge_threshold`, the builder
//! schedules a merge of the file's key range instead of rewriting data on
//! the spot. The task set is the surface the compaction scheduler polls.

use parking_lot::Mutex;

use crate::types::InternalKey;

/// A deferred merge of one file's key range at one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTask {
    level: usize,
    smallest: InternalKey,
    largest: InternalKey,
}

impl MergeTask {
    /// Create a merge task covering `[smallest, largest]` at `level`.
    pub fn new(level: usize, smallest: InternalKey, largest: InternalKey) -> Self {
        Self {
            level,
            smallest,
            largest,
        }
    }

    /// The level to merge at.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Smallest key of the range.
    pub fn smallest(&self) -> &InternalKey {
        &self.smallest
    }

    /// Largest key of the range.
    pub fn largest(&self) -> &InternalKey {
        &self.largest
    }
}

/// The set of pending merge tasks, shared with the compaction scheduler.
#[derive(Debug, Default)]
pub struct MergeTaskSet {
    tasks: Mutex<Vec<MergeTask>>,
}

impl MergeTaskSet {
    /// Create an empty task set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task unless an identical one is already pending.
    pub fn insert(&self, task: MergeTask) {
        let mut tasks = self.tasks.lock();
        if !tasks.contains(&task) {
            tasks.push(task);
        }
    }

    /// Drain all pending tasks.
    pub fn take_all(&self) -> Vec<MergeTask> {
        std::mem::take(&mut *self.tasks.lock())
    }

    /// Snapshot of the pending tasks.
    pub fn pending(&self) -> Vec<MergeTask> {
        self.tasks.lock().clone()
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Check whether no tasks are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
