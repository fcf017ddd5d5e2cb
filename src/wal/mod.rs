//! WAL lifecycle bookkeeping.
//!
//! This module does not read or write log records; it tracks which WAL
//! files are alive, which are being fsynced, and which are set aside for
//! recycling, so the obsolete-file resolver can reap them safely.

use std::collections::VecDeque;
use std::path::Path;

use parking_lot::{Condvar, Mutex};
use tracing::info;

use crate::Result;

/// One live WAL file.
#[derive(Debug, Clone)]
pub struct AliveLogFile {
    /// WAL file number.
    pub number: u64,
    /// Bytes written so far.
    pub size: u64,
    /// Whether a sync of this log is in flight.
    pub getting_synced: bool,
}

/// Result of reaping obsolete WAL files.
#[derive(Debug, Default)]
pub struct ReapedLogs {
    /// Log numbers to delete.
    pub deleted: Vec<u64>,
    /// Log numbers newly moved to the recycle list.
    pub recycled: Vec<u64>,
    /// Total bytes of the reaped logs.
    pub size_reaped: u64,
    /// Total live WAL bytes before reaping.
    pub prev_total_log_size: u64,
    /// Number of alive logs before reaping.
    pub num_alive_log_files: usize,
}

#[derive(Default)]
struct WalSetInner {
    alive_logs: VecDeque<AliveLogFile>,
    total_log_size: u64,
    recycle_logs: Vec<u64>,
}

/// The set of live WAL files, oldest first.
///
/// Reaping waits on the sync condvar while the oldest log is being fsynced,
/// mirroring the writer side which signals after each sync completes.
#[derive(Default)]
pub struct WalSet {
    inner: Mutex<WalSetInner>,
    sync_cv: Condvar,
}

impl WalSet {
    /// Create an empty WAL set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly created log. Numbers must be added in increasing
    /// order.
    pub fn add_log(&self, number: u64) {
        let mut inner = self.inner.lock();
        debug_assert!(inner
            .alive_logs
            .back()
            .map(|l| l.number < number)
            .unwrap_or(true));
        inner.alive_logs.push_back(AliveLogFile {
            number,
            size: 0,
            getting_synced: false,
        });
    }

    /// Record the current size of a log.
    pub fn record_log_size(&self, number: u64, size: u64) {
        let mut inner = self.inner.lock();
        if let Some(log) = inner.alive_logs.iter_mut().find(|l| l.number == number) {
            let old = log.size;
            log.size = size;
            inner.total_log_size = inner.total_log_size + size - old;
        }
    }

    /// Flag a log as having a sync in flight. Clearing the flag wakes any
    /// reaper waiting on it.
    pub fn set_getting_synced(&self, number: u64, syncing: bool) {
        let mut inner = self.inner.lock();
        if let Some(log) = inner.alive_logs.iter_mut().find(|l| l.number == number) {
            log.getting_synced = syncing;
        }
        if !syncing {
            self.sync_cv.notify_all();
        }
    }

    /// The oldest alive log number, if any.
    pub fn min_alive_log(&self) -> Option<u64> {
        self.inner.lock().alive_logs.front().map(|l| l.number)
    }

    /// Numbers of all alive logs, oldest first.
    pub fn alive_log_numbers(&self) -> Vec<u64> {
        self.inner.lock().alive_logs.iter().map(|l| l.number).collect()
    }

    /// Total bytes across alive logs.
    pub fn total_log_size(&self) -> u64 {
        self.inner.lock().total_log_size
    }

    /// Snapshot of the recycle list.
    pub fn recycle_logs(&self) -> Vec<u64> {
        self.inner.lock().recycle_logs.clone()
    }

    /// Take a recycled log for reuse.
    pub fn take_recycled_log(&self) -> Option<u64> {
        let mut inner = self.inner.lock();
        if inner.recycle_logs.is_empty() {
            None
        } else {
            Some(inner.recycle_logs.remove(0))
        }
    }

    /// Pop every alive log older than `min_log_number`.
    ///
    /// Reaped logs go to the recycle list while it has room (capped by
    /// `recycle_log_file_num`), otherwise to the delete list. If the oldest
    /// log has a sync in flight, waits for the sync to finish and retries.
    pub fn reap_obsolete_logs(&self, min_log_number: u64, recycle_log_file_num: usize) -> ReapedLogs {
        let mut inner = self.inner.lock();

        let mut reaped = ReapedLogs {
            prev_total_log_size: inner.total_log_size,
            num_alive_log_files: inner.alive_logs.len(),
            ..Default::default()
        };

        loop {
            let getting_synced = match inner.alive_logs.front() {
                Some(front) if front.number < min_log_number => front.getting_synced,
                _ => break,
            };

            if getting_synced {
                self.sync_cv.wait(&mut inner);
                // The deque may have changed while we were waiting.
                continue;
            }

            let earliest = inner.alive_logs.pop_front().unwrap();
            if recycle_log_file_num > inner.recycle_logs.len() {
                info!(log_number = earliest.number, "adding log to recycle list");
                inner.recycle_logs.push(earliest.number);
                reaped.recycled.push(earliest.number);
            } else {
                reaped.deleted.push(earliest.number);
            }
            reaped.size_reaped += earliest.size;
            inner.total_log_size -= earliest.size;

            // The current log has number >= min_log_number and stays.
            debug_assert!(!inner.alive_logs.is_empty());
        }

        reaped
    }
}

/// Archival hooks for WAL files, implemented by the external WAL manager.
pub trait WalArchiver: Send + Sync {
    /// Move a WAL file into the archive instead of deleting it.
    fn archive_wal_file(&self, path: &Path, number: u64) -> Result<()>;

    /// Apply TTL and size limits to the archive.
    fn purge_obsolete_wal_files(&self) -> Result<()>;
}

/// Archiver that drops nothing and archives nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWalArchiver;

impl WalArchiver for NoopWalArchiver {
    fn archive_wal_file(&self, _path: &Path, _number: u64) -> Result<()> {
        Ok(())
    }

    fn purge_obsolete_wal_files(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_and_sizes() {
        let wal = WalSet::new();
        wal.add_log(1);
        wal.add_log(2);
        wal.record_log_size(1, 100);
        wal.record_log_size(2, 50);

        assert_eq!(wal.min_alive_log(), Some(1));
        assert_eq!(wal.alive_log_numbers(), vec![1, 2]);
        assert_eq!(wal.total_log_size(), 150);

        wal.record_log_size(2, 80);
        assert_eq!(wal.total_log_size(), 180);
    }

    #[test]
    fn test_reap_splits_recycle_and_delete() {
        let wal = WalSet::new();
        for n in 1..=4 {
            wal.add_log(n);
            wal.record_log_size(n, 10);
        }

        // Logs 1..3 are obsolete; recycle capacity 2.
        let reaped = wal.reap_obsolete_logs(4, 2);

        assert_eq!(reaped.recycled, vec![1, 2]);
        assert_eq!(reaped.deleted, vec![3]);
        assert_eq!(reaped.size_reaped, 30);
        assert_eq!(reaped.prev_total_log_size, 40);
        assert_eq!(reaped.num_alive_log_files, 4);
        assert_eq!(wal.alive_log_numbers(), vec![4]);
        assert_eq!(wal.total_log_size(), 10);
        assert_eq!(wal.recycle_logs(), vec![1, 2]);
    }

    #[test]
    fn test_reap_nothing_below_floor() {
        let wal = WalSet::new();
        wal.add_log(5);
        let reaped = wal.reap_obsolete_logs(3, 0);
        assert!(reaped.deleted.is_empty());
        assert!(reaped.recycled.is_empty());
        assert_eq!(wal.alive_log_numbers(), vec![5]);
    }

    #[test]
    fn test_reap_waits_for_sync() {
        let wal = Arc::new(WalSet::new());
        wal.add_log(1);
        wal.add_log(2);
        wal.set_getting_synced(1, true);

        let reaper = {
            let wal = Arc::clone(&wal);
            std::thread::spawn(move || wal.reap_obsolete_logs(2, 0))
        };

        // Give the reaper a moment to block on the condvar, then finish
        // the sync.
        std::thread::sleep(std::time::Duration::from_millis(50));
        wal.set_getting_synced(1, false);

        let reaped = reaper.join().unwrap();
        assert_eq!(reaped.deleted, vec![1]);
        assert_eq!(wal.alive_log_numbers(), vec![2]);
    }

    #[test]
    fn test_take_recycled_log() {
        let wal = WalSet::new();
        wal.add_log(1);
        wal.add_log(2);
        wal.reap_obsolete_logs(2, 1);

        assert_eq!(wal.take_recycled_log(), Some(1));
        assert_eq!(wal.take_recycled_log(), None);
    }
}
