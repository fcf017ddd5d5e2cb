//! Metrics for the version and file-lifecycle subsystem.
//!
//! - **Counter / Gauge**: atomic primitives for event counts and sizes
//! - **CompactionIoMetrics**: byte accounting for slice-driven compaction,
//!   passed explicitly to the iterators that feed it

mod collector;

pub use collector::{Counter, Gauge};

use std::sync::Arc;

/// Byte accounting for slice-driven compaction I/O.
///
/// Passed explicitly to every consumer instead of living in process-global
/// state; cloneable handles share the same counters.
#[derive(Debug, Default, Clone)]
pub struct CompactionIoMetrics {
    /// Bytes read from compaction inputs.
    pub input_bytes: Arc<Counter>,
    /// Bytes written to compaction outputs.
    pub output_bytes: Arc<Counter>,
}

impl CompactionIoMetrics {
    /// Create a fresh metrics sink.
    pub fn new() -> Self {
        Self::default()
    }
}
