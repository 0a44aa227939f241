//! Throughput counters for a pipeline run.
//!
//! Plain relaxed atomics; workers bump them off the lock paths where
//! possible, and the pipeline folds a snapshot into its final report.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Blocks handed out by the read cursor.
    blocks_claimed: AtomicU64,
    /// Bytes claimed from the input.
    bytes_read: AtomicU64,
    /// Bytes committed to the output.
    bytes_written: AtomicU64,
    /// Times a worker parked because an earlier block was still unwritten.
    write_waits: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_claim(&self, bytes: u64) {
        self.blocks_claimed.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write_wait(&self) {
        self.write_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            blocks_claimed: self.blocks_claimed.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_waits: self.write_waits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub blocks_claimed: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub write_waits: u64,
}
