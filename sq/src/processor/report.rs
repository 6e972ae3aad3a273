//! Drain pass results and cumulative processor statistics

use serde::{Deserialize, Serialize};

/// Outcome of a single drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Items handed to the transport
    pub processed: usize,
    pub succeeded: usize,
    /// Failed but kept for a later pass
    pub failed: usize,
    /// Failed and evicted at the attempt ceiling
    pub dropped: usize,
    /// Still inside their retry delay
    pub skipped_not_due: usize,
    /// The pass did not run because another was in progress
    pub skipped: bool,
}

impl DrainReport {
    /// Report for a trigger that overlapped a running pass
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Check whether the pass touched nothing
    pub fn is_empty(&self) -> bool {
        self.processed == 0 && self.skipped_not_due == 0
    }

    /// Combine two reports (request pass + sync data pass)
    pub fn merge(self, other: DrainReport) -> Self {
        Self {
            processed: self.processed + other.processed,
            succeeded: self.succeeded + other.succeeded,
            failed: self.failed + other.failed,
            dropped: self.dropped + other.dropped,
            skipped_not_due: self.skipped_not_due + other.skipped_not_due,
            skipped: self.skipped && other.skipped,
        }
    }
}

/// Totals accumulated across every pass of one processor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorStats {
    pub total_passes: u64,
    pub total_skipped_passes: u64,
    pub total_synced: u64,
    pub total_failed: u64,
    pub total_dropped: u64,
}

impl ProcessorStats {
    pub(crate) fn record(&mut self, report: &DrainReport) {
        if report.skipped {
            self.total_skipped_passes += 1;
            return;
        }
        self.total_passes += 1;
        self.total_synced += report.succeeded as u64;
        self.total_failed += report.failed as u64;
        self.total_dropped += report.dropped as u64;
    }

    /// Combine the totals of both processors
    pub fn merge(self, other: ProcessorStats) -> Self {
        Self {
            total_passes: self.total_passes + other.total_passes,
            total_skipped_passes: self.total_skipped_passes + other.total_skipped_passes,
            total_synced: self.total_synced + other.total_synced,
            total_failed: self.total_failed + other.total_failed,
            total_dropped: self.total_dropped + other.total_dropped,
        }
    }
}
