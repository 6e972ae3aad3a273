//! Drain processors for the two queue collections
//!
//! [`QueueProcessor`] drains pending requests in priority order with an
//! attempt ceiling. [`SyncDataProcessor`] drains unsynced domain records to
//! their record-type endpoints with no ceiling. Each processor runs at most
//! one pass at a time; an overlapping trigger returns a skipped report.

mod queue;
mod report;
mod sync_data;

pub use queue::QueueProcessor;
pub use report::{DrainReport, ProcessorStats};
pub use sync_data::SyncDataProcessor;
