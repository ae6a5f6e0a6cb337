//! Counters kept by the reactor. Plain integers: only the loop thread
//! touches them.

use ingest_core::log_info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Connections admitted into the table
    pub accepted: u64,
    /// Connections closed at admission because the table was full
    pub rejected: u64,
    /// Records appended to the sink
    pub records: u64,
    pub bytes_in: u64,
    /// Admitted connections torn down
    pub closed: u64,
    /// Unexpected read errors (fatal or dropped, per policy)
    pub read_errors: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admitted and not yet torn down.
    pub fn live(&self) -> u64 {
        self.accepted - self.closed
    }

    pub fn print(&self) {
        log_info!(
            "stats: live={} accepted={} rejected={} records={} bytes_in={} closed={} read_errors={}",
            self.live(),
            self.accepted,
            self.rejected,
            self.records,
            self.bytes_in,
            self.closed,
            self.read_errors,
        );
    }
}
