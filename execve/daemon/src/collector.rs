//! Run summary collection
//!
//! Tracks what the reporter has seen over the lifetime of the daemon so a
//! summary can be logged on shutdown.

use crate::types::{ExecCount, Snapshot, Uid};
use serde::{Deserialize, Serialize};

/// Summary of a reporter run
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Timer cycles completed
    pub cycles: u64,
    /// Reports written to the output
    pub reports: u64,
    /// Cycles skipped because the map could not be read
    pub failed_snapshots: u64,
    /// Distinct users in the last snapshot
    pub users: u64,
    /// Total calls in the last snapshot
    pub total_execs: u64,
    /// User with the most calls in the last snapshot
    pub top_user: Option<(Uid, ExecCount)>,
}

/// Summary collector fed by the reporter loop
#[derive(Default)]
pub struct SummaryCollector {
    summary: RunSummary,
}

impl SummaryCollector {
    /// Create a new summary collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot that was written out
    pub fn add_snapshot(&mut self, snapshot: &Snapshot) {
        self.summary.cycles += 1;
        self.summary.reports += 1;
        self.summary.users = snapshot.len() as u64;
        self.summary.total_execs = snapshot.total();
        // Ties go to the lowest uid
        self.summary.top_user = snapshot
            .entries()
            .iter()
            .rev()
            .max_by_key(|e| e.count)
            .map(|e| (e.uid, e.count));
    }

    /// Record a cycle whose map read failed
    pub fn add_failure(&mut self) {
        self.summary.cycles += 1;
        self.summary.failed_snapshots += 1;
    }

    /// Get number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.summary.cycles
    }

    /// Get number of written reports
    pub fn reports(&self) -> u64 {
        self.summary.reports
    }

    /// Get the summary so far
    pub fn summary(&self) -> RunSummary {
        self.summary.clone()
    }
}
