//! Userspace type definitions
//!
//! Defines the data structures used by the daemon for reporting.
//!
//! ## Organization
//!
//! - **Kernel Types**: map key/value layout and object names (from exec_monitor_common)
//! - **Userspace Types**: snapshots and statistics built from map reads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Kernel Types (from eBPF programs)
// ============================================================================

pub mod kernel {
    //! Types shared between the kernel eBPF program and userspace
    //!
    //! These are re-exported from the exec-monitor-common crate and must
    //! match the map definitions of the eBPF program.

    pub use exec_monitor_common::constants;
    pub use exec_monitor_common::types::{ExecCount, Uid};
}

pub use kernel::{ExecCount, Uid};

/// One row of the counter map
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserCounterEntry {
    /// User id of the calling task
    pub uid: Uid,
    /// Number of observed calls
    pub count: ExecCount,
}

impl UserCounterEntry {
    pub fn new(uid: Uid, count: ExecCount) -> Self {
        Self { uid, count }
    }
}

impl From<(Uid, ExecCount)> for UserCounterEntry {
    fn from((uid, count): (Uid, ExecCount)) -> Self {
        Self { uid, count }
    }
}

/// Point-in-time copy of the counter map, ordered by uid
///
/// The store hands out entries in whatever order the kernel iterates
/// them; this type is where the ascending numeric order is imposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    taken_at: DateTime<Utc>,
    entries: Vec<UserCounterEntry>,
}

impl Snapshot {
    /// Build a snapshot stamped with the current time
    pub fn from_entries(entries: Vec<UserCounterEntry>) -> Self {
        Self::at(Utc::now(), entries)
    }

    /// Build a snapshot with an explicit timestamp
    pub fn at(taken_at: DateTime<Utc>, mut entries: Vec<UserCounterEntry>) -> Self {
        // uid is the map key, so there is nothing to tie-break
        entries.sort_unstable_by_key(|e| e.uid);
        Self { taken_at, entries }
    }

    /// Entries in ascending uid order
    pub fn entries(&self) -> &[UserCounterEntry] {
        &self.entries
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Count for a single uid
    pub fn get(&self, uid: Uid) -> Option<ExecCount> {
        self.entries
            .binary_search_by_key(&uid, |e| e.uid)
            .ok()
            .map(|i| self.entries[i].count)
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Probe health counters read from the STATS map
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProbeStats {
    /// Number of times the counting callback ran
    pub total_events: u64,
    /// Number of user ids seen for the first time
    pub new_users: u64,
    /// Number of events that could not be recorded
    pub update_failures: u64,
}

impl ProbeStats {
    /// Build stats from `(stat_id, value)` pairs
    ///
    /// Unknown stat ids are ignored.
    pub fn from_counters<I>(counters: I) -> Self
    where
        I: IntoIterator<Item = (u32, u64)>,
    {
        use kernel::constants::*;

        let mut stats = Self::default();
        for (id, value) in counters {
            match id {
                STAT_TOTAL_EVENTS => stats.total_events = value,
                STAT_NEW_USERS => stats.new_users = value,
                STAT_UPDATE_FAILURES => stats.update_failures = value,
                _ => {}
            }
        }
        stats
    }
}
