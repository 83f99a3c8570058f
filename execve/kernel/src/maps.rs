//! BPF map definitions for exec accounting
//!
//! Both maps are plain hash maps read by userspace through map iteration.

use aya_ebpf::{macros::map, maps::HashMap};
use exec_monitor_common::{constants::*, types::*};

/// Per-user call counter
///
/// Key: uid of the calling task
/// Value: number of observed calls since the program was attached
///
/// Entries are only ever created or incremented here; the map goes
/// away together with the program when the daemon exits.
#[map]
pub static EXEC_COUNTS: HashMap<Uid, ExecCount> =
    HashMap::with_max_entries(MAX_USERS, 0);

/// Statistics counter map
///
/// Tracks probe health.
/// Key: stat_id (see STAT_* constants)
/// Value: u64 counter
#[map]
pub static STATS: HashMap<u32, u64> =
    HashMap::with_max_entries(MAX_STATS, 0);
