//! Helper functions for eBPF programs
//!
//! Provides wrappers around BPF helpers and the atomic counter update
//! shared by both entry points.

use aya_ebpf::{bindings::BPF_NOEXIST, helpers::bpf_get_current_uid_gid, maps::HashMap};
use core::sync::atomic::{AtomicU64, Ordering};
use exec_monitor_common::types::*;

/// Get the real uid of the current task
#[inline(always)]
pub fn get_uid() -> Uid {
    uid_from_uid_gid(bpf_get_current_uid_gid())
}

/// Outcome of a successful counter update
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// Key already existed and was incremented
    Existing,
    /// Key was created with a count of 1
    Created,
}

/// Atomically add one to `map[key]`, creating the entry if needed
///
/// Existing entries are bumped in place with an atomic add so concurrent
/// callers on other CPUs never lose an update. A missing entry is created
/// with BPF_NOEXIST; if another CPU created it first the insert fails and
/// we fall back to the atomic add.
#[inline(always)]
pub fn increment(map: &HashMap<u32, u64>, key: u32) -> Result<Increment, i64> {
    if let Some(ptr) = map.get_ptr_mut(&key) {
        atomic_add_one(ptr);
        return Ok(Increment::Existing);
    }

    if map.insert(&key, &1, BPF_NOEXIST as u64).is_ok() {
        return Ok(Increment::Created);
    }

    // Either we raced with another insert or the map is full
    let ptr = map.get_ptr_mut(&key).ok_or(-1i64)?;
    atomic_add_one(ptr);
    Ok(Increment::Existing)
}

#[inline(always)]
fn atomic_add_one(ptr: *mut u64) {
    // SAFETY: ptr comes from a successful map lookup and stays valid for
    // the duration of the program run
    let counter = unsafe { AtomicU64::from_ptr(ptr) };
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Increment a statistics counter
#[inline(always)]
pub fn increment_stat(stat_id: u32) {
    use crate::maps::STATS;

    let _ = increment(&STATS, stat_id);
}
