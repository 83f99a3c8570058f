//! Counter store access
//!
//! The counter map lives in the kernel and is only written by the eBPF
//! program. Userspace gets a narrow read interface over it.

use crate::{
    error::MonitorError,
    types::{ExecCount, Uid, UserCounterEntry},
};
use aya::maps::{HashMap, Map, MapData, MapError};
use std::{collections::HashMap as StdHashMap, sync::Arc, sync::Mutex};

/// Read access to a uid -> count store
pub trait CounterStore {
    /// Current count for `uid`, `None` if the uid was never observed
    fn get(&self, uid: Uid) -> Result<Option<ExecCount>, MonitorError>;

    /// Full copy of the store
    ///
    /// No ordering is guaranteed; see [`crate::types::Snapshot`].
    fn snapshot(&self) -> Result<Vec<UserCounterEntry>, MonitorError>;
}

impl<T: CounterStore + ?Sized> CounterStore for Arc<T> {
    fn get(&self, uid: Uid) -> Result<Option<ExecCount>, MonitorError> {
        (**self).get(uid)
    }

    fn snapshot(&self) -> Result<Vec<UserCounterEntry>, MonitorError> {
        (**self).snapshot()
    }
}

/// Counter map owned by the loaded eBPF program
pub struct KernelCounterStore {
    map: HashMap<MapData, Uid, ExecCount>,
}

impl KernelCounterStore {
    /// Wrap the EXEC_COUNTS map taken from the eBPF object
    pub fn new(map: Map) -> Result<Self, MonitorError> {
        let map = HashMap::try_from(map)
            .map_err(|e| MonitorError::Map(format!("EXEC_COUNTS is not a u32 -> u64 hash map: {}", e)))?;
        Ok(Self { map })
    }
}

impl CounterStore for KernelCounterStore {
    fn get(&self, uid: Uid) -> Result<Option<ExecCount>, MonitorError> {
        match self.map.get(&uid, 0) {
            Ok(count) => Ok(Some(count)),
            Err(MapError::KeyNotFound) => Ok(None),
            Err(e) => Err(MonitorError::Map(format!("lookup of uid {} failed: {}", uid, e))),
        }
    }

    fn snapshot(&self) -> Result<Vec<UserCounterEntry>, MonitorError> {
        self.map
            .iter()
            .map(|item| item.map(UserCounterEntry::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MonitorError::Map(format!("failed to iterate EXEC_COUNTS: {}", e)))
    }
}

/// In-process counter store
///
/// Test double for the kernel map; mirrors the kernel program's update rule.
#[derive(Default)]
pub struct MemoryCounterStore {
    counts: Mutex<StdHashMap<Uid, ExecCount>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count for `uid`
    pub fn upsert(&self, uid: Uid, count: ExecCount) {
        self.lock().insert(uid, count);
    }

    /// Count one event for `uid`, returning the new count
    ///
    /// Same rule as the kernel callback: read (absent = 0), add one, write.
    pub fn record(&self, uid: Uid) -> ExecCount {
        let mut counts = self.lock();
        let count = counts.entry(uid).or_insert(0);
        *count += 1;
        *count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StdHashMap<Uid, ExecCount>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&self, uid: Uid) -> Result<Option<ExecCount>, MonitorError> {
        Ok(self.lock().get(&uid).copied())
    }

    fn snapshot(&self) -> Result<Vec<UserCounterEntry>, MonitorError> {
        Ok(self
            .lock()
            .iter()
            .map(|(&uid, &count)| UserCounterEntry { uid, count })
            .collect())
    }
}
