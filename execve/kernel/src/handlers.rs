//! Syscall entry handlers
//!
//! Both programs run the same counting logic; they only differ in how
//! they are attached.

use aya_ebpf::{
    macros::{kprobe, tracepoint},
    programs::{ProbeContext, TracePointContext},
};
use exec_monitor_common::constants::*;

use crate::{
    helpers::*,
    maps::*,
};

/// Count a syscall entry
///
/// Attached to: the arch syscall wrapper resolved from kallsyms
/// (e.g. `__x64_sys_execve`)
#[kprobe]
pub fn record_exec(_ctx: ProbeContext) -> u32 {
    match try_record_exec() {
        Ok(ret) => ret,
        Err(_) => 1,
    }
}

/// Count a syscall entry
///
/// Attached to: syscalls:sys_enter_<name>
#[tracepoint]
pub fn record_exec_tp(_ctx: TracePointContext) -> u32 {
    match try_record_exec() {
        Ok(ret) => ret,
        Err(_) => 1,
    }
}

#[inline(always)]
fn try_record_exec() -> Result<u32, i64> {
    increment_stat(STAT_TOTAL_EVENTS);

    let uid = get_uid();

    match increment(&EXEC_COUNTS, uid) {
        Ok(Increment::Created) => increment_stat(STAT_NEW_USERS),
        Ok(Increment::Existing) => {}
        Err(e) => {
            increment_stat(STAT_UPDATE_FAILURES);
            return Err(e);
        }
    }

    Ok(0)
}
