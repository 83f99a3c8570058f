//! Shared constants for the exec-monitor probe
//!
//! These constants are used by both kernel and userspace programs
//! to ensure consistency in naming and limits.

// ============================================================================
// BPF Map Sizes
// ============================================================================

/// Maximum number of distinct user ids tracked in the counter map
pub const MAX_USERS: u32 = 10240;

/// Total number of statistics counters
pub const MAX_STATS: u32 = 3;

// ============================================================================
// Object Names
// ============================================================================

/// Counter map: uid -> number of observed calls
pub const EXEC_COUNTS_MAP: &str = "EXEC_COUNTS";

/// Probe health counters (see STAT_* indices)
pub const STATS_MAP: &str = "STATS";

/// Counting program attached as a kprobe on the syscall wrapper
pub const KPROBE_PROGRAM: &str = "record_exec";

/// Counting program attached to the syscalls:sys_enter_* tracepoint
pub const TRACEPOINT_PROGRAM: &str = "record_exec_tp";

// ============================================================================
// Statistics Counter Indices (for STATS map)
// ============================================================================

/// Number of times the counting callback ran
pub const STAT_TOTAL_EVENTS: u32 = 0;

/// Number of user ids seen for the first time
pub const STAT_NEW_USERS: u32 = 1;

/// Number of events that could not be recorded (e.g. map full)
pub const STAT_UPDATE_FAILURES: u32 = 2;

// ============================================================================
// Defaults
// ============================================================================

/// Syscall monitored when none is given
pub const DEFAULT_SYSCALL: &str = "execve";

/// Report period in seconds
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 1;

/// Longest accepted report period (one day)
pub const MAX_REPORT_INTERVAL_SECS: u64 = 86_400;
