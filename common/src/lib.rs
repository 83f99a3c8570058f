//! Shared types and constants for the exec-monitor probe
//!
//! This crate is used by both the eBPF kernel program and the userspace
//! daemon so that map names, map sizes and key layout stay in sync.

#![cfg_attr(not(test), no_std)]

pub mod constants;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use types::{uid_from_uid_gid, ExecCount, Uid};
