//! eBPF exec monitor - Kernel Space Program
//!
//! Counts syscall entries (execve by default) per calling user id.
//! The userspace daemon attaches exactly one of the two entry points
//! below and periodically reads the counter map.
//!
//! ## Architecture
//!
//! ```text
//! execve() entry -> record_exec / record_exec_tp
//!                   |
//!                   v
//!                   EXEC_COUNTS[uid] += 1   (atomic)
//!                   |
//!                   v
//! Userspace      -> iterate EXEC_COUNTS every interval, sort, print
//! ```
//!
//! ## Usage
//!
//! This program must be compiled for the bpfel-unknown-none target:
//!
//! ```bash
//! cargo +nightly build --release --target=bpfel-unknown-none -Z build-std=core
//! ```
//!
//! The compiled object is then loaded by the userspace daemon.

#![no_std]
#![no_main]

mod handlers;
mod helpers;
mod maps;

// Re-export entry points so they're visible to the loader
pub use handlers::{record_exec, record_exec_tp};

// Re-export maps for verification
pub use maps::{EXEC_COUNTS, STATS};

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    // The verifier rejects any reachable panic path
    loop {}
}
