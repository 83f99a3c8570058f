//! Key and value layout of the counter map
//!
//! The map is keyed by the real user id of the calling task and holds a
//! plain `u64` counter, so no `repr(C)` wrapper is needed on either side.

/// User id key (lower 32 bits of `bpf_get_current_uid_gid`)
pub type Uid = u32;

/// Per-user call counter
pub type ExecCount = u64;

/// Extract the uid from the combined value returned by `bpf_get_current_uid_gid`
#[inline(always)]
pub fn uid_from_uid_gid(uid_gid: u64) -> Uid {
    (uid_gid & 0xFFFF_FFFF) as Uid
}

// Map keys and values are copied byte-wise between kernel and userspace
const _: () = {
    assert!(core::mem::size_of::<Uid>() == 4);
    assert!(core::mem::size_of::<ExecCount>() == 8);
};
