//! Syscall name resolution
//!
//! The kernel function behind a syscall changes with architecture and
//! kernel version (`__x64_sys_execve`, `__arm64_sys_execve`, `sys_execve`).
//! Resolution asks the running kernel through /proc/kallsyms instead of
//! hard-coding a name. Tracepoints are resolved against tracefs.

use crate::error::MonitorError;
use log::debug;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

/// Kernel symbol table
pub const KALLSYMS_PATH: &str = "/proc/kallsyms";

/// Mount points checked for tracefs, in order
pub const TRACEFS_ROOTS: &[&str] = &["/sys/kernel/tracing", "/sys/kernel/debug/tracing"];

/// Tracepoint category holding syscall entry/exit events
pub const SYSCALLS_CATEGORY: &str = "syscalls";

#[cfg(target_arch = "x86_64")]
const ARCH_SYSCALL_PREFIX: Option<&str> = Some("__x64_sys_");
#[cfg(target_arch = "aarch64")]
const ARCH_SYSCALL_PREFIX: Option<&str> = Some("__arm64_sys_");
#[cfg(target_arch = "riscv64")]
const ARCH_SYSCALL_PREFIX: Option<&str> = Some("__riscv_sys_");
#[cfg(target_arch = "s390x")]
const ARCH_SYSCALL_PREFIX: Option<&str> = Some("__s390x_sys_");
#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv64",
    target_arch = "s390x"
)))]
const ARCH_SYSCALL_PREFIX: Option<&str> = None;

/// Symbol prefixes tried for the running architecture, highest priority first
pub fn syscall_prefixes() -> Vec<&'static str> {
    ARCH_SYSCALL_PREFIX
        .into_iter()
        .chain(["__se_sys_", "sys_"])
        .collect()
}

/// Resolved tracepoint `category:name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracepointId {
    pub category: String,
    pub name: String,
}

impl std::fmt::Display for TracepointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

/// Resolve a syscall to the kernel function a kprobe should attach to
pub fn resolve_kprobe(syscall: &str) -> Result<String, MonitorError> {
    let file = File::open(KALLSYMS_PATH).map_err(|e| {
        MonitorError::Resolution(format!("failed to open {}: {}", KALLSYMS_PATH, e))
    })?;
    resolve_kprobe_from(BufReader::new(file), syscall, &syscall_prefixes())
}

/// Resolve against a kallsyms-formatted reader
///
/// Each line is `<address> <type> <symbol> [module]`. The first prefix in
/// `prefixes` whose `prefix + syscall` symbol appears wins.
pub fn resolve_kprobe_from<R: BufRead>(
    reader: R,
    syscall: &str,
    prefixes: &[&str],
) -> Result<String, MonitorError> {
    validate_syscall_name(syscall)?;

    let candidates: Vec<String> = prefixes.iter().map(|p| format!("{}{}", p, syscall)).collect();
    let mut best: Option<usize> = None;

    for line in reader.lines() {
        let line = line.map_err(|e| {
            MonitorError::Resolution(format!("failed to read kernel symbols: {}", e))
        })?;
        let Some(symbol) = line.split_whitespace().nth(2) else {
            continue;
        };

        if let Some(rank) = candidates.iter().position(|c| c == symbol) {
            if best.map_or(true, |b| rank < b) {
                best = Some(rank);
            }
            if rank == 0 {
                break;
            }
        }
    }

    match best {
        Some(rank) => {
            debug!("Resolved syscall {} to {}", syscall, candidates[rank]);
            Ok(candidates[rank].clone())
        }
        None => Err(MonitorError::Resolution(format!(
            "no kernel symbol for syscall '{}' (tried {})",
            syscall,
            candidates.join(", ")
        ))),
    }
}

/// Resolve a syscall to its `syscalls:sys_enter_<name>` tracepoint
pub fn resolve_tracepoint(syscall: &str) -> Result<TracepointId, MonitorError> {
    let roots: Vec<PathBuf> = TRACEFS_ROOTS.iter().map(PathBuf::from).collect();
    resolve_tracepoint_in(&roots, syscall)
}

/// Resolve against explicit tracefs roots
pub fn resolve_tracepoint_in<P: AsRef<Path>>(
    roots: &[P],
    syscall: &str,
) -> Result<TracepointId, MonitorError> {
    validate_syscall_name(syscall)?;

    let name = format!("sys_enter_{}", syscall);
    for root in roots {
        let event_dir = root.as_ref().join("events").join(SYSCALLS_CATEGORY).join(&name);
        if event_dir.is_dir() {
            debug!("Found tracepoint at {:?}", event_dir);
            return Ok(TracepointId {
                category: SYSCALLS_CATEGORY.to_string(),
                name,
            });
        }
    }

    Err(MonitorError::Resolution(format!(
        "tracepoint {}:{} not found (is tracefs mounted?)",
        SYSCALLS_CATEGORY, name
    )))
}

fn validate_syscall_name(syscall: &str) -> Result<(), MonitorError> {
    let valid = !syscall.is_empty()
        && syscall
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MonitorError::Resolution(format!("invalid syscall name '{}'", syscall)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    const KALLSYMS: &str = "\
ffffffff81000000 T _stext
ffffffff812c4e10 T __ia32_sys_execve
ffffffff812c4e60 T __x64_sys_execve
ffffffff812c4eb0 T __ia32_sys_execveat
ffffffff812c4f00 T __x64_sys_execveat
ffffffff812d0000 t __se_sys_clone
ffffffff812d1000 T sys_ni_syscall
ffffffffc0a01000 t nf_hook_slow\t[nf_tables]
";

    const PREFIXES: &[&str] = &["__x64_sys_", "__se_sys_", "sys_"];

    #[test]
    fn test_prefers_arch_wrapper() {
        let symbol = resolve_kprobe_from(Cursor::new(KALLSYMS), "execve", PREFIXES).unwrap();
        assert_eq!(symbol, "__x64_sys_execve");
    }

    #[test]
    fn test_exact_symbol_match() {
        // execve must not match execveat
        let symbol = resolve_kprobe_from(Cursor::new(KALLSYMS), "execveat", PREFIXES).unwrap();
        assert_eq!(symbol, "__x64_sys_execveat");
    }

    #[test]
    fn test_falls_back_to_lower_priority_prefix() {
        let symbol = resolve_kprobe_from(Cursor::new(KALLSYMS), "clone", PREFIXES).unwrap();
        assert_eq!(symbol, "__se_sys_clone");
    }

    #[test]
    fn test_legacy_kernel() {
        let kallsyms = "c0100000 T sys_execve\nc0100100 T sys_fork\n";
        let symbol = resolve_kprobe_from(Cursor::new(kallsyms), "execve", PREFIXES).unwrap();
        assert_eq!(symbol, "sys_execve");
    }

    #[test]
    fn test_unknown_syscall() {
        let err = resolve_kprobe_from(Cursor::new(KALLSYMS), "frobnicate", PREFIXES).unwrap_err();
        assert!(matches!(err, MonitorError::Resolution(_)));
        assert!(err.to_string().contains("__x64_sys_frobnicate"));
    }

    #[test]
    fn test_invalid_name() {
        for name in ["", "exec ve", "../execve", "EXECVE"] {
            let err = resolve_kprobe_from(Cursor::new(KALLSYMS), name, PREFIXES).unwrap_err();
            assert!(matches!(err, MonitorError::Resolution(_)), "{:?}", name);
        }
    }

    #[test]
    fn test_arch_prefixes_end_with_generic() {
        let prefixes = syscall_prefixes();
        assert_eq!(prefixes.last(), Some(&"sys_"));
        #[cfg(target_arch = "x86_64")]
        assert_eq!(prefixes[0], "__x64_sys_");
    }

    #[test]
    fn test_tracepoint_found_in_second_root() {
        let missing = tempfile::tempdir().unwrap();
        let tracefs = tempfile::tempdir().unwrap();
        fs::create_dir_all(tracefs.path().join("events/syscalls/sys_enter_execve")).unwrap();

        let id = resolve_tracepoint_in(&[missing.path(), tracefs.path()], "execve").unwrap();

        assert_eq!(id.category, "syscalls");
        assert_eq!(id.name, "sys_enter_execve");
        assert_eq!(id.to_string(), "syscalls:sys_enter_execve");
    }

    #[test]
    fn test_tracepoint_missing() {
        let tracefs = tempfile::tempdir().unwrap();
        fs::create_dir_all(tracefs.path().join("events/syscalls/sys_enter_execve")).unwrap();

        let err = resolve_tracepoint_in(&[tracefs.path()], "execveat").unwrap_err();
        assert!(matches!(err, MonitorError::Resolution(_)));
    }
}
