//! eBPF program loader
//!
//! Handles loading the exec counting program, attaching it to the
//! resolved syscall entry point and handing out its maps.

use crate::{
    error::MonitorError,
    resolver,
    store::KernelCounterStore,
    types::ProbeStats,
};
use anyhow::{Context, Result};
use aya::{
    maps::HashMap,
    programs::{
        kprobe::KProbeLinkId, trace_point::TracePointLinkId, KProbe, ProgramError, TracePoint,
    },
    Bpf, BpfError,
};
use exec_monitor_common::constants::*;
use log::{debug, info, warn};
use std::path::PathBuf;

/// How the counting program is hooked to the syscall
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AttachMode {
    /// kprobe on the arch syscall wrapper found in kallsyms
    Kprobe,
    /// syscalls:sys_enter_<name> tracepoint
    Tracepoint,
}

enum AttachLink {
    Kprobe(KProbeLinkId),
    Tracepoint(TracePointLinkId),
}

/// An active attachment of the counting program
struct ProbeAttachment {
    /// Kernel function or `category:name` tracepoint the program runs on
    target: String,
    link: AttachLink,
}

/// eBPF program loader and manager
pub struct ProbeLoader {
    ebpf: Bpf,
    attachment: Option<ProbeAttachment>,
}

impl ProbeLoader {
    /// Load eBPF program from file or embedded bytecode
    ///
    /// # Arguments
    ///
    /// * `path` - Optional path to eBPF object file. If None, uses embedded bytecode.
    ///
    /// # Returns
    ///
    /// ProbeLoader instance with the object parsed and its maps created
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        info!("Loading eBPF program...");

        let ebpf = if let Some(obj_path) = path {
            info!("Loading eBPF object from: {:?}", obj_path);
            let data = std::fs::read(&obj_path).map_err(|e| {
                MonitorError::Compile(format!("failed to read eBPF object file {:?}: {}", obj_path, e))
            })?;
            Bpf::load(&data).map_err(load_error)?
        } else {
            #[cfg(feature = "embedded")]
            {
                info!("Loading embedded eBPF program...");
                Bpf::load(aya::include_bytes_aligned!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/../kernel/target/bpfel-unknown-none/release/exec-monitor"
                )))
                .map_err(load_error)?
            }
            #[cfg(not(feature = "embedded"))]
            {
                return Err(MonitorError::Compile(
                    "no eBPF object file provided; use --ebpf-object or build with the 'embedded' feature"
                        .to_string(),
                )
                .into());
            }
        };

        info!("eBPF program loaded successfully");

        Ok(Self {
            ebpf,
            attachment: None,
        })
    }

    /// Attach the counting program to `syscall`
    ///
    /// Resolves the syscall name for the chosen mode, loads the matching
    /// program into the kernel (running the verifier) and attaches it.
    pub fn attach(&mut self, mode: AttachMode, syscall: &str) -> Result<()> {
        if self.attachment.is_some() {
            anyhow::bail!("counting program is already attached");
        }

        let attachment = match mode {
            AttachMode::Kprobe => self.attach_kprobe(syscall)?,
            AttachMode::Tracepoint => self.attach_tracepoint(syscall)?,
        };
        info!("  ✓ Attached to {}", attachment.target);

        self.attachment = Some(attachment);
        Ok(())
    }

    fn attach_kprobe(&mut self, syscall: &str) -> Result<ProbeAttachment> {
        let fn_name = resolver::resolve_kprobe(syscall)?;
        info!("Attaching kprobe for {} ({})...", syscall, fn_name);

        let program: &mut KProbe = self
            .ebpf
            .program_mut(KPROBE_PROGRAM)
            .ok_or_else(|| missing_program(KPROBE_PROGRAM))?
            .try_into()
            .with_context(|| format!("Failed to get {} as KProbe", KPROBE_PROGRAM))?;
        program
            .load()
            .map_err(|e| program_load_error(KPROBE_PROGRAM, e))?;
        let link = program.attach(&fn_name, 0).map_err(|e| {
            MonitorError::Attachment(format!("failed to attach kprobe to {}: {}", fn_name, e))
        })?;

        Ok(ProbeAttachment {
            target: fn_name,
            link: AttachLink::Kprobe(link),
        })
    }

    fn attach_tracepoint(&mut self, syscall: &str) -> Result<ProbeAttachment> {
        let tracepoint = resolver::resolve_tracepoint(syscall)?;
        info!("Attaching tracepoint {}...", tracepoint);

        let program: &mut TracePoint = self
            .ebpf
            .program_mut(TRACEPOINT_PROGRAM)
            .ok_or_else(|| missing_program(TRACEPOINT_PROGRAM))?
            .try_into()
            .with_context(|| format!("Failed to get {} as TracePoint", TRACEPOINT_PROGRAM))?;
        program
            .load()
            .map_err(|e| program_load_error(TRACEPOINT_PROGRAM, e))?;
        let link = program
            .attach(&tracepoint.category, &tracepoint.name)
            .map_err(|e| {
                MonitorError::Attachment(format!("failed to attach tracepoint {}: {}", tracepoint, e))
            })?;

        Ok(ProbeAttachment {
            target: tracepoint.to_string(),
            link: AttachLink::Tracepoint(link),
        })
    }

    /// Kernel function or tracepoint the program is attached to, if any
    pub fn attached_target(&self) -> Option<&str> {
        self.attachment.as_ref().map(|a| a.target.as_str())
    }

    /// Detach the counting program
    ///
    /// Dropping the loader detaches as well; this makes shutdown explicit
    /// and surfaces errors. No-op when nothing is attached.
    pub fn detach(&mut self) -> Result<()> {
        let Some(attachment) = self.attachment.take() else {
            return Ok(());
        };

        match attachment.link {
            AttachLink::Kprobe(link) => {
                let program: &mut KProbe = self
                    .ebpf
                    .program_mut(KPROBE_PROGRAM)
                    .ok_or_else(|| missing_program(KPROBE_PROGRAM))?
                    .try_into()?;
                program.detach(link).context("Failed to detach kprobe")?;
            }
            AttachLink::Tracepoint(link) => {
                let program: &mut TracePoint = self
                    .ebpf
                    .program_mut(TRACEPOINT_PROGRAM)
                    .ok_or_else(|| missing_program(TRACEPOINT_PROGRAM))?
                    .try_into()?;
                program.detach(link).context("Failed to detach tracepoint")?;
            }
        }

        info!("Detached from {}", attachment.target);
        Ok(())
    }

    /// Take ownership of the counter map
    ///
    /// Can only be called once; the map stays alive as long as the store.
    pub fn counter_store(&mut self) -> Result<KernelCounterStore> {
        let map = self
            .ebpf
            .take_map(EXEC_COUNTS_MAP)
            .with_context(|| format!("{} map not found in eBPF object", EXEC_COUNTS_MAP))?;

        Ok(KernelCounterStore::new(map)?)
    }

    /// Read the probe health counters
    pub fn read_stats(&self) -> Result<ProbeStats> {
        let map = self
            .ebpf
            .map(STATS_MAP)
            .with_context(|| format!("{} map not found in eBPF object", STATS_MAP))?;
        let stats: HashMap<_, u32, u64> = HashMap::try_from(map)
            .with_context(|| format!("Failed to open {} as HashMap", STATS_MAP))?;

        let counters = stats
            .iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MonitorError::Map(format!("failed to iterate {}: {}", STATS_MAP, e)))?;

        Ok(ProbeStats::from_counters(counters))
    }
}

impl Drop for ProbeLoader {
    fn drop(&mut self) {
        if let Err(e) = self.detach() {
            warn!("Failed to detach on drop: {:#}", e);
        }
    }
}

/// Remove the locked memory limit
///
/// Needed on kernels without memcg-based accounting for BPF maps,
/// see https://lwn.net/Articles/837122/
pub fn bump_memlock_rlimit() {
    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!("remove limit on locked memory failed, ret is: {}", ret);
    }
}

fn missing_program(name: &str) -> MonitorError {
    MonitorError::Compile(format!("{} program not found in eBPF object", name))
}

fn load_error(e: BpfError) -> MonitorError {
    match e {
        // Map creation is the first privileged syscall
        BpfError::MapError(e) => {
            MonitorError::Attachment(format!("failed to create eBPF maps (missing privileges?): {}", e))
        }
        e => MonitorError::Compile(format!("failed to load eBPF program: {}", e)),
    }
}

// EACCES and EINVAL come from the verifier; only EPERM means missing CAP_BPF
fn program_load_error(name: &str, e: ProgramError) -> MonitorError {
    match &e {
        ProgramError::LoadError { io_error, .. } if io_error.raw_os_error() == Some(libc::EPERM) => {
            MonitorError::Attachment(format!("not permitted to load {}: {}", name, e))
        }
        _ => MonitorError::Compile(format!("{} rejected by the kernel: {}", name, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aya_obj::VerifierLog;
    use clap::ValueEnum;
    use std::io;

    fn prog_load_failure(errno: i32, log: &str) -> ProgramError {
        ProgramError::LoadError {
            io_error: io::Error::from_raw_os_error(errno),
            verifier_log: VerifierLog::new(log.to_string()),
        }
    }

    #[test]
    fn test_missing_object_is_compile_error() {
        let err = ProbeLoader::load(Some(PathBuf::from("/nonexistent/exec-monitor.o")))
            .err()
            .unwrap();

        assert!(matches!(
            err.downcast_ref::<MonitorError>(),
            Some(MonitorError::Compile(_))
        ));
    }

    #[test]
    fn test_garbage_object_is_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.o");
        std::fs::write(&path, b"not an elf file").unwrap();

        let err = ProbeLoader::load(Some(path)).err().unwrap();

        assert!(matches!(
            err.downcast_ref::<MonitorError>(),
            Some(MonitorError::Compile(_))
        ));
    }

    #[test]
    fn test_verifier_rejection_is_compile_error() {
        let err = program_load_error(
            KPROBE_PROGRAM,
            prog_load_failure(libc::EACCES, "R1 invalid mem access 'scalar'"),
        );
        assert!(matches!(err, MonitorError::Compile(_)));
        assert!(err.to_string().contains("R1 invalid mem access"));

        let err = program_load_error(TRACEPOINT_PROGRAM, prog_load_failure(libc::EINVAL, ""));
        assert!(matches!(err, MonitorError::Compile(_)));
    }

    #[test]
    fn test_eperm_is_attachment_error() {
        let err = program_load_error(KPROBE_PROGRAM, prog_load_failure(libc::EPERM, ""));
        assert!(matches!(err, MonitorError::Attachment(_)));
    }

    #[test]
    fn test_attach_mode_names() {
        let names: Vec<String> = AttachMode::value_variants()
            .iter()
            .filter_map(|m| m.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();

        assert_eq!(names, vec!["kprobe", "tracepoint"]);
    }
}
