//! Command line interface
//!
//! Every flag has a default, so running the binary without arguments
//! counts execve per uid and prints once a second until killed.

use crate::{exporter::ExporterType, loader::AttachMode, reporter::ReporterConfig};
use anyhow::Result;
use clap::Parser;
use exec_monitor_common::constants::{
    DEFAULT_REPORT_INTERVAL_SECS, DEFAULT_SYSCALL, MAX_REPORT_INTERVAL_SECS,
};
use std::{path::PathBuf, time::Duration};

/// Per-user execve accounting using eBPF
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Seconds between reports
    #[clap(short, long, env = "EXEC_MONITOR_INTERVAL", default_value_t = DEFAULT_REPORT_INTERVAL_SECS)]
    pub interval: u64,

    /// Syscall to count
    #[clap(short, long, env = "EXEC_MONITOR_SYSCALL", default_value = DEFAULT_SYSCALL)]
    pub syscall: String,

    /// How to hook the syscall entry
    #[clap(short, long, value_enum, env = "EXEC_MONITOR_ATTACH", default_value_t = AttachMode::Kprobe)]
    pub attach: AttachMode,

    /// Report format
    #[clap(short, long, value_enum, env = "EXEC_MONITOR_FORMAT", default_value_t = ExporterType::Text)]
    pub format: ExporterType,

    /// Stop after this many reports (0 = run until interrupted)
    #[clap(short, long, default_value_t = 0)]
    pub count: u64,

    /// Path to eBPF object file (if not embedded)
    #[clap(long, env = "EXEC_MONITOR_EBPF_OBJECT")]
    pub ebpf_object: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Reject values clap cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            anyhow::bail!("Interval must be >= 1 second");
        }
        if self.interval > MAX_REPORT_INTERVAL_SECS {
            anyhow::bail!("Interval must be <= {} seconds", MAX_REPORT_INTERVAL_SECS);
        }
        if self.syscall.is_empty() {
            anyhow::bail!("Syscall name must not be empty");
        }
        Ok(())
    }

    /// Reporter settings derived from the arguments
    pub fn reporter_config(&self) -> ReporterConfig {
        ReporterConfig {
            period: Duration::from_secs(self.interval),
            max_reports: (self.count > 0).then_some(self.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["exec-monitor"]).unwrap();

        assert_eq!(args.interval, 1);
        assert_eq!(args.syscall, "execve");
        assert_eq!(args.attach, AttachMode::Kprobe);
        assert_eq!(args.format, ExporterType::Text);
        assert_eq!(args.count, 0);
        assert_eq!(args.ebpf_object, None);
        assert!(!args.verbose);
        assert!(args.validate().is_ok());
        assert_eq!(args.reporter_config(), ReporterConfig::default());
    }

    #[test]
    fn test_env_fallbacks_declared() {
        use clap::CommandFactory;
        let command = Args::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_env())
                .map(|e| e.to_string_lossy().into_owned())
        };

        assert_eq!(env_of("interval").as_deref(), Some("EXEC_MONITOR_INTERVAL"));
        assert_eq!(env_of("syscall").as_deref(), Some("EXEC_MONITOR_SYSCALL"));
        assert_eq!(env_of("attach").as_deref(), Some("EXEC_MONITOR_ATTACH"));
        assert_eq!(env_of("format").as_deref(), Some("EXEC_MONITOR_FORMAT"));
        assert_eq!(env_of("ebpf_object").as_deref(), Some("EXEC_MONITOR_EBPF_OBJECT"));
        assert_eq!(env_of("count"), None);
    }

    #[test]
    fn test_full_flags() {
        let args = Args::try_parse_from([
            "exec-monitor",
            "-i",
            "5",
            "--attach",
            "tracepoint",
            "--format",
            "json",
            "-c",
            "10",
            "--ebpf-object",
            "/tmp/exec-monitor.o",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.attach, AttachMode::Tracepoint);
        assert_eq!(args.format, ExporterType::Json);
        assert_eq!(args.ebpf_object, Some(PathBuf::from("/tmp/exec-monitor.o")));
        assert!(args.verbose);
        assert_eq!(
            args.reporter_config(),
            ReporterConfig {
                period: Duration::from_secs(5),
                max_reports: Some(10),
            }
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let args = Args::try_parse_from(["exec-monitor", "--interval", "0"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_interval_upper_bound() {
        let day = MAX_REPORT_INTERVAL_SECS.to_string();
        let args = Args::try_parse_from(["exec-monitor", "--interval", day.as_str()]).unwrap();
        assert!(args.validate().is_ok());

        let args =
            Args::try_parse_from(["exec-monitor", "--interval", "18446744073709551615"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Args::try_parse_from(["exec-monitor", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
