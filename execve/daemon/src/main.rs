//! eBPF exec monitor - Userspace Program
//!
//! Loads the exec counting program, attaches it to the syscall entry
//! point and prints the per-user counters once per interval.
//!
//! ## Usage
//!
//! ```bash
//! # Count execve per uid, one line per second, until interrupted
//! sudo ./exec-monitor --ebpf-object path/to/exec-monitor.o
//!
//! # Ten JSON reports, five seconds apart
//! sudo ./exec-monitor --interval 5 --count 10 --format json
//!
//! # Use the syscalls tracepoint instead of a kprobe
//! sudo ./exec-monitor --attach tracepoint
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use exec_monitor::{
    cli::Args,
    collector::RunSummary,
    loader::{self, ProbeLoader},
    reporter::Reporter,
    types::ProbeStats,
};
use log::{info, warn};
use std::io;
use tokio::signal::{
    self,
    unix::{signal as unix_signal, SignalKind},
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    args.validate()?;

    info!("Starting eBPF exec monitor...");
    info!("   Syscall: {}", args.syscall);
    info!("   Attach: {:?}", args.attach);
    info!("   Interval: {} seconds", args.interval);
    info!("   Format: {:?}", args.format);
    info!(
        "   Reports: {}",
        if args.count == 0 {
            "infinite".to_string()
        } else {
            args.count.to_string()
        }
    );

    loader::bump_memlock_rlimit();

    // Load eBPF program
    let mut loader = ProbeLoader::load(args.ebpf_object.clone())?;

    // Attach to the syscall entry
    loader.attach(args.attach, &args.syscall)?;

    let store = loader.counter_store()?;

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    info!(
        "Counting {} calls per user via {}...",
        args.syscall,
        loader.attached_target().unwrap_or("?")
    );

    let mut reporter = Reporter::new(
        store,
        args.format.exporter(),
        io::stdout(),
        args.reporter_config(),
    );
    let result = reporter.run(shutdown).await;

    let stats = match loader.read_stats() {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!("Failed to read probe statistics: {:#}", e);
            None
        }
    };

    if let Err(e) = loader.detach() {
        warn!("{:#}", e);
    }

    let summary = result.context("Failed to write report")?;
    print_summary(&summary, stats.as_ref());

    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = match unix_signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                if signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, shutting down...");
                }
                shutdown.cancel();
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Interrupted, shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Terminated, shutting down...");
            }
        }
        shutdown.cancel();
    });
}

fn print_summary(summary: &RunSummary, stats: Option<&ProbeStats>) {
    info!("");
    info!("============================================");
    info!("             Summary Report");
    info!("============================================");
    info!("");
    info!("  Reports written:    {}", summary.reports);
    if summary.failed_snapshots > 0 {
        info!("  Skipped reports:    {}", summary.failed_snapshots);
    }
    info!("  Distinct users:     {}", summary.users);
    info!("  Total calls:        {}", summary.total_execs);
    if let Some((uid, count)) = summary.top_user {
        info!("  Busiest user:       {} ({} calls)", uid, count);
    }
    if let Some(stats) = stats {
        info!("");
        info!("  Probe statistics:");
        info!("    events:          {:>8}", stats.total_events);
        info!("    new users:       {:>8}", stats.new_users);
        info!("    update failures: {:>8}", stats.update_failures);
        if stats.update_failures > 0 {
            warn!("Some calls were not counted; the counter map may be full");
        }
    }
    info!("");
    info!("============================================");
}
