//! Periodic report loop
//!
//! Reads the counter store once per period and writes one line per read.
//! The loop is a single task: cycles never overlap and nothing here
//! writes to the store.

use crate::{
    collector::{RunSummary, SummaryCollector},
    error::MonitorError,
    exporter::ReportExporter,
    store::CounterStore,
    types::Snapshot,
};
use exec_monitor_common::constants::DEFAULT_REPORT_INTERVAL_SECS;
use log::{debug, warn};
use std::{io::Write, time::Duration};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Reporter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Time between reports
    pub period: Duration,
    /// Stop after this many cycles (None = until cancelled)
    pub max_reports: Option<u64>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(DEFAULT_REPORT_INTERVAL_SECS),
            max_reports: None,
        }
    }
}

/// Report loop over a counter store
pub struct Reporter<S, W> {
    store: S,
    exporter: Box<dyn ReportExporter + Send>,
    out: W,
    config: ReporterConfig,
    collector: SummaryCollector,
}

impl<S: CounterStore, W: Write> Reporter<S, W> {
    /// Create a new reporter
    ///
    /// # Arguments
    ///
    /// * `store` - Counter store to read
    /// * `exporter` - Line format
    /// * `out` - Destination of report lines (stdout in the daemon)
    /// * `config` - Period and cycle limit
    pub fn new(
        store: S,
        exporter: Box<dyn ReportExporter + Send>,
        out: W,
        config: ReporterConfig,
    ) -> Self {
        Self {
            store,
            exporter,
            out,
            config,
            collector: SummaryCollector::new(),
        }
    }

    /// Run one reporting cycle without waiting
    ///
    /// Returns `Ok(false)` if the store could not be read; nothing is
    /// written for that cycle. Output failures are returned as errors.
    pub fn report_once(&mut self) -> Result<bool, MonitorError> {
        let entries = match self.store.snapshot() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping report: {}", e);
                self.collector.add_failure();
                return Ok(false);
            }
        };

        let snapshot = Snapshot::from_entries(entries);
        self.exporter.export(&snapshot, &mut self.out)?;
        self.out.flush()?;

        self.collector.add_snapshot(&snapshot);
        Ok(true)
    }

    /// Report every period until `shutdown` is cancelled
    ///
    /// The first report is written one full period after the call. Stops
    /// early once `max_reports` cycles have run.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<RunSummary, MonitorError> {
        let period = self.config.period;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Reporter cancelled after {} cycles", self.collector.cycles());
                    break;
                }
                _ = ticker.tick() => {}
            }

            self.report_once()?;

            if let Some(max) = self.config.max_reports {
                if self.collector.cycles() >= max {
                    debug!("Reached report limit of {}", max);
                    break;
                }
            }
        }

        Ok(self.summary())
    }

    /// Summary of the run so far
    pub fn summary(&self) -> RunSummary {
        self.collector.summary()
    }

    /// Consume the reporter and return its output
    pub fn into_output(self) -> W {
        self.out
    }
}
