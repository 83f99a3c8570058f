//! exec-monitor userspace library
//!
//! Provides reusable components for loading the exec counting probe and
//! reporting its per-user counters.

pub mod cli;
pub mod collector;
pub mod error;
pub mod exporter;
pub mod loader;
pub mod reporter;
pub mod resolver;
pub mod store;
pub mod types;

pub use collector::{RunSummary, SummaryCollector};
pub use error::MonitorError;
pub use exporter::{ExporterType, JsonExporter, ReportExporter, TextExporter};
pub use loader::{AttachMode, ProbeLoader};
pub use reporter::{Reporter, ReporterConfig};
pub use store::{CounterStore, KernelCounterStore, MemoryCounterStore};
pub use types::*;
