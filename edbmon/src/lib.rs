#![doc = include_str!("../README.md")]
//! edbmon orchestrates incremental trending of engineering telemetry.
//!
//! Overview
//! - Plans the time windows each mnemonic still needs, starting from the
//!   last recorded query time.
//! - Fetches target and dependency mnemonics through a run-scoped
//!   [`QueryCache`] wrapped around a retrying source.
//! - Keeps only samples taken while every dependency condition holds, then
//!   reduces them under the configured aggregation mode.
//! - Persists trend entries, records query times and renders plots through
//!   pluggable collaborators.
//!
//! Key behaviors and trade-offs
//! - Window failures are logged and skipped so one bad window never loses a
//!   whole run; configuration errors and unknown mnemonics abort only the
//!   mnemonic concerned.
//! - Failed windows are not revisited: the recorded query time advances past
//!   them once the mnemonic finishes.
//! - Mode `none` reprocesses from the default epoch on every run and is never
//!   persisted.
#![warn(missing_docs)]

mod aggregate;
pub(crate) mod core;
mod pipeline;
mod run;
mod state;
mod windows;

pub use aggregate::{AggregatedData, Aggregation};
pub use crate::core::{Clock, Monitor, MonitorBuilder};
pub use windows::plan_windows;

pub use edbmon_core::{
    AggregationMode, BinnedStats, DependencySpec, FetchPolicy, Instrument, MnemonicCatalog,
    MnemonicConfig, MnemonicOutcome, MnemonicStatus, MonitorConfig, MonitorError,
    PersistenceSink, PlotData, PlotRenderer, PlotRequest, QueryTimeStore, Relation, RunReport,
    SchemaHandle, TelemetrySource, TimeRange, TimeSeries, TrendEntry,
};
pub use edbmon_middleware::QueryCache;
