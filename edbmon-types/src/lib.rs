#![doc = include_str!("../README.md")]
//! edbmon-types
//!
//! Shared configuration, error and report types used across the edbmon crates.
#![warn(missing_docs)]

/// Orchestrator and fetch configuration.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Instruments and persistence schemas.
pub mod instrument;
/// Mnemonic catalogs and per-mnemonic settings.
pub mod mnemonic;
/// Run and per-mnemonic reports.
pub mod reports;

pub use config::{BackoffConfig, DEFAULT_EPOCH_SECS, FetchPolicy, MonitorConfig};
pub use error::MonitorError;
pub use instrument::{Instrument, SchemaHandle};
pub use mnemonic::{
    AggregationMode, DependencySpec, MnemonicCatalog, MnemonicConfig, PlotData, Relation,
    is_valid_mnemonic, parse_time_block,
};
pub use reports::{MnemonicOutcome, MnemonicStatus, RunReport};
