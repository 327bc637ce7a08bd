#![doc = include_str!("../README.md")]
//! edbmon-core
//!
//! Core types, traits, and algorithms shared across the edbmon crates.
//!
//! - `series`: `TimeSeries`, closed `TimeRange` and half-open `Interval`.
//! - `source`: the `TelemetrySource` trait implemented by fetch services.
//! - `sinks`: query-time store, persistence and rendering collaborators.
//! - `timeseries`: merge, condition, block, statistics, change-point and
//!   combination algorithms. These are pure and synchronous.
//!
//! The async traits are runtime-agnostic; the orchestrator and middleware
//! crates run them on Tokio.
#![warn(missing_docs)]

/// Middleware trait implemented by source wrappers.
pub mod middleware;
/// Telemetry containers and time ranges.
pub mod series;
/// Collaborators receiving or tracking results.
pub mod sinks;
/// Telemetry fetch trait.
pub mod source;
/// Time-series algorithms.
pub mod timeseries;

pub use edbmon_types::*;
pub use middleware::Middleware;
pub use series::{Interval, SeriesMeta, TimeRange, TimeSeries};
pub use sinks::{PersistenceSink, PlotRenderer, PlotRequest, QueryTimeStore, TrendEntry};
pub use source::TelemetrySource;
pub use timeseries::blocks::extract;
pub use timeseries::changepoint::{EveryChangeStats, change_groups, change_points, every_change};
pub use timeseries::combine::multiply;
pub use timeseries::condition::{always_true, combine, intersect, relation_test};
pub use timeseries::merge::merge;
pub use timeseries::stats::{
    BinnedStats, ClipConfig, RobustStats, block_means, daily_means, median_time, robust_stats,
    robust_stats_with, time_bins, time_interval_means,
};
