//! Collaborators that receive or track monitoring results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::MonitorError;
use crate::series::TimeSeries;
use crate::timeseries::stats::BinnedStats;
use edbmon_types::{AggregationMode, SchemaHandle};

/// Record of when each mnemonic was last queried successfully.
#[async_trait]
pub trait QueryTimeStore: Send + Sync {
    /// End of the last processed window for `mnemonic`, if any.
    ///
    /// # Errors
    /// `MonitorError::Sink` when the store is unavailable.
    async fn last_query_time(&self, mnemonic: &str) -> Result<Option<DateTime<Utc>>, MonitorError>;

    /// Record `at` as the new last query time for `mnemonic`.
    ///
    /// # Errors
    /// `MonitorError::Sink` when the store is unavailable.
    async fn record_query_time(&self, mnemonic: &str, at: DateTime<Utc>) -> Result<(), MonitorError>;
}

/// One persisted trend row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendEntry {
    /// Target mnemonic.
    pub mnemonic: String,
    /// Aggregation mode the stats were computed with.
    pub mode: AggregationMode,
    /// End of the last window folded into this entry.
    pub latest_query: DateTime<Utc>,
    /// Per-bin statistics of the target.
    pub stats: BinnedStats,
    /// Per-group statistics of the dependency (every-change mode only).
    pub dependency_stats: Option<BinnedStats>,
    /// When the entry was produced.
    pub entry_date: DateTime<Utc>,
}

/// Destination for computed trends.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store one entry under the instrument's schema.
    ///
    /// # Errors
    /// `MonitorError::Sink` on write failure.
    async fn store(&self, schema: SchemaHandle, entry: &TrendEntry) -> Result<(), MonitorError>;
}

/// Everything a renderer needs to draw one mnemonic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRequest {
    /// Series to draw (filtered target or combined product).
    pub series: TimeSeries,
    /// Binned statistics overlaid on the raw samples, when computed.
    pub stats: Option<BinnedStats>,
    /// Nominal value line.
    pub nominal_value: Option<f64>,
    /// Yellow limits `[low, high]`.
    pub yellow_limits: Option<[f64; 2]>,
    /// Red limits `[low, high]`.
    pub red_limits: Option<[f64; 2]>,
}

/// Plot renderer.
#[async_trait]
pub trait PlotRenderer: Send + Sync {
    /// Render one plot.
    ///
    /// # Errors
    /// `MonitorError::Sink` on rendering failure.
    async fn render(&self, request: &PlotRequest) -> Result<(), MonitorError>;
}
