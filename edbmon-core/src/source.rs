use async_trait::async_trait;

use crate::MonitorError;
use crate::series::{TimeRange, TimeSeries};

/// Remote telemetry service returning samples for one mnemonic.
///
/// Implementations return the samples with `range.start <= t <= range.end`,
/// ordered by timestamp, with `requested() == range`.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Stable identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Fetch samples of `mnemonic` over the closed `range`.
    ///
    /// # Errors
    /// `MonitorError::Retrieval` for transport or service failures and
    /// `MonitorError::NotFound` for unknown mnemonics.
    async fn fetch(&self, mnemonic: &str, range: TimeRange) -> Result<TimeSeries, MonitorError>;
}
