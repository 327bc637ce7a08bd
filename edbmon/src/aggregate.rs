//! Aggregation dispatch and cross-window accumulation.

use chrono::TimeDelta;
use edbmon_core::{
    AggregationMode, BinnedStats, ClipConfig, EveryChangeStats, MnemonicConfig, MonitorError,
    TimeSeries, block_means, daily_means, every_change, merge, time_interval_means,
};

/// Aggregation resolved once from a mnemonic's mode and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// One bin per UTC calendar day.
    DailyMeans,
    /// One bin per block of filtered samples.
    BlockMeans,
    /// Fixed-width bins restarted at every block.
    TimeInterval(TimeDelta),
    /// Groups delimited by jumps of the single dependency.
    EveryChange,
    /// Raw filtered samples.
    None,
}

impl Aggregation {
    /// Validate `config` against `mode` and pick the handler.
    ///
    /// # Errors
    /// `MonitorError::Configuration` when `time_interval` lacks a valid
    /// `mean_time_block` or `every_change` does not have exactly one dependency.
    pub fn resolve(mode: AggregationMode, config: &MnemonicConfig) -> Result<Self, MonitorError> {
        match mode {
            AggregationMode::DailyMeans => Ok(Self::DailyMeans),
            AggregationMode::BlockMeans => Ok(Self::BlockMeans),
            AggregationMode::None => Ok(Self::None),
            AggregationMode::TimeInterval => {
                let block = config.time_block()?.ok_or_else(|| {
                    MonitorError::configuration(format!(
                        "{}: time_interval mode requires mean_time_block",
                        config.name
                    ))
                })?;
                let width = TimeDelta::from_std(block).map_err(|_| {
                    MonitorError::configuration(format!(
                        "{}: mean_time_block out of range",
                        config.name
                    ))
                })?;
                Ok(Self::TimeInterval(width))
            }
            AggregationMode::EveryChange => match config.dependency.len() {
                1 => Ok(Self::EveryChange),
                n => Err(MonitorError::configuration(format!(
                    "{}: every_change mode requires exactly one dependency, got {n}",
                    config.name
                ))),
            },
        }
    }

    /// Reduce one window's filtered target.
    ///
    /// `dependency` is the filtered dependency; only `EveryChange` reads it.
    ///
    /// # Errors
    /// `MonitorError::InsufficientData` when the reduction produces no bins,
    /// `MonitorError::InvalidArg` for a non-positive bin width.
    pub fn apply(
        &self,
        target: &TimeSeries,
        dependency: Option<&TimeSeries>,
        threshold_sigma: f64,
        clip: &ClipConfig,
    ) -> Result<AggregatedData, MonitorError> {
        let data = match self {
            Self::DailyMeans => AggregatedData::Binned(daily_means(target, clip)),
            Self::BlockMeans => AggregatedData::Binned(block_means(target, clip)),
            Self::TimeInterval(width) => {
                AggregatedData::Binned(time_interval_means(target, *width, clip)?)
            }
            Self::EveryChange => {
                let dependency = dependency.ok_or_else(|| {
                    MonitorError::configuration(format!(
                        "{}: every_change mode requires a dependency series",
                        target.name()
                    ))
                })?;
                AggregatedData::EveryChange(every_change(dependency, target, threshold_sigma, clip))
            }
            Self::None => AggregatedData::Raw,
        };
        if data.is_empty() {
            return Err(MonitorError::insufficient_data(
                target.name(),
                "aggregation produced no bins",
            ));
        }
        Ok(data)
    }
}

/// Result of aggregating one window.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatedData {
    /// Per-bin target statistics.
    Binned(BinnedStats),
    /// Per-group dependency and target statistics.
    EveryChange(EveryChangeStats),
    /// No reduction; the filtered series is the result.
    Raw,
}

impl AggregatedData {
    fn is_empty(&self) -> bool {
        match self {
            Self::Binned(b) => b.is_empty(),
            Self::EveryChange(e) => e.is_empty(),
            Self::Raw => false,
        }
    }
}

/// Results concatenated across the windows of one mnemonic.
#[derive(Debug, Default)]
pub struct Accumulated {
    pub stats: Option<BinnedStats>,
    pub dependency_stats: Option<BinnedStats>,
    pub series: Option<TimeSeries>,
}

impl Accumulated {
    pub fn absorb(&mut self, filtered: TimeSeries, data: AggregatedData) {
        self.series = Some(match self.series.take() {
            Some(prev) => merge(&prev, &filtered),
            None => filtered,
        });
        match data {
            AggregatedData::Binned(b) => self.stats.get_or_insert_with(BinnedStats::default).append(b),
            AggregatedData::EveryChange(e) => {
                self.stats
                    .get_or_insert_with(BinnedStats::default)
                    .append(e.target);
                self.dependency_stats
                    .get_or_insert_with(BinnedStats::default)
                    .append(e.dependency);
            }
            AggregatedData::Raw => {}
        }
    }
}
