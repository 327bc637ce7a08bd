use std::ops::Range;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::MonitorError;

/// Closed time range `[start, end]` used for fetches, cache coverage and
/// processing windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end.
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting `start > end`.
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidArg` when the bounds are reversed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, MonitorError> {
        if start > end {
            return Err(MonitorError::InvalidArg(format!(
                "time range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Whether `t` lies within the closed range.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Whether `other` lies entirely within this range.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest range containing both.
    #[must_use]
    pub fn hull(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shared part of both ranges, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Self { start, end })
    }

    /// Length of the range.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Build an interval. Callers are expected to pass `start <= end`.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether `t` lies in `[start, end)`.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// True when no instant satisfies `contains`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Midpoint of the interval.
    #[must_use]
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + (self.end - self.start) / 2
    }
}

/// Descriptive metadata attached to a series by its source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeriesMeta {
    /// Physical unit, e.g. "V" or "DEGC".
    pub unit: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Source schema or service identifier.
    pub source: Option<String>,
}

/// Samples of one mnemonic over a requested time range.
///
/// Invariants, checked at construction:
/// - `timestamps.len() == values.len()`;
/// - timestamps are non-decreasing;
/// - block boundaries, when present, are strictly ascending valid indices starting at 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    name: String,
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    requested: TimeRange,
    meta: SeriesMeta,
    blocks: Option<Vec<usize>>,
}

impl TimeSeries {
    /// Build a validated series.
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidArg` if the lengths differ or timestamps decrease.
    pub fn new(
        name: impl Into<String>,
        requested: TimeRange,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
    ) -> Result<Self, MonitorError> {
        let name = name.into();
        if timestamps.len() != values.len() {
            return Err(MonitorError::InvalidArg(format!(
                "{name}: {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(i) = timestamps.windows(2).position(|w| w[1] < w[0]) {
            return Err(MonitorError::InvalidArg(format!(
                "{name}: timestamp at index {} precedes its predecessor",
                i + 1
            )));
        }
        Ok(Self::from_parts(name, requested, timestamps, values))
    }

    /// Build from `(timestamp, value)` pairs.
    ///
    /// # Errors
    /// Same as [`TimeSeries::new`].
    pub fn from_samples<I>(
        name: impl Into<String>,
        requested: TimeRange,
        samples: I,
    ) -> Result<Self, MonitorError>
    where
        I: IntoIterator<Item = (DateTime<Utc>, f64)>,
    {
        let (timestamps, values) = samples.into_iter().unzip();
        Self::new(name, requested, timestamps, values)
    }

    /// A series with no samples.
    pub fn empty(name: impl Into<String>, requested: TimeRange) -> Self {
        Self::from_parts(name.into(), requested, Vec::new(), Vec::new())
    }

    // Callers guarantee the invariants.
    pub(crate) const fn from_parts(
        name: String,
        requested: TimeRange,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            name,
            timestamps,
            values,
            requested,
            meta: SeriesMeta {
                unit: None,
                description: None,
                source: None,
            },
            blocks: None,
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: SeriesMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Replace the requested range.
    #[must_use]
    pub fn with_requested(mut self, requested: TimeRange) -> Self {
        self.requested = requested;
        self
    }

    /// Rename the series.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach block boundaries (block start indices).
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidArg` unless the boundaries start at 0, are
    /// strictly ascending and index existing samples. An empty series accepts
    /// only an empty list.
    pub fn with_blocks(mut self, blocks: Vec<usize>) -> Result<Self, MonitorError> {
        let valid = if self.is_empty() {
            blocks.is_empty()
        } else {
            blocks.first() == Some(&0)
                && blocks.windows(2).all(|w| w[0] < w[1])
                && blocks.last().is_some_and(|&b| b < self.len())
        };
        if !valid {
            return Err(MonitorError::InvalidArg(format!(
                "{}: invalid block boundaries {blocks:?} for {} samples",
                self.name,
                self.len()
            )));
        }
        self.blocks = Some(blocks);
        Ok(self)
    }

    pub(crate) fn set_blocks_unchecked(&mut self, blocks: Vec<usize>) {
        self.blocks = Some(blocks);
    }

    /// Mnemonic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Sample values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Range the series was requested for.
    #[must_use]
    pub const fn requested(&self) -> &TimeRange {
        &self.requested
    }

    /// Range actually spanned by samples; `None` when empty.
    #[must_use]
    pub fn data_range(&self) -> Option<TimeRange> {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(&start), Some(&end)) => Some(TimeRange { start, end }),
            _ => None,
        }
    }

    /// Source metadata.
    #[must_use]
    pub const fn meta(&self) -> &SeriesMeta {
        &self.meta
    }

    /// Block start indices, when the series came out of block extraction.
    #[must_use]
    pub fn blocks(&self) -> Option<&[usize]> {
        self.blocks.as_deref()
    }

    /// Index ranges of each block. A series without boundaries is one block.
    #[must_use]
    pub fn block_ranges(&self) -> Vec<Range<usize>> {
        let len = self.len();
        match &self.blocks {
            Some(starts) => starts
                .iter()
                .enumerate()
                .map(|(i, &s)| s..starts.get(i + 1).copied().unwrap_or(len))
                .collect(),
            None if len > 0 => vec![0..len],
            None => Vec::new(),
        }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True if there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Iterate `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Samples within the closed `range`; the result's requested range is `range`
    /// and block boundaries are dropped.
    #[must_use]
    pub fn slice(&self, range: &TimeRange) -> Self {
        let lo = self.timestamps.partition_point(|t| *t < range.start);
        let hi = self.timestamps.partition_point(|t| *t <= range.end);
        let hi = hi.max(lo);
        Self {
            name: self.name.clone(),
            timestamps: self.timestamps[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
            requested: *range,
            meta: self.meta.clone(),
            blocks: None,
        }
    }
}
