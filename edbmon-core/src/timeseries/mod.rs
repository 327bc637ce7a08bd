/// Block extraction: restrict a series to condition intervals.
pub mod blocks;
/// Change-point grouping for every-change aggregation.
pub mod changepoint;
/// Interpolated product of two series.
pub mod combine;
/// Relation tests and interval intersection.
pub mod condition;
/// Timestamp-deduplicating merge.
pub mod merge;
/// Sigma-clipped statistics and binning policies.
pub mod stats;
