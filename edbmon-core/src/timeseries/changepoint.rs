//! Every-change grouping: segment a dependency at significant jumps and
//! summarize the target over each resulting time span.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::series::TimeSeries;
use crate::timeseries::stats::{
    BinnedStats, ClipConfig, RobustStats, median_time, robust_stats_with,
};

/// Indices where a new group starts, excluding the implicit start at 0.
///
/// A step between consecutive values is a change when its absolute size is at
/// least `threshold_sigma` robust deviations of all step sizes and strictly
/// above their median. The second bound matters when the deviation is zero,
/// e.g. for a flat signal or one toggling between two levels.
#[must_use]
pub fn change_points(values: &[f64], threshold_sigma: f64, clip: &ClipConfig) -> Vec<usize> {
    let diffs: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let spread = robust_stats_with(&diffs, clip);
    let limit = threshold_sigma * spread.stdev;
    let typical = spread.median.max(0.0);
    diffs
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d.is_finite() && d > typical && d >= limit)
        .map(|(i, _)| i + 1)
        .collect()
}

/// Index ranges of the groups delimited by [`change_points`].
#[must_use]
pub fn change_groups(values: &[f64], threshold_sigma: f64, clip: &ClipConfig) -> Vec<Range<usize>> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut starts = vec![0];
    starts.extend(change_points(values, threshold_sigma, clip));
    starts
        .iter()
        .enumerate()
        .map(|(i, &s)| s..starts.get(i + 1).copied().unwrap_or(values.len()))
        .collect()
}

/// Per-group statistics of a dependency and its target, aligned by group index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EveryChangeStats {
    /// Dependency statistics per group.
    pub dependency: BinnedStats,
    /// Target statistics over each group's time span.
    pub target: BinnedStats,
}

impl EveryChangeStats {
    /// Concatenate another set of groups after these.
    pub fn append(&mut self, other: Self) {
        self.dependency.append(other.dependency);
        self.target.append(other.target);
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependency.len()
    }

    /// True if there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependency.is_empty()
    }
}

/// Group `dependency` at its change points and summarize both series per group.
///
/// Dependency statistics use each group's index range. Target statistics use
/// the samples in `[group_start_time, next_group_start_time)`, with no upper
/// bound for the last group. The two series need not share timestamps. A
/// group whose span holds no target samples gets NaN target statistics timed
/// at the dependency group's median time.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "edbmon_core::every_change",
        skip_all,
        fields(dependency = dependency.name(), target = target.name()),
    )
)]
#[must_use]
pub fn every_change(
    dependency: &TimeSeries,
    target: &TimeSeries,
    threshold_sigma: f64,
    clip: &ClipConfig,
) -> EveryChangeStats {
    let mut out = EveryChangeStats::default();
    let dep_ts = dependency.timestamps();
    let groups = change_groups(dependency.values(), threshold_sigma, clip);

    for (g, r) in groups.iter().enumerate() {
        let Some(dep_time) = median_time(&dep_ts[r.clone()]) else {
            continue;
        };
        out.dependency
            .push(dep_time, robust_stats_with(&dependency.values()[r.clone()], clip));

        let span_start = dep_ts[r.start];
        let span_end = groups.get(g + 1).map(|next| dep_ts[next.start]);
        let lo = target.timestamps().partition_point(|t| *t < span_start);
        let hi = span_end.map_or(target.len(), |end| {
            target.timestamps().partition_point(|t| *t < end)
        });
        let hi = hi.max(lo);

        let target_times = &target.timestamps()[lo..hi];
        match median_time(target_times) {
            Some(t) => out
                .target
                .push(t, robust_stats_with(&target.values()[lo..hi], clip)),
            None => out.target.push(dep_time, RobustStats::NAN),
        }
    }
    out
}
