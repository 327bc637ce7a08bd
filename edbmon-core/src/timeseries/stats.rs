//! Sigma-clipped statistics and the binning policies built on them.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::MonitorError;
use crate::series::{Interval, TimeSeries};

const DAY: i64 = 86_400;

/// Scale factor turning a median absolute deviation into a normal-equivalent sigma.
const MAD_TO_STD: f64 = 1.482_602_218_505_602;

/// Sigma-clipping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    /// Samples further than `sigma` robust deviations from the median are excluded.
    pub sigma: f64,
    /// Maximum clipping passes.
    pub max_iterations: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            sigma: 3.0,
            max_iterations: 10,
        }
    }
}

/// Mean, median and standard deviation of the samples that survived clipping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobustStats {
    /// Mean of surviving samples.
    pub mean: f64,
    /// Median of surviving samples.
    pub median: f64,
    /// Population standard deviation of surviving samples.
    pub stdev: f64,
}

impl RobustStats {
    /// Placeholder for a bin with no samples.
    pub const NAN: Self = Self {
        mean: f64::NAN,
        median: f64::NAN,
        stdev: f64::NAN,
    };

    /// True if this is a placeholder for an empty bin.
    #[must_use]
    pub const fn is_nan(&self) -> bool {
        self.mean.is_nan()
    }
}

/// Robust statistics with the default iteration cap.
#[must_use]
pub fn robust_stats(values: &[f64], sigma: f64) -> RobustStats {
    robust_stats_with(
        values,
        &ClipConfig {
            sigma,
            ..ClipConfig::default()
        },
    )
}

/// Iteratively sigma-clipped statistics.
///
/// Each pass takes the median as center and the normalized median absolute
/// deviation as spread, then drops samples further than `sigma * spread`
/// from the center. Passes stop when nothing is dropped or after
/// `max_iterations`. Non-finite values are ignored. Returns
/// [`RobustStats::NAN`] when no sample survives.
#[must_use]
pub fn robust_stats_with(values: &[f64], clip: &ClipConfig) -> RobustStats {
    let mut kept: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

    for _ in 0..clip.max_iterations {
        let Some(center) = median(&kept) else { break };
        let deviations: Vec<f64> = kept.iter().map(|v| (v - center).abs()).collect();
        let spread = median(&deviations).unwrap_or(0.0) * MAD_TO_STD;
        let limit = clip.sigma * spread;
        let before = kept.len();
        kept.retain(|v| (v - center).abs() <= limit);
        if kept.len() == before {
            break;
        }
    }

    let Some(med) = median(&kept) else {
        return RobustStats::NAN;
    };
    #[allow(clippy::cast_precision_loss)]
    let n = kept.len() as f64;
    let mean = kept.iter().sum::<f64>() / n;
    let var = kept.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    RobustStats {
        mean,
        median: med,
        stdev: var.sqrt(),
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median of non-decreasing timestamps; `None` when empty.
#[must_use]
pub fn median_time(timestamps: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    let n = timestamps.len();
    if n == 0 {
        return None;
    }
    let hi = timestamps[n / 2];
    if n % 2 == 0 {
        let lo = timestamps[n / 2 - 1];
        Some(lo + (hi - lo) / 2)
    } else {
        Some(hi)
    }
}

/// Parallel arrays of per-bin statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BinnedStats {
    /// Representative time of each bin.
    pub times: Vec<DateTime<Utc>>,
    /// Clipped mean per bin.
    pub means: Vec<f64>,
    /// Clipped median per bin.
    pub medians: Vec<f64>,
    /// Clipped standard deviation per bin.
    pub stdevs: Vec<f64>,
}

impl BinnedStats {
    /// Append one bin.
    pub fn push(&mut self, time: DateTime<Utc>, stats: RobustStats) {
        self.times.push(time);
        self.means.push(stats.mean);
        self.medians.push(stats.median);
        self.stdevs.push(stats.stdev);
    }

    /// Concatenate another set of bins after these.
    pub fn append(&mut self, mut other: Self) {
        self.times.append(&mut other.times);
        self.means.append(&mut other.means);
        self.medians.append(&mut other.medians);
        self.stdevs.append(&mut other.stdevs);
    }

    /// Bin `i`, if present.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<(DateTime<Utc>, RobustStats)> {
        Some((
            *self.times.get(i)?,
            RobustStats {
                mean: *self.means.get(i)?,
                median: *self.medians.get(i)?,
                stdev: *self.stdevs.get(i)?,
            },
        ))
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if there are no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// One bin per UTC calendar day from the first sample's day through the last
/// sample's day. Bin times are the day midpoints; days without samples get NaN.
#[must_use]
pub fn daily_means(series: &TimeSeries, clip: &ClipConfig) -> BinnedStats {
    let mut out = BinnedStats::default();
    let Some(span) = series.data_range() else {
        return out;
    };
    let first_day = span.start.timestamp().div_euclid(DAY);
    let last_day = span.end.timestamp().div_euclid(DAY);
    let Some(origin) = DateTime::<Utc>::from_timestamp(first_day * DAY, 0) else {
        return out;
    };

    let n_days = usize::try_from(last_day - first_day + 1).unwrap_or(0);
    let mut bins: Vec<Vec<f64>> = vec![Vec::new(); n_days];
    for (t, v) in series.iter() {
        let idx = usize::try_from(t.timestamp().div_euclid(DAY) - first_day).unwrap_or(0);
        if let Some(bin) = bins.get_mut(idx) {
            bin.push(v);
        }
    }

    let mut day_start = origin;
    for values in &bins {
        out.push(
            day_start + TimeDelta::hours(12),
            robust_stats_with(values, clip),
        );
        day_start += TimeDelta::days(1);
    }
    out
}

/// One bin per block boundary pair, timed at the block's median timestamp.
#[must_use]
pub fn block_means(series: &TimeSeries, clip: &ClipConfig) -> BinnedStats {
    let mut out = BinnedStats::default();
    for r in series.block_ranges() {
        let times = &series.timestamps()[r.clone()];
        if let Some(t) = median_time(times) {
            out.push(t, robust_stats_with(&series.values()[r], clip));
        }
    }
    out
}

/// Edges of the fixed-width bins used by [`time_interval_means`].
///
/// Bins restart at the first sample of every block and continue while the
/// bin start does not pass the block's last sample, so no bin spans the gap
/// between two blocks. A non-positive width yields no bins; a width too
/// large to add to a block's start yields one bin ending at the latest
/// representable instant.
#[must_use]
pub fn time_bins(series: &TimeSeries, width: TimeDelta) -> Vec<Interval> {
    series
        .block_ranges()
        .into_iter()
        .flat_map(|r| block_bins(&series.timestamps()[r], width))
        .collect()
}

fn block_bins(timestamps: &[DateTime<Utc>], width: TimeDelta) -> Vec<Interval> {
    let mut bins = Vec::new();
    let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
        return bins;
    };
    if width <= TimeDelta::zero() {
        return bins;
    }
    let mut start = first;
    while start <= last {
        // a bin reaching past the representable range closes the block
        let Some(end) = start.checked_add_signed(width) else {
            bins.push(Interval::new(start, DateTime::<Utc>::MAX_UTC));
            break;
        };
        bins.push(Interval::new(start, end));
        start = end;
    }
    bins
}

/// Fixed-width time bins restarted at every block, timed at bin midpoints.
/// Empty bins get NaN statistics.
///
/// # Errors
/// Returns `MonitorError::InvalidArg` if `width` is not positive.
pub fn time_interval_means(
    series: &TimeSeries,
    width: TimeDelta,
    clip: &ClipConfig,
) -> Result<BinnedStats, MonitorError> {
    if width <= TimeDelta::zero() {
        return Err(MonitorError::InvalidArg(format!(
            "time interval width must be positive, got {width}"
        )));
    }
    let mut out = BinnedStats::default();
    for r in series.block_ranges() {
        let times = &series.timestamps()[r.clone()];
        let values = &series.values()[r];
        let mut p = 0;
        for bin in block_bins(times, width) {
            let lo = p;
            while p < times.len() && times[p] < bin.end {
                p += 1;
            }
            out.push(bin.midpoint(), robust_stats_with(&values[lo..p], clip));
        }
    }
    Ok(out)
}
