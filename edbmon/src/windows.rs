//! Query window planning.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use edbmon_core::{AggregationMode, MonitorConfig, TimeRange};

/// Windows still to be processed for a mnemonic, in chronological order.
///
/// Persisted modes step from `last` (or the default epoch) in increments of
/// the mode's query duration. Windows starting at or after `now` are dropped
/// and the final window is clamped to `now`, so a `last` later than `now`
/// yields nothing. Mode `none` always gets the single window
/// `[default_epoch, now]`.
#[must_use]
pub fn plan_windows(
    mode: AggregationMode,
    last: Option<DateTime<Utc>>,
    cfg: &MonitorConfig,
    now: DateTime<Utc>,
) -> Vec<TimeRange> {
    if !mode.is_persisted() {
        return TimeRange::new(cfg.default_epoch, now).into_iter().collect();
    }
    step_windows(
        last.unwrap_or(cfg.default_epoch),
        cfg.query_duration(mode),
        now,
    )
}

fn step_windows(start: DateTime<Utc>, duration: Duration, now: DateTime<Utc>) -> Vec<TimeRange> {
    let Ok(step) = TimeDelta::from_std(duration) else {
        return Vec::new();
    };
    if step <= TimeDelta::zero() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut cursor = start;
    while cursor < now {
        let end = cursor.checked_add_signed(step).map_or(now, |e| e.min(now));
        out.push(TimeRange {
            start: cursor,
            end,
        });
        cursor = end;
    }
    out
}
