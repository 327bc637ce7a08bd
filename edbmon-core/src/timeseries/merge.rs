use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::series::TimeSeries;

/// Merge two series of the same mnemonic.
///
/// - Samples are keyed by timestamp; on a collision the value from `newer` wins,
///   as does the last of several equal timestamps within one input.
/// - The result is sorted by timestamp and carries no block boundaries.
/// - Name and metadata come from `older`; the requested range is the hull of both.
#[must_use]
pub fn merge(older: &TimeSeries, newer: &TimeSeries) -> TimeSeries {
    let mut by_ts: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for (t, v) in older.iter().chain(newer.iter()) {
        by_ts.insert(t, v);
    }
    let (timestamps, values) = by_ts.into_iter().unzip();
    let requested = older.requested().hull(newer.requested());
    TimeSeries::from_parts(older.name().to_string(), requested, timestamps, values)
        .with_meta(older.meta().clone())
}
