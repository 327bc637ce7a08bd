use crate::series::{Interval, TimeSeries};

/// Keep the samples of `series` that fall inside `intervals`.
///
/// `intervals` must be ascending and non-overlapping. Values are kept as-is
/// and in order. The returned series carries block boundaries: the index of
/// the first kept sample of each interval that captured at least one sample.
/// An interval capturing nothing contributes no boundary, and an empty result
/// has no boundaries. The requested range is that of `series`.
#[must_use]
pub fn extract(series: &TimeSeries, intervals: &[Interval]) -> TimeSeries {
    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut blocks = Vec::new();
    let mut current: Option<usize> = None;
    let mut k = 0;

    for (t, v) in series.iter() {
        while k < intervals.len() && intervals[k].end <= t {
            k += 1;
        }
        let Some(iv) = intervals.get(k) else { break };
        if iv.contains(t) {
            if current != Some(k) {
                blocks.push(timestamps.len());
                current = Some(k);
            }
            timestamps.push(t);
            values.push(v);
        }
    }

    let mut out = TimeSeries::from_parts(
        series.name().to_string(),
        *series.requested(),
        timestamps,
        values,
    )
    .with_meta(series.meta().clone());
    out.set_blocks_unchecked(blocks);
    out
}
