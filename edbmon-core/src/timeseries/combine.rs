use chrono::TimeDelta;

use crate::MonitorError;
use crate::series::{SeriesMeta, TimeSeries};

/// Multiply `a` by `b` linearly interpolated at `a`'s timestamps.
///
/// Only samples of `a` inside the overlap of both data ranges are kept; `b`
/// is never extrapolated. The result is named `"A*B"`, its requested range
/// is the overlap, and its unit is `"unitA*unitB"` when both are known.
///
/// # Errors
/// Returns `MonitorError::InsufficientOverlap` when either series is empty or
/// their data ranges do not intersect.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "edbmon_core::multiply",
        skip_all,
        fields(left = a.name(), right = b.name()),
    )
)]
pub fn multiply(a: &TimeSeries, b: &TimeSeries) -> Result<TimeSeries, MonitorError> {
    let overlap = match (a.data_range(), b.data_range()) {
        (Some(ra), Some(rb)) => ra.intersection(&rb),
        _ => None,
    }
    .ok_or_else(|| MonitorError::insufficient_overlap(a.name(), b.name()))?;

    let bt = b.timestamps();
    let bv = b.values();
    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut j = 0;

    for (t, v) in a.iter() {
        if !overlap.contains(t) {
            continue;
        }
        // advance to the last b sample at or before t
        while j + 1 < bt.len() && bt[j + 1] <= t {
            j += 1;
        }
        let other = if bt[j] == t || j + 1 == bt.len() {
            bv[j]
        } else {
            let span = seconds(bt[j + 1] - bt[j]);
            let frac = seconds(t - bt[j]) / span;
            bv[j] + (bv[j + 1] - bv[j]) * frac
        };
        timestamps.push(t);
        values.push(v * other);
    }

    let unit = match (&a.meta().unit, &b.meta().unit) {
        (Some(ua), Some(ub)) => Some(format!("{ua}*{ub}")),
        _ => None,
    };
    let name = format!("{}*{}", a.name(), b.name());
    Ok(
        TimeSeries::from_parts(name, overlap, timestamps, values).with_meta(
            SeriesMeta {
                unit,
                description: None,
                source: a.meta().source.clone(),
            },
        ),
    )
}

fn seconds(d: TimeDelta) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let whole = d.num_seconds() as f64;
    whole + f64::from(d.subsec_nanos()) * 1e-9
}
