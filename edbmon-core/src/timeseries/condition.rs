//! Condition intervals: where a dependency satisfies its relation, and where
//! all dependencies hold at once.

use chrono::TimeDelta;

use crate::series::{Interval, TimeRange, TimeSeries};
use edbmon_types::Relation;

/// Intervals during which `series` satisfies `relation` against `threshold`.
///
/// Each run of consecutive satisfying samples becomes `[first_true, first_false)`.
/// A run reaching the end of the series extends to the requested end, or just
/// past the last sample when the requested end does not lie beyond it. Runs
/// whose separating gap is shorter than `min_gap` are bridged into one interval.
#[must_use]
pub fn relation_test(
    series: &TimeSeries,
    relation: Relation,
    threshold: f64,
    min_gap: TimeDelta,
) -> Vec<Interval> {
    let mut out: Vec<Interval> = Vec::new();
    let mut run_start = None;

    for (t, v) in series.iter() {
        match (run_start, relation.holds(v, threshold)) {
            (None, true) => run_start = Some(t),
            (Some(start), false) => {
                push_run(&mut out, Interval::new(start, t), min_gap);
                run_start = None;
            }
            _ => {}
        }
    }

    if let (Some(start), Some(&last)) = (run_start, series.timestamps().last()) {
        let end = if series.requested().end > last {
            series.requested().end
        } else {
            last + TimeDelta::nanoseconds(1)
        };
        push_run(&mut out, Interval::new(start, end), min_gap);
    }
    out
}

fn push_run(out: &mut Vec<Interval>, run: Interval, min_gap: TimeDelta) {
    if run.is_empty() {
        return;
    }
    if let Some(prev) = out.last_mut()
        && run.start - prev.end < min_gap
    {
        prev.end = run.end;
        return;
    }
    out.push(run);
}

/// The condition that always holds over `range`.
#[must_use]
pub fn always_true(range: &TimeRange) -> Vec<Interval> {
    let whole = Interval::new(range.start, range.end);
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole]
    }
}

/// Intersection of two ascending, non-overlapping interval lists.
///
/// Adjacent output intervals are not coalesced.
#[must_use]
pub fn intersect(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let piece = Interval::new(a[i].start.max(b[j].start), a[i].end.min(b[j].end));
        if !piece.is_empty() {
            out.push(piece);
        }
        if a[i].end < b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Intersection of every condition; an empty list holds over all of `range`.
///
/// An empty result is valid and means no time satisfies every condition.
#[must_use]
pub fn combine(conditions: &[Vec<Interval>], range: &TimeRange) -> Vec<Interval> {
    match conditions.split_first() {
        None => always_true(range),
        Some((first, rest)) => rest
            .iter()
            .fold(first.clone(), |acc, next| intersect(&acc, next)),
    }
}
