use chrono::{DateTime, TimeDelta, Utc};

/// Shape of a fixture signal as a function of time.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    /// Always `value`.
    Constant(f64),
    /// `before` until `at`, `after` from then on.
    Step {
        /// Value before the step.
        before: f64,
        /// Value from the step onwards.
        after: f64,
        /// Step time.
        at: DateTime<Utc>,
    },
    /// Alternates between `low` and `high`, `high` for the first half of each period.
    Square {
        /// Low level.
        low: f64,
        /// High level.
        high: f64,
        /// Full period in seconds.
        period_secs: i64,
    },
    /// `offset + slope_per_day * days since the Unix epoch`.
    Ramp {
        /// Value at the Unix epoch.
        offset: f64,
        /// Increase per day.
        slope_per_day: f64,
    },
}

impl Waveform {
    /// Value at `t`.
    #[must_use]
    pub fn value_at(&self, t: DateTime<Utc>) -> f64 {
        match *self {
            Self::Constant(v) => v,
            Self::Step { before, after, at } => {
                if t < at {
                    before
                } else {
                    after
                }
            }
            Self::Square {
                low,
                high,
                period_secs,
            } => {
                let period = period_secs.max(2);
                if t.timestamp().rem_euclid(period) < period / 2 {
                    high
                } else {
                    low
                }
            }
            #[allow(clippy::cast_precision_loss)]
            Self::Ramp {
                offset,
                slope_per_day,
            } => offset + slope_per_day * (t.timestamp() as f64 / 86_400.0),
        }
    }
}

/// A mnemonic sampled on a fixed cadence grid aligned to the Unix epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    /// Sampling cadence.
    pub cadence: TimeDelta,
    /// Signal shape.
    pub waveform: Waveform,
    /// Reported unit.
    pub unit: Option<&'static str>,
}

impl Fixture {
    /// Fixture with a 15 minute cadence.
    #[must_use]
    pub fn every_15_minutes(waveform: Waveform, unit: Option<&'static str>) -> Self {
        Self {
            cadence: TimeDelta::minutes(15),
            waveform,
            unit,
        }
    }

    /// Grid timestamps within the closed range `[start, end]`.
    #[must_use]
    pub fn grid(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let step = self.cadence.num_seconds().max(1);
        let first = start.timestamp().div_euclid(step) * step;
        let first = if first < start.timestamp() { first + step } else { first };
        let mut out = Vec::new();
        let mut secs = first;
        while secs <= end.timestamp() {
            if let Some(t) = DateTime::<Utc>::from_timestamp(secs, 0)
                && t >= start
            {
                out.push(t);
            }
            secs += step;
        }
        out
    }
}

pub(crate) fn defaults() -> Vec<(&'static str, Fixture)> {
    vec![
        (
            "SE_ZIMIRICEA",
            Fixture::every_15_minutes(
                Waveform::Ramp {
                    offset: 0.2,
                    slope_per_day: 0.0001,
                },
                Some("A"),
            ),
        ),
        (
            "IMIR_HK_ICE_SEC_VOLT1",
            Fixture::every_15_minutes(
                Waveform::Square {
                    low: 0.0,
                    high: 30.0,
                    period_secs: 6 * 3_600,
                },
                Some("V"),
            ),
        ),
        (
            "IMIR_HK_ICE_SEC_VOLT4",
            Fixture::every_15_minutes(Waveform::Constant(39.0), Some("V")),
        ),
        (
            "IMIR_HK_FW_POS_VOLT",
            Fixture::every_15_minutes(
                Waveform::Square {
                    low: 1.0,
                    high: 5.0,
                    period_secs: 12 * 3_600,
                },
                Some("V"),
            ),
        ),
        (
            "IMIR_HK_FW_POS_RATIO",
            Fixture::every_15_minutes(Waveform::Constant(0.5), None),
        ),
    ]
}
