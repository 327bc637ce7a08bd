// Shared fixtures for the monitor tests; not every test uses every helper.
#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use edbmon::{FetchPolicy, Monitor, MonitorBuilder, TelemetrySource, TimeRange, TimeSeries};
use edbmon_mock::{InMemoryQueryTimeStore, RecordingSink};
use edbmon_types::BackoffConfig;

/// Construct a UTC `DateTime` from components for readability in tests.
pub fn dt(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> DateTime<Utc> {
    let date = chrono::NaiveDate::from_ymd_opt(y, m, d).expect("invalid date");
    let naive = date
        .and_hms_opt(hh, mm, ss)
        .expect("invalid time components");
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
}

/// Midnight of the given day in January 2024.
pub fn day(d: u32) -> DateTime<Utc> {
    dt(2024, 1, d, 0, 0, 0)
}

/// Single attempt, short timeout.
pub fn fast_policy() -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_secs(5),
        max_attempts: 1,
        backoff: BackoffConfig {
            min_backoff_ms: 10,
            max_backoff_ms: 50,
            factor: 2,
            jitter_percent: 0,
        },
    }
}

/// Hourly samples from `from`, `hours + 1` of them, valued `f(hour_index)`.
pub fn hourly(name: &str, from: DateTime<Utc>, hours: i64, f: impl Fn(i64) -> f64) -> TimeSeries {
    let range = TimeRange::new(from, from + TimeDelta::hours(hours)).unwrap();
    TimeSeries::from_samples(
        name,
        range,
        (0..=hours).map(|h| (from + TimeDelta::hours(h), f(h))),
    )
    .unwrap()
}

/// Collaborators recorded across one test.
pub struct Env {
    pub store: Arc<InMemoryQueryTimeStore>,
    pub sink: Arc<RecordingSink>,
}

impl Env {
    /// No query history.
    pub fn new() -> Self {
        Self::with_history(&[])
    }

    /// Query history preloaded for the given mnemonics.
    pub fn with_history(entries: &[(&str, DateTime<Utc>)]) -> Self {
        let store = entries
            .iter()
            .fold(InMemoryQueryTimeStore::new(), |s, (name, at)| s.with(*name, *at));
        Self {
            store: Arc::new(store),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    /// Builder wired to this environment, epoch at January 1st.
    pub fn builder(&self, source: Arc<dyn TelemetrySource>, now: DateTime<Utc>) -> MonitorBuilder {
        Monitor::builder()
            .with_source(source)
            .with_query_time_store(self.store.clone())
            .with_persistence(self.sink.clone())
            .with_renderer(self.sink.clone())
            .default_epoch(day(1))
            .fetch_policy(fast_policy())
            .fixed_now(now)
    }

    pub fn monitor(&self, source: Arc<dyn TelemetrySource>, now: DateTime<Utc>) -> Monitor {
        self.builder(source, now).build().unwrap()
    }
}

/// Route `tracing` output through the test harness; `RUST_LOG` selects levels.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Formatted `tracing` output collected while the guard from [`LogCapture::install`] lives.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events into the buffer.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Lines containing `message`.
    pub fn lines_with(&self, message: &str) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .filter(|l| l.contains(message))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
