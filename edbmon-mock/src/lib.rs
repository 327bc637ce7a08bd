//! edbmon-mock
//!
//! Deterministic and scriptable test doubles for the edbmon collaborators.
#![warn(missing_docs)]

use std::collections::HashMap;

use async_trait::async_trait;
use edbmon_core::{MonitorError, SeriesMeta, TelemetrySource, TimeRange, TimeSeries};

mod dynamic;
mod fixtures;
mod store;

pub use dynamic::{DynamicMockController, DynamicMockSource, FetchRecord, MockBehavior};
pub use fixtures::{Fixture, Waveform};
pub use store::{InMemoryQueryTimeStore, RecordingSink};

/// Mock source serving deterministic fixture telemetry.
pub struct MockSource {
    fixtures: HashMap<String, Fixture>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Source preloaded with the default fixtures.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fixtures: fixtures::defaults()
                .into_iter()
                .map(|(name, f)| (name.to_string(), f))
                .collect(),
        }
    }

    /// Source with no fixtures.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            fixtures: HashMap::new(),
        }
    }

    /// Add or replace a fixture.
    #[must_use]
    pub fn with_fixture(mut self, mnemonic: impl Into<String>, fixture: Fixture) -> Self {
        self.fixtures.insert(mnemonic.into(), fixture);
        self
    }

    /// Names of all configured fixtures.
    #[must_use]
    pub fn mnemonics(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fixtures.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl TelemetrySource for MockSource {
    fn name(&self) -> &'static str {
        "edbmon-mock"
    }

    async fn fetch(&self, mnemonic: &str, range: TimeRange) -> Result<TimeSeries, MonitorError> {
        if mnemonic == "FAIL" {
            return Err(MonitorError::retrieval(mnemonic, "forced failure"));
        }
        let fixture = self
            .fixtures
            .get(mnemonic)
            .ok_or_else(|| MonitorError::not_found(format!("mnemonic {mnemonic}")))?;
        let samples = fixture
            .grid(range.start, range.end)
            .into_iter()
            .map(|t| (t, fixture.waveform.value_at(t)));
        Ok(TimeSeries::from_samples(mnemonic, range, samples)?.with_meta(SeriesMeta {
            unit: fixture.unit.map(str::to_string),
            description: None,
            source: Some(self.name().to_string()),
        }))
    }
}
