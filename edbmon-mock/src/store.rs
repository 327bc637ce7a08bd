use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use edbmon_core::{
    MonitorError, PersistenceSink, PlotRenderer, PlotRequest, QueryTimeStore, SchemaHandle,
    TrendEntry,
};

/// Last-query-time store kept in memory.
#[derive(Default)]
pub struct InMemoryQueryTimeStore {
    times: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryQueryTimeStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with one entry.
    #[must_use]
    pub fn with(self, mnemonic: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(mnemonic.into(), at);
        self
    }

    /// Currently recorded time for `mnemonic`.
    #[must_use]
    pub fn get(&self, mnemonic: &str) -> Option<DateTime<Utc>> {
        self.times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(mnemonic)
            .copied()
    }
}

#[async_trait]
impl QueryTimeStore for InMemoryQueryTimeStore {
    async fn last_query_time(&self, mnemonic: &str) -> Result<Option<DateTime<Utc>>, MonitorError> {
        Ok(self.get(mnemonic))
    }

    async fn record_query_time(&self, mnemonic: &str, at: DateTime<Utc>) -> Result<(), MonitorError> {
        self.times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(mnemonic.to_string(), at);
        Ok(())
    }
}

/// Persistence sink and renderer that record everything they receive.
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(SchemaHandle, TrendEntry)>>,
    plots: Mutex<Vec<PlotRequest>>,
    fail_with: Mutex<Option<MonitorError>>,
}

impl RecordingSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent store and render fail with `error`; `None` restores success.
    pub fn set_failure(&self, error: Option<MonitorError>) {
        *self.fail_with.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    fn check(&self) -> Result<(), MonitorError> {
        match self
            .fail_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stored entries in arrival order.
    #[must_use]
    pub fn entries(&self) -> Vec<(SchemaHandle, TrendEntry)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stored entries for one mnemonic.
    #[must_use]
    pub fn entries_for(&self, mnemonic: &str) -> Vec<TrendEntry> {
        self.entries()
            .into_iter()
            .filter(|(_, e)| e.mnemonic == mnemonic)
            .map(|(_, e)| e)
            .collect()
    }

    /// Render requests in arrival order.
    #[must_use]
    pub fn plots(&self) -> Vec<PlotRequest> {
        self.plots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PersistenceSink for RecordingSink {
    async fn store(&self, schema: SchemaHandle, entry: &TrendEntry) -> Result<(), MonitorError> {
        self.check()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((schema, entry.clone()));
        Ok(())
    }
}

#[async_trait]
impl PlotRenderer for RecordingSink {
    async fn render(&self, request: &PlotRequest) -> Result<(), MonitorError> {
        self.check()?;
        self.plots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        Ok(())
    }
}
