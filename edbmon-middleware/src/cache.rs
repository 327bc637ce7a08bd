//! Run-scoped cache of fetched telemetry ranges.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use edbmon_core::timeseries::merge::merge;
use edbmon_core::{MonitorError, TelemetrySource, TimeRange, TimeSeries};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Clone)]
struct Entry {
    series: TimeSeries,
    coverage: TimeRange,
}

type Slot = Arc<AsyncMutex<Option<Entry>>>;

/// Memoizes fetched ranges per mnemonic for the lifetime of one run.
///
/// Coverage per mnemonic is a single contiguous range that only grows. A
/// request inside the coverage is served from memory; otherwise the parts
/// before and after the coverage are fetched and merged in, deduplicating by
/// timestamp with fetched values taking precedence. A failed fetch leaves the
/// entry untouched.
pub struct QueryCache {
    source: Arc<dyn TelemetrySource>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl QueryCache {
    /// Create an empty cache over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Underlying source.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn TelemetrySource> {
        &self.source
    }

    fn slot(&self, mnemonic: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(mnemonic.to_string()).or_default())
    }

    /// Samples of `mnemonic` within `range`, fetching only what is not cached.
    ///
    /// # Errors
    /// Propagates the source's error; the cached entry is not modified.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "edbmon_middleware::cache::get_or_fetch",
            skip(self),
            fields(source = self.source.name()),
        )
    )]
    pub async fn get_or_fetch(
        &self,
        mnemonic: &str,
        range: TimeRange,
    ) -> Result<TimeSeries, MonitorError> {
        let slot = self.slot(mnemonic);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref()
            && entry.coverage.covers(&range)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(mnemonic, "cache hit");
            return Ok(entry.series.slice(&range));
        }

        let mut acc = guard.clone();
        for piece in missing_ranges(acc.as_ref().map(|e| e.coverage), range) {
            #[cfg(feature = "tracing")]
            tracing::debug!(mnemonic, start = %piece.start, end = %piece.end, "cache miss, fetching");
            let fetched = self.source.fetch(mnemonic, piece).await?;
            acc = Some(match acc {
                Some(e) => Entry {
                    series: merge(&e.series, &fetched),
                    coverage: e.coverage.hull(&piece),
                },
                None => Entry {
                    series: fetched,
                    coverage: piece,
                },
            });
        }

        let out = acc.as_ref().map_or_else(
            || TimeSeries::empty(mnemonic, range),
            |e| e.series.slice(&range),
        );
        *guard = acc;
        Ok(out)
    }

    /// Range currently cached for `mnemonic`.
    pub async fn coverage(&self, mnemonic: &str) -> Option<TimeRange> {
        let slot = self.slot(mnemonic);
        let guard = slot.lock().await;
        guard.as_ref().map(|e| e.coverage)
    }

    /// Whole cached series for `mnemonic`.
    pub async fn cached(&self, mnemonic: &str) -> Option<TimeSeries> {
        let slot = self.slot(mnemonic);
        let guard = slot.lock().await;
        guard.as_ref().map(|e| e.series.clone())
    }

    /// Number of mnemonics with cached data.
    pub async fn len(&self) -> usize {
        let slots: Vec<Slot> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut n = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                n += 1;
            }
        }
        n
    }

    /// True if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Sub-ranges of `requested` outside `coverage`, keeping coverage contiguous:
/// `[requested.start, coverage.start]` and `[coverage.end, requested.end]`.
fn missing_ranges(coverage: Option<TimeRange>, requested: TimeRange) -> Vec<TimeRange> {
    let Some(cov) = coverage else {
        return vec![requested];
    };
    let mut out = Vec::with_capacity(2);
    if requested.start < cov.start {
        out.push(TimeRange {
            start: requested.start,
            end: cov.start,
        });
    }
    if requested.end > cov.end {
        out.push(TimeRange {
            start: cov.end,
            end: requested.end,
        });
    }
    out
}
