use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use edbmon_core::{MonitorError, TelemetrySource, TimeRange, TimeSeries};

/// Instruction for how fetches of a mnemonic should behave.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value (sliced to the requested range).
    Return(T),
    /// Fail immediately with the provided error.
    Fail(MonitorError),
    /// Hang indefinitely (simulate a timeout).
    Hang,
}

/// One fetch observed by the dynamic mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    /// Requested mnemonic.
    pub mnemonic: String,
    /// Requested range.
    pub range: TimeRange,
}

#[derive(Default)]
struct InternalState {
    rules: HashMap<String, MockBehavior<TimeSeries>>,
    queued_failures: HashMap<String, VecDeque<MonitorError>>,
    latency: Option<Duration>,
    log: Vec<FetchRecord>,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior for fetches of `mnemonic`.
    pub async fn set_behavior(
        &self,
        mnemonic: impl Into<String>,
        behavior: MockBehavior<TimeSeries>,
    ) {
        let mut guard = self.state.lock().await;
        guard.rules.insert(mnemonic.into(), behavior);
    }

    /// Make the next fetch of `mnemonic` fail with `error`, before its rule applies.
    /// Calls accumulate.
    pub async fn fail_next(&self, mnemonic: impl Into<String>, error: MonitorError) {
        let mut guard = self.state.lock().await;
        guard
            .queued_failures
            .entry(mnemonic.into())
            .or_default()
            .push_back(error);
    }

    /// Delay every fetch by `latency` before it resolves.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().await.latency = latency;
    }

    /// Every fetch observed so far, in call order.
    pub async fn fetches(&self) -> Vec<FetchRecord> {
        self.state.lock().await.log.clone()
    }

    /// Fetches observed for one mnemonic.
    pub async fn fetches_of(&self, mnemonic: &str) -> Vec<TimeRange> {
        let guard = self.state.lock().await;
        guard
            .log
            .iter()
            .filter(|r| r.mnemonic == mnemonic)
            .map(|r| r.range)
            .collect()
    }

    /// Clear all configured behaviors and the fetch log.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.rules.clear();
        guard.queued_failures.clear();
        guard.latency = None;
        guard.log.clear();
    }
}

/// A source that defers all behavior to an external controller.
pub struct DynamicMockSource {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockSource {
    /// Create a new dynamic mock source and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
    ) -> (Arc<dyn TelemetrySource>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn TelemetrySource>, controller)
    }
}

#[async_trait]
impl TelemetrySource for DynamicMockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, mnemonic: &str, range: TimeRange) -> Result<TimeSeries, MonitorError> {
        // Snapshot behavior without holding the lock across await points
        let (queued, behavior, latency) = {
            let mut guard = self.state.lock().await;
            guard.log.push(FetchRecord {
                mnemonic: mnemonic.to_string(),
                range,
            });
            let queued = guard
                .queued_failures
                .get_mut(mnemonic)
                .and_then(VecDeque::pop_front);
            (queued, guard.rules.get(mnemonic).cloned(), guard.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(e) = queued {
            return Err(e);
        }
        match behavior {
            Some(MockBehavior::Return(series)) => Ok(series.slice(&range)),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => std::future::pending().await,
            None => Err(MonitorError::not_found(format!("mnemonic {mnemonic}"))),
        }
    }
}
