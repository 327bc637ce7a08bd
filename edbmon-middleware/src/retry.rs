//! Timeout and retry wrapper for telemetry sources.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edbmon_core::{Middleware, MonitorError, TelemetrySource, TimeRange, TimeSeries};
use edbmon_types::FetchPolicy;
use serde_json::json;

use crate::backoff::jitter_wait;

/// Source wrapper bounding each attempt with a timeout and retrying
/// retryable failures with jittered exponential backoff.
pub struct RetryingSource {
    inner: Arc<dyn TelemetrySource>,
    policy: FetchPolicy,
}

impl RetryingSource {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: Arc<dyn TelemetrySource>, policy: FetchPolicy) -> Self {
        Self { inner, policy }
    }

    /// Access the inner source.
    pub fn inner(&self) -> &Arc<dyn TelemetrySource> {
        &self.inner
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.policy.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[async_trait]
impl TelemetrySource for RetryingSource {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "edbmon_middleware::retry::fetch",
            skip(self),
            fields(
                source = self.inner.name(),
                timeout_ms = self.timeout_ms(),
                max_attempts = self.policy.max_attempts,
            ),
        )
    )]
    async fn fetch(&self, mnemonic: &str, range: TimeRange) -> Result<TimeSeries, MonitorError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = tokio::time::timeout(self.policy.timeout, self.inner.fetch(mnemonic, range))
                .await
                .unwrap_or_else(|_| Err(MonitorError::timeout(mnemonic, self.timeout_ms())));
            match result {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = &self.policy.backoff;
                    let delay_ms = jitter_wait(
                        backoff.base_delay_ms(attempt),
                        u32::from(backoff.jitter_percent),
                    );
                    #[cfg(feature = "tracing")]
                    tracing::warn!(mnemonic, attempt, delay_ms, error = %e, "fetch failed, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Middleware that wraps a source in a [`RetryingSource`].
pub struct RetryMiddleware {
    policy: FetchPolicy,
}

impl RetryMiddleware {
    /// Build the middleware from a fetch policy.
    #[must_use]
    pub const fn new(policy: FetchPolicy) -> Self {
        Self { policy }
    }
}

impl Middleware for RetryMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn TelemetrySource>) -> Arc<dyn TelemetrySource> {
        Arc::new(RetryingSource::new(inner, self.policy))
    }

    fn name(&self) -> &'static str {
        "RetryingSource"
    }

    fn config_json(&self) -> serde_json::Value {
        let b = self.policy.backoff;
        json!({
            "timeout_ms": u64::try_from(self.policy.timeout.as_millis()).unwrap_or(u64::MAX),
            "max_attempts": self.policy.max_attempts,
            "min_backoff_ms": b.min_backoff_ms,
            "max_backoff_ms": b.max_backoff_ms,
            "factor": b.factor,
            "jitter_percent": b.jitter_percent,
        })
    }
}
