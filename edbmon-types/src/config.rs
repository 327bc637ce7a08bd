//! Configuration types shared by the orchestrator and middleware.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mnemonic::AggregationMode;

/// 2015-12-01T00:00:00Z, used when a mnemonic has never been queried.
pub const DEFAULT_EPOCH_SECS: i64 = 1_448_928_000;

/// Exponential backoff configuration for retrying telemetry fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Minimum backoff delay in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor to increase delay after each failure (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff_ms: 500,
            max_backoff_ms: 30_000,
            factor: 2,
            jitter_percent: 20,
        }
    }
}

impl BackoffConfig {
    /// Base delay before retry number `attempt` (1-based), without jitter.
    #[must_use]
    pub fn base_delay_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1);
        let factor = u64::from(self.factor.max(1));
        let mut delay = self.min_backoff_ms;
        for _ in 0..exp {
            delay = delay.saturating_mul(factor);
            if delay >= self.max_backoff_ms {
                break;
            }
        }
        delay.min(self.max_backoff_ms)
    }
}

/// Timeout and retry policy applied to each remote fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// Upper bound on one fetch attempt.
    pub timeout: Duration,
    /// Total attempts including the first (>= 1).
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffConfig,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Global configuration for the `Monitor` orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Upper bound on mnemonics processed concurrently.
    pub max_concurrent_mnemonics: usize,
    /// Start of the first window for mnemonics with no query history, and of
    /// the single window used by `none` mode.
    pub default_epoch: DateTime<Utc>,
    /// Window length for modes without an explicit override.
    pub default_query_duration: Duration,
    /// Per-mode window length overrides.
    pub query_durations: BTreeMap<AggregationMode, Duration>,
    /// False gaps shorter than this are bridged when building condition intervals.
    pub condition_min_gap: Duration,
    /// Clipping threshold for robust statistics.
    pub sigma: f64,
    /// Jump threshold, in robust standard deviations, for every-change grouping.
    pub change_threshold_sigma: f64,
    /// Iteration cap for sigma clipping.
    pub max_clip_iterations: usize,
    /// Per-fetch timeout and retry policy.
    pub fetch: FetchPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_mnemonics: 4,
            default_epoch: DateTime::<Utc>::from_timestamp(DEFAULT_EPOCH_SECS, 0)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            default_query_duration: Duration::from_secs(86_400),
            query_durations: BTreeMap::new(),
            condition_min_gap: Duration::ZERO,
            sigma: 3.0,
            change_threshold_sigma: 3.0,
            max_clip_iterations: 10,
            fetch: FetchPolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Window length used when planning queries for `mode`.
    #[must_use]
    pub fn query_duration(&self, mode: AggregationMode) -> Duration {
        self.query_durations
            .get(&mode)
            .copied()
            .unwrap_or(self.default_query_duration)
    }
}
