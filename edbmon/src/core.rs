use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use edbmon_core::{
    AggregationMode, ClipConfig, FetchPolicy, MonitorConfig, MonitorError, PersistenceSink,
    PlotRenderer, QueryTimeStore, TelemetrySource,
};
use edbmon_middleware::{QueryCache, SourceBuilder};

/// Source of the current time, injectable for deterministic runs.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Orchestrator that trends every mnemonic of an instrument catalog.
pub struct Monitor {
    pub(crate) source: Arc<dyn TelemetrySource>,
    pub(crate) store: Option<Arc<dyn QueryTimeStore>>,
    pub(crate) persistence: Option<Arc<dyn PersistenceSink>>,
    pub(crate) renderer: Option<Arc<dyn PlotRenderer>>,
    pub(crate) clock: Clock,
    pub(crate) cfg: MonitorConfig,
}

/// Builder for constructing a `Monitor` with custom collaborators and configuration.
pub struct MonitorBuilder {
    source: Option<Arc<dyn TelemetrySource>>,
    store: Option<Arc<dyn QueryTimeStore>>,
    persistence: Option<Arc<dyn PersistenceSink>>,
    renderer: Option<Arc<dyn PlotRenderer>>,
    clock: Option<Clock>,
    cfg: MonitorConfig,
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorBuilder {
    /// Create a new builder with default configuration.
    ///
    /// Behavior and trade-offs:
    /// - Starts with no source; you must register one via [`Self::with_source`].
    /// - Without a query-time store every run starts from the default epoch and
    ///   nothing is recorded.
    /// - Without a persistence sink or renderer the corresponding emission step
    ///   is skipped.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            store: None,
            persistence: None,
            renderer: None,
            clock: None,
            cfg: MonitorConfig::default(),
        }
    }

    /// Register the raw telemetry source. It is wrapped with the retry layer at build time.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn TelemetrySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Register the store tracking the last processed time of each mnemonic.
    #[must_use]
    pub fn with_query_time_store(mut self, store: Arc<dyn QueryTimeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register the sink receiving trend entries of persisted modes.
    #[must_use]
    pub fn with_persistence(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.persistence = Some(sink);
        self
    }

    /// Register the plot renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn PlotRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Pin "now" to a fixed instant.
    #[must_use]
    pub fn fixed_now(self, now: DateTime<Utc>) -> Self {
        self.with_clock(Arc::new(move || now))
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: MonitorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Bound the number of mnemonics processed concurrently.
    ///
    /// Behavior and trade-offs:
    /// - Higher values finish catalogs sooner but put more concurrent load on
    ///   the telemetry service.
    /// - Windows of one mnemonic are always processed sequentially.
    #[must_use]
    pub const fn max_concurrent_mnemonics(mut self, n: usize) -> Self {
        self.cfg.max_concurrent_mnemonics = n;
        self
    }

    /// Start of processing for mnemonics with no recorded query time.
    #[must_use]
    pub const fn default_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.cfg.default_epoch = epoch;
        self
    }

    /// Window length for modes without an override.
    #[must_use]
    pub const fn default_query_duration(mut self, d: Duration) -> Self {
        self.cfg.default_query_duration = d;
        self
    }

    /// Window length for one mode.
    #[must_use]
    pub fn query_duration(mut self, mode: AggregationMode, d: Duration) -> Self {
        self.cfg.query_durations.insert(mode, d);
        self
    }

    /// Bridge false gaps shorter than `gap` when building condition intervals.
    #[must_use]
    pub const fn condition_min_gap(mut self, gap: Duration) -> Self {
        self.cfg.condition_min_gap = gap;
        self
    }

    /// Sigma-clipping threshold.
    #[must_use]
    pub const fn sigma(mut self, sigma: f64) -> Self {
        self.cfg.sigma = sigma;
        self
    }

    /// Jump threshold for every-change grouping, in robust standard deviations.
    #[must_use]
    pub const fn change_threshold_sigma(mut self, sigma: f64) -> Self {
        self.cfg.change_threshold_sigma = sigma;
        self
    }

    /// Iteration cap for sigma clipping.
    #[must_use]
    pub const fn max_clip_iterations(mut self, n: usize) -> Self {
        self.cfg.max_clip_iterations = n;
        self
    }

    /// Per-fetch timeout and retry policy.
    ///
    /// Behavior and trade-offs:
    /// - Only retrieval failures and timeouts are retried; unknown mnemonics fail at once.
    /// - Longer backoff is gentler on a struggling service but slows a run
    ///   that hits many transient failures.
    #[must_use]
    pub const fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.cfg.fetch = policy;
        self
    }

    /// Build the `Monitor`.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no source was registered or a numeric setting is
    /// out of range.
    pub fn build(self) -> Result<Monitor, MonitorError> {
        let Some(raw) = self.source else {
            return Err(MonitorError::InvalidArg(
                "no telemetry source registered; add one via with_source(...)".to_string(),
            ));
        };
        validate(&self.cfg)?;

        let source = SourceBuilder::new(raw).with_retry(self.cfg.fetch).build();
        let clock: Clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(Utc::now),
        };
        Ok(Monitor {
            source,
            store: self.store,
            persistence: self.persistence,
            renderer: self.renderer,
            clock,
            cfg: self.cfg,
        })
    }
}

fn validate(cfg: &MonitorConfig) -> Result<(), MonitorError> {
    let invalid = |what: &str| Err(MonitorError::InvalidArg(what.to_string()));
    if cfg.max_concurrent_mnemonics == 0 {
        return invalid("max_concurrent_mnemonics must be at least 1");
    }
    if !(cfg.sigma.is_finite() && cfg.sigma > 0.0) {
        return invalid("sigma must be positive");
    }
    if !(cfg.change_threshold_sigma.is_finite() && cfg.change_threshold_sigma > 0.0) {
        return invalid("change_threshold_sigma must be positive");
    }
    if cfg.max_clip_iterations == 0 {
        return invalid("max_clip_iterations must be at least 1");
    }
    if cfg.default_query_duration.is_zero() || cfg.query_durations.values().any(Duration::is_zero)
    {
        return invalid("query durations must be positive");
    }
    if cfg.fetch.max_attempts == 0 {
        return invalid("fetch.max_attempts must be at least 1");
    }
    if cfg.fetch.timeout.is_zero() {
        return invalid("fetch.timeout must be positive");
    }
    Ok(())
}

impl Monitor {
    /// Start building a new `Monitor`.
    #[must_use]
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.cfg
    }

    /// Fresh run-scoped cache over the wrapped source.
    ///
    /// Share one across [`Monitor::run_with_cache`] calls to reuse fetched
    /// dependencies between the instruments of a single pass.
    #[must_use]
    pub fn new_cache(&self) -> QueryCache {
        QueryCache::new(Arc::clone(&self.source))
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub(crate) const fn clip(&self) -> ClipConfig {
        ClipConfig {
            sigma: self.cfg.sigma,
            max_iterations: self.cfg.max_clip_iterations,
        }
    }
}
