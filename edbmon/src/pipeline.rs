//! Processing of one mnemonic: windows, filtering, aggregation and emission.

use chrono::{DateTime, TimeDelta, Utc};
use edbmon_core::{
    AggregationMode, Instrument, MnemonicConfig, MnemonicOutcome, MonitorError, PlotData,
    PlotRequest, TimeRange, TimeSeries, TrendEntry, always_true, combine, extract, multiply,
    relation_test,
};
use edbmon_middleware::QueryCache;

use crate::aggregate::{Accumulated, AggregatedData, Aggregation};
use crate::core::Monitor;
use crate::state::{Event, Phase, Tracker};
use crate::windows::plan_windows;

impl Monitor {
    /// Drive one mnemonic from window planning through emission.
    #[tracing::instrument(
        name = "edbmon::process_mnemonic",
        skip_all,
        fields(instrument = %instrument, mnemonic = %config.name, mode = %mode),
    )]
    pub(crate) async fn process_mnemonic(
        &self,
        instrument: Instrument,
        mode: AggregationMode,
        config: &MnemonicConfig,
        cache: &QueryCache,
    ) -> MnemonicOutcome {
        let mut outcome = MnemonicOutcome::new(config.name.as_str(), mode);

        let aggregation = match config
            .validate()
            .and_then(|()| Aggregation::resolve(mode, config))
        {
            Ok(a) => a,
            Err(e) => return finish(outcome, Tracker::new().handle(Event::Abort(e)), None),
        };

        let last = if mode.is_persisted() {
            match self.last_query_time(&config.name).await {
                Ok(last) => last,
                Err(e) => return finish(outcome, Tracker::new().handle(Event::Abort(e)), None),
            }
        } else {
            None
        };

        let now = self.now();
        let windows = plan_windows(mode, last, &self.cfg, now);
        outcome.latest_query = windows.last().map(|w| w.end);
        let span = match (windows.first(), windows.last()) {
            (Some(first), Some(final_window)) => (first.start, final_window.end),
            _ => (last.unwrap_or(self.cfg.default_epoch), now),
        };
        let mut tracker = Tracker::new().handle(Event::Planned {
            windows: windows.len(),
        });

        let mut acc = Accumulated::default();
        for window in &windows {
            match self.process_window(config, aggregation, *window, cache).await {
                Ok((filtered, data)) => {
                    acc.absorb(filtered, data);
                    tracker = tracker.handle(Event::WindowDone);
                }
                Err(e) if e.aborts_mnemonic() => {
                    tracker = tracker.handle(Event::Abort(e));
                    break;
                }
                Err(e) if e.is_insufficient_data() => {
                    tracing::info!(
                        mnemonic = %config.name,
                        window_start = %window.start,
                        window_end = %window.end,
                        reason = %e,
                        "window skipped"
                    );
                    tracker = tracker.handle(Event::WindowSkipped);
                }
                Err(e) => {
                    tracing::warn!(
                        mnemonic = %config.name,
                        window_start = %window.start,
                        window_end = %window.end,
                        reason = %e,
                        "window failed"
                    );
                    outcome.warnings.push(e.clone());
                    tracker = tracker.handle(Event::WindowFailed(e));
                }
            }
        }

        if let (Some(latest), false) = (outcome.latest_query, tracker.is_failed()) {
            if tracker.is_done() {
                if let Err(e) = self
                    .emit(instrument, mode, config, &acc, latest, cache, &mut outcome.warnings)
                    .await
                {
                    tracker = tracker.handle(Event::EmitFailed(e));
                }
            } else {
                self.record_query_time(mode, &config.name, latest, &mut outcome.warnings)
                    .await;
            }
        }
        finish(outcome, tracker, Some(span))
    }

    /// Fetch, filter and aggregate one window.
    async fn process_window(
        &self,
        config: &MnemonicConfig,
        aggregation: Aggregation,
        window: TimeRange,
        cache: &QueryCache,
    ) -> Result<(TimeSeries, AggregatedData), MonitorError> {
        let target = cache.get_or_fetch(&config.name, window).await?;
        let min_gap = TimeDelta::from_std(self.cfg.condition_min_gap).unwrap_or(TimeDelta::MAX);

        // windows abut, so each one only owns `[start, end)`
        let mut conditions = Vec::with_capacity(config.dependency.len() + 1);
        conditions.push(always_true(&window));
        let mut dependencies = Vec::with_capacity(config.dependency.len());
        for dep in &config.dependency {
            let series = cache.get_or_fetch(&dep.name, window).await?;
            conditions.push(relation_test(&series, dep.relation, dep.threshold, min_gap));
            dependencies.push(series);
        }

        let intervals = combine(&conditions, &window);
        let filtered = extract(&target, &intervals);
        if filtered.is_empty() {
            return Err(MonitorError::insufficient_data(
                config.name.as_str(),
                "no samples satisfy the dependency conditions",
            ));
        }

        let dependency = match aggregation {
            Aggregation::EveryChange => dependencies.first().map(|d| extract(d, &intervals)),
            _ => None,
        };
        let data = aggregation.apply(
            &filtered,
            dependency.as_ref(),
            self.cfg.change_threshold_sigma,
            &self.clip(),
        )?;
        Ok((filtered, data))
    }

    /// Persist, record and render a finished mnemonic.
    ///
    /// Collaborator failures become warnings. Only a failed combination is
    /// returned as an error, after persistence has already happened.
    #[allow(clippy::too_many_arguments)]
    async fn emit(
        &self,
        instrument: Instrument,
        mode: AggregationMode,
        config: &MnemonicConfig,
        acc: &Accumulated,
        latest: DateTime<Utc>,
        cache: &QueryCache,
        warnings: &mut Vec<MonitorError>,
    ) -> Result<(), MonitorError> {
        let mut persisted = true;
        if mode.is_persisted()
            && let Some(sink) = &self.persistence
        {
            let entry = TrendEntry {
                mnemonic: config.name.clone(),
                mode,
                latest_query: latest,
                stats: acc.stats.clone().unwrap_or_default(),
                dependency_stats: acc.dependency_stats.clone(),
                entry_date: self.now(),
            };
            if let Err(e) = sink.store(instrument.schema(), &entry).await {
                tracing::warn!(mnemonic = %config.name, schema = %instrument.schema(), error = %e, "persistence failed");
                warnings.push(e);
                persisted = false;
            }
        }
        // a failed write is retried on the next run
        if persisted {
            self.record_query_time(mode, &config.name, latest, warnings)
                .await;
        }

        let (Some(renderer), Some(series)) = (&self.renderer, &acc.series) else {
            return Ok(());
        };
        let series = match &config.plot_data {
            PlotData::Nominal => series.clone(),
            PlotData::Product(other) => combine_with(series, other, cache).await?,
        };
        let request = PlotRequest {
            series,
            stats: acc.stats.clone(),
            nominal_value: config.nominal_value,
            yellow_limits: config.yellow_limits,
            red_limits: config.red_limits,
        };
        if let Err(e) = renderer.render(&request).await {
            tracing::warn!(mnemonic = %config.name, error = %e, "rendering failed");
            warnings.push(e);
        }
        Ok(())
    }

    async fn last_query_time(&self, mnemonic: &str) -> Result<Option<DateTime<Utc>>, MonitorError> {
        match &self.store {
            Some(store) => store.last_query_time(mnemonic).await,
            None => Ok(None),
        }
    }

    async fn record_query_time(
        &self,
        mode: AggregationMode,
        mnemonic: &str,
        at: DateTime<Utc>,
        warnings: &mut Vec<MonitorError>,
    ) {
        if !mode.is_persisted() {
            return;
        }
        let Some(store) = &self.store else { return };
        if let Err(e) = store.record_query_time(mnemonic, at).await {
            tracing::warn!(mnemonic, error = %e, "recording query time failed");
            warnings.push(e);
        }
    }
}

/// Product of `series` with `other` fetched over `series`' data range.
async fn combine_with(
    series: &TimeSeries,
    other: &str,
    cache: &QueryCache,
) -> Result<TimeSeries, MonitorError> {
    let range = series
        .data_range()
        .ok_or_else(|| MonitorError::insufficient_overlap(series.name(), other))?;
    let other = cache.get_or_fetch(other, range).await?;
    multiply(series, &other)
}

/// Log the terminal phase and fill in the outcome.
///
/// `span` is the planned processing range, or the range from the last query
/// time to now when nothing was planned; `None` when planning never ran.
fn finish(
    mut outcome: MnemonicOutcome,
    tracker: Tracker,
    span: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> MnemonicOutcome {
    let window_start = span.map(|(start, _)| start);
    let window_end = span.map(|(_, end)| end);
    match &tracker.phase {
        Phase::Failed(e) => {
            tracing::error!(
                mnemonic = %outcome.name,
                window_start = ?window_start,
                window_end = ?window_end,
                windows_failed = tracker.failed,
                reason = %e,
                "mnemonic failed"
            );
        }
        Phase::Skipped => {
            let reason = if tracker.skipped == 0 {
                "no window pending"
            } else {
                "no window produced qualifying data"
            };
            tracing::info!(
                mnemonic = %outcome.name,
                window_start = ?window_start,
                window_end = ?window_end,
                windows = tracker.skipped,
                reason,
                "mnemonic skipped"
            );
        }
        _ => {}
    }
    outcome.windows_processed = tracker.processed;
    outcome.windows_skipped = tracker.skipped;
    outcome.status = tracker.status();
    outcome
}
