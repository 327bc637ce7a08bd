use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use edbmon::{
    AggregationMode, DependencySpec, Instrument, MnemonicCatalog, MnemonicConfig, MnemonicStatus,
    Relation, SchemaHandle,
};
use edbmon_mock::{DynamicMockSource, MockSource};

use crate::helpers::{Env, LogCapture, day, dt, init_tracing};

const TARGET: &str = "SE_ZIMIRICEA";

fn daily_catalog() -> MnemonicCatalog {
    MnemonicCatalog::new().with(
        AggregationMode::DailyMeans,
        MnemonicConfig::new(TARGET).with_dependency(DependencySpec::new(
            "IMIR_HK_ICE_SEC_VOLT4",
            Relation::GreaterThan,
            25.0,
        )),
    )
}

#[tokio::test]
async fn processes_each_pending_day_and_records_now() {
    init_tracing();
    let env = Env::with_history(&[(TARGET, day(1))]);
    let monitor = env.monitor(Arc::new(MockSource::new()), day(3));

    let report = monitor.run(Instrument::Miri, &daily_catalog()).await;
    let outcome = report.outcome(TARGET).unwrap();
    assert_eq!(outcome.status, MnemonicStatus::Done);
    assert_eq!(outcome.windows_processed, 2);
    assert_eq!(outcome.windows_skipped, 0);
    assert_eq!(outcome.latest_query, Some(day(3)));

    let entries = env.sink.entries();
    assert_eq!(entries.len(), 1);
    let (schema, entry) = &entries[0];
    assert_eq!(*schema, SchemaHandle::MIRI);
    assert_eq!(entry.mode, AggregationMode::DailyMeans);
    assert_eq!(entry.latest_query, day(3));
    assert_eq!(entry.entry_date, day(3));
    assert_eq!(
        entry.stats.times,
        vec![dt(2024, 1, 1, 12, 0, 0), dt(2024, 1, 2, 12, 0, 0)]
    );
    assert!(entry.stats.means.iter().all(|m| m.is_finite()));
    assert!(entry.dependency_stats.is_none());

    assert_eq!(env.store.get(TARGET), Some(day(3)));
}

#[tokio::test]
async fn last_query_in_the_future_processes_nothing() {
    let logs = LogCapture::default();
    let _guard = logs.install();
    let env = Env::with_history(&[(TARGET, day(5))]);
    let (source, ctrl) = DynamicMockSource::new_with_controller("dyn");
    let monitor = env.monitor(source, day(3));

    let report = monitor.run(Instrument::Miri, &daily_catalog()).await;
    let skipped = logs.lines_with("mnemonic skipped");
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].contains("window_start=Some(2024-01-05T00:00:00Z)"));
    assert!(skipped[0].contains("window_end=Some(2024-01-03T00:00:00Z)"));
    assert!(skipped[0].contains("no window pending"));
    let outcome = report.outcome(TARGET).unwrap();
    assert_eq!(outcome.status, MnemonicStatus::Skipped);
    assert_eq!(outcome.windows_processed + outcome.windows_skipped, 0);
    assert_eq!(outcome.latest_query, None);
    assert!(ctrl.fetches().await.is_empty());
    assert_eq!(env.store.get(TARGET), Some(day(5)));
}

#[tokio::test]
async fn no_history_starts_at_epoch_and_clamps_to_now() {
    let env = Env::new();
    let now = day(2) + TimeDelta::hours(6);
    let monitor = env.monitor(Arc::new(MockSource::new()), now);

    let report = monitor.run(Instrument::Miri, &daily_catalog()).await;
    let outcome = report.outcome(TARGET).unwrap();
    assert_eq!(outcome.windows_processed, 2);
    assert_eq!(outcome.latest_query, Some(now));

    let entry = &env.sink.entries_for(TARGET)[0];
    assert_eq!(entry.stats.len(), 2);
    assert_eq!(env.store.get(TARGET), Some(now));
}

#[tokio::test]
async fn one_window_spanning_two_days_yields_two_daily_bins() {
    let env = Env::with_history(&[(TARGET, day(1))]);
    let monitor = env
        .builder(Arc::new(MockSource::new()), day(3))
        .query_duration(AggregationMode::DailyMeans, Duration::from_secs(2 * 86_400))
        .build()
        .unwrap();

    let report = monitor.run(Instrument::Miri, &daily_catalog()).await;
    assert_eq!(report.outcome(TARGET).unwrap().windows_processed, 1);
    assert_eq!(env.sink.entries_for(TARGET)[0].stats.len(), 2);
}

#[tokio::test]
async fn second_run_only_processes_new_windows() {
    let env = Env::with_history(&[(TARGET, day(1))]);
    env.monitor(Arc::new(MockSource::new()), day(3))
        .run(Instrument::Miri, &daily_catalog())
        .await;

    let report = env
        .monitor(Arc::new(MockSource::new()), day(4))
        .run(Instrument::Miri, &daily_catalog())
        .await;
    assert_eq!(report.outcome(TARGET).unwrap().windows_processed, 1);

    let entries = env.sink.entries_for(TARGET);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].stats.times, vec![dt(2024, 1, 3, 12, 0, 0)]);
    assert_eq!(env.store.get(TARGET), Some(day(4)));
}
