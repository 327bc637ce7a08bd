use std::sync::Arc;

use edbmon::{
    AggregationMode, DependencySpec, FetchPolicy, Instrument, MnemonicCatalog, MnemonicConfig,
    MnemonicStatus, MonitorError, Relation, TimeRange,
};
use edbmon_mock::{DynamicMockSource, MockBehavior, MockSource};

use crate::helpers::{Env, LogCapture, day, dt, fast_policy, hourly};

#[tokio::test]
async fn configuration_errors_stop_before_any_fetch() {
    let env = Env::new();
    let (source, ctrl) = DynamicMockSource::new_with_controller("dyn");
    let monitor = env.monitor(source, day(3));

    let catalog = MnemonicCatalog::new()
        .with(AggregationMode::EveryChange, MnemonicConfig::new("A"))
        .with(AggregationMode::TimeInterval, MnemonicConfig::new("B"))
        .with(
            AggregationMode::BlockMeans,
            MnemonicConfig::new("C").with_dependency(DependencySpec::new(
                "not a name",
                Relation::Equal,
                1.0,
            )),
        );
    let report = monitor.run(Instrument::Nircam, &catalog).await;

    assert_eq!(report.failed(), 3);
    for outcome in &report.outcomes {
        assert!(
            matches!(
                outcome.status,
                MnemonicStatus::Failed(MonitorError::Configuration(_))
            ),
            "{}: {:?}",
            outcome.name,
            outcome.status
        );
        assert_eq!(outcome.windows_processed + outcome.windows_skipped, 0);
    }
    assert!(ctrl.fetches().await.is_empty());
    assert!(env.sink.entries().is_empty());
}

#[tokio::test]
async fn failed_window_does_not_block_later_windows() {
    let env = Env::with_history(&[("A", day(1))]);
    let (source, ctrl) = DynamicMockSource::new_with_controller("dyn");
    ctrl.set_behavior("A", MockBehavior::Return(hourly("A", day(1), 48, |_| 1.0)))
        .await;
    ctrl.fail_next("A", MonitorError::retrieval("A", "service unavailable"))
        .await;
    let monitor = env.monitor(source, day(3));

    let report = monitor
        .run(
            Instrument::Nircam,
            &MnemonicCatalog::new().with(AggregationMode::DailyMeans, MnemonicConfig::new("A")),
        )
        .await;
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, MnemonicStatus::Done);
    assert_eq!((outcome.windows_processed, outcome.windows_skipped), (1, 1));
    assert!(matches!(
        outcome.warnings.as_slice(),
        [MonitorError::Retrieval { .. }]
    ));

    let entry = &env.sink.entries_for("A")[0];
    assert_eq!(entry.stats.times, vec![dt(2024, 1, 2, 12, 0, 0)]);
    assert_eq!(entry.stats.means, vec![1.0]);
    assert_eq!(env.store.get("A"), Some(day(3)));
}

#[tokio::test]
async fn unknown_mnemonic_fails_only_itself() {
    let env = Env::with_history(&[("UNKNOWN_MNEMONIC", day(1)), ("SE_ZIMIRICEA", day(1))]);
    let monitor = env.monitor(Arc::new(MockSource::new()), day(3));

    let catalog = MnemonicCatalog::new()
        .with(
            AggregationMode::DailyMeans,
            MnemonicConfig::new("UNKNOWN_MNEMONIC"),
        )
        .with(AggregationMode::DailyMeans, MnemonicConfig::new("SE_ZIMIRICEA"));
    let report = monitor.run(Instrument::Miri, &catalog).await;

    assert!(matches!(
        report.outcomes[0].status,
        MnemonicStatus::Failed(MonitorError::NotFound { .. })
    ));
    assert_eq!(report.outcomes[1].status, MnemonicStatus::Done);
    assert_eq!(report.failed(), 1);
    assert_eq!(env.store.get("UNKNOWN_MNEMONIC"), Some(day(1)));
    assert_eq!(env.store.get("SE_ZIMIRICEA"), Some(day(3)));
}

#[tokio::test]
async fn all_windows_empty_is_skipped_without_persisting() {
    let env = Env::with_history(&[("SE_ZIMIRICEA", day(1))]);
    let monitor = env.monitor(Arc::new(MockSource::new()), day(3));

    let catalog = MnemonicCatalog::new().with(
        AggregationMode::DailyMeans,
        MnemonicConfig::new("SE_ZIMIRICEA").with_dependency(DependencySpec::new(
            "IMIR_HK_ICE_SEC_VOLT4",
            Relation::LessThan,
            0.0,
        )),
    );
    let report = monitor.run(Instrument::Miri, &catalog).await;

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, MnemonicStatus::Skipped);
    assert_eq!(outcome.windows_skipped, 2);
    assert!(outcome.warnings.is_empty());
    assert!(env.sink.entries().is_empty());
    // empty windows are not re-queried on the next run
    assert_eq!(env.store.get("SE_ZIMIRICEA"), Some(day(3)));
}

#[tokio::test]
async fn outage_across_every_window_fails_and_keeps_query_time() {
    let logs = LogCapture::default();
    let _guard = logs.install();
    let env = Env::with_history(&[("A", day(1))]);
    let (source, ctrl) = DynamicMockSource::new_with_controller("dyn");
    ctrl.set_behavior(
        "A",
        MockBehavior::Fail(MonitorError::retrieval("A", "service unavailable")),
    )
    .await;
    let monitor = env.monitor(source, day(4));

    let report = monitor
        .run(
            Instrument::Nircam,
            &MnemonicCatalog::new().with(AggregationMode::DailyMeans, MnemonicConfig::new("A")),
        )
        .await;
    let outcome = &report.outcomes[0];
    assert!(matches!(
        outcome.status,
        MnemonicStatus::Failed(MonitorError::Retrieval { .. })
    ));
    assert_eq!((outcome.windows_processed, outcome.windows_skipped), (0, 3));
    assert_eq!(outcome.warnings.len(), 3);
    assert!(env.sink.entries().is_empty());
    // the same windows are fetched again on the next run
    assert_eq!(env.store.get("A"), Some(day(1)));

    assert_eq!(logs.lines_with("window failed").len(), 3);
    let failed = logs.lines_with("mnemonic failed");
    assert_eq!(failed.len(), 1);
    assert!(failed[0].contains("window_start=Some(2024-01-01T00:00:00Z)"));
    assert!(failed[0].contains("window_end=Some(2024-01-04T00:00:00Z)"));
    assert!(failed[0].contains("windows_failed=3"));
}

#[tokio::test]
async fn empty_and_failed_windows_without_data_fail() {
    let env = Env::with_history(&[("A", day(1))]);
    let (source, ctrl) = DynamicMockSource::new_with_controller("dyn");
    // no samples anywhere, so the successful windows come back empty
    ctrl.set_behavior("A", MockBehavior::Return(hourly("A", day(10), 1, |_| 1.0)))
        .await;
    ctrl.fail_next("A", MonitorError::retrieval("A", "service unavailable"))
        .await;
    let monitor = env.monitor(source, day(3));

    let report = monitor
        .run(
            Instrument::Nircam,
            &MnemonicCatalog::new().with(AggregationMode::DailyMeans, MnemonicConfig::new("A")),
        )
        .await;
    let outcome = &report.outcomes[0];
    assert!(matches!(outcome.status, MnemonicStatus::Failed(_)));
    assert_eq!(outcome.windows_skipped, 2);
    assert_eq!(env.store.get("A"), Some(day(1)));
}

#[tokio::test(start_paused = true)]
async fn transient_fetch_failure_is_retried() {
    let env = Env::new();
    let (source, ctrl) = DynamicMockSource::new_with_controller("dyn");
    ctrl.set_behavior("A", MockBehavior::Return(hourly("A", day(1), 24, |h| h as f64)))
        .await;
    ctrl.fail_next("A", MonitorError::retrieval("A", "503")).await;
    let monitor = env
        .builder(source, day(2))
        .fetch_policy(FetchPolicy {
            max_attempts: 2,
            ..fast_policy()
        })
        .build()
        .unwrap();

    let report = monitor
        .run(
            Instrument::Fgs,
            &MnemonicCatalog::new().with(AggregationMode::BlockMeans, MnemonicConfig::new("A")),
        )
        .await;
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, MnemonicStatus::Done);
    assert!(outcome.warnings.is_empty());

    let window = TimeRange::new(day(1), day(2)).unwrap();
    assert_eq!(ctrl.fetches_of("A").await, vec![window, window]);
}
