use std::sync::Arc;

use edbmon::{
    AggregationMode, Instrument, MnemonicCatalog, MnemonicConfig, MnemonicStatus, MonitorError,
    PlotData,
};
use edbmon_mock::{DynamicMockSource, MockBehavior, MockSource};

use crate::helpers::{Env, day, dt, hourly};

#[tokio::test]
async fn none_mode_renders_raw_samples_without_persisting() {
    let env = Env::new();
    let monitor = env.monitor(Arc::new(MockSource::new()), day(2));

    let config = MnemonicConfig {
        nominal_value: Some(0.2),
        yellow_limits: Some([0.1, 0.3]),
        ..MnemonicConfig::new("SE_ZIMIRICEA")
    };
    let report = monitor
        .run(
            Instrument::Miri,
            &MnemonicCatalog::new().with(AggregationMode::None, config),
        )
        .await;
    assert_eq!(report.outcomes[0].status, MnemonicStatus::Done);

    assert!(env.sink.entries().is_empty());
    assert_eq!(env.store.get("SE_ZIMIRICEA"), None);

    let plots = env.sink.plots();
    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].series.name(), "SE_ZIMIRICEA");
    assert_eq!(plots[0].series.len(), 96);
    assert_eq!(plots[0].stats, None);
    assert_eq!(plots[0].nominal_value, Some(0.2));
    assert_eq!(plots[0].yellow_limits, Some([0.1, 0.3]));
    assert_eq!(plots[0].red_limits, None);
}

#[tokio::test]
async fn product_directive_renders_combined_series() {
    let env = Env::with_history(&[("IMIR_HK_FW_POS_RATIO", day(1))]);
    let monitor = env.monitor(Arc::new(MockSource::new()), day(2));

    let config = MnemonicConfig::new("IMIR_HK_FW_POS_RATIO")
        .with_plot_data(PlotData::Product("IMIR_HK_FW_POS_VOLT".into()));
    let report = monitor
        .run(
            Instrument::Miri,
            &MnemonicCatalog::new().with(AggregationMode::BlockMeans, config),
        )
        .await;
    assert_eq!(report.outcomes[0].status, MnemonicStatus::Done);

    let plot = &env.sink.plots()[0];
    assert_eq!(plot.series.name(), "IMIR_HK_FW_POS_RATIO*IMIR_HK_FW_POS_VOLT");
    assert_eq!(plot.series.len(), 96);
    assert!(
        plot.series
            .values()
            .iter()
            .all(|v| *v == 0.5 || *v == 2.5)
    );
    // stats stay those of the target
    assert_eq!(plot.stats.as_ref().unwrap().means, vec![0.5]);
    assert_eq!(env.sink.entries_for("IMIR_HK_FW_POS_RATIO").len(), 1);
}

#[tokio::test]
async fn failed_combination_fails_after_persisting() {
    let env = Env::with_history(&[("A", day(1))]);
    let (source, ctrl) = DynamicMockSource::new_with_controller("dyn");
    ctrl.set_behavior("A", MockBehavior::Return(hourly("A", day(1), 24, |_| 2.0)))
        .await;
    // B only has data from a year earlier
    ctrl.set_behavior(
        "B",
        MockBehavior::Return(hourly("B", dt(2023, 1, 1, 0, 0, 0), 24, |_| 3.0)),
    )
    .await;
    let monitor = env.monitor(source, day(2));

    let config = MnemonicConfig::new("A").with_plot_data(PlotData::Product("B".into()));
    let report = monitor
        .run(
            Instrument::Niriss,
            &MnemonicCatalog::new().with(AggregationMode::DailyMeans, config),
        )
        .await;

    assert!(matches!(
        report.outcomes[0].status,
        MnemonicStatus::Failed(MonitorError::InsufficientOverlap { .. })
    ));
    assert_eq!(env.sink.entries_for("A").len(), 1);
    assert_eq!(env.store.get("A"), Some(day(2)));
    assert!(env.sink.plots().is_empty());
}

#[tokio::test]
async fn sink_failures_are_warnings() {
    let env = Env::with_history(&[("SE_ZIMIRICEA", day(1))]);
    env.sink
        .set_failure(Some(MonitorError::sink("recording", "disk full")));
    let monitor = env.monitor(Arc::new(MockSource::new()), day(2));

    let report = monitor
        .run(
            Instrument::Miri,
            &MnemonicCatalog::new().with(
                AggregationMode::DailyMeans,
                MnemonicConfig::new("SE_ZIMIRICEA"),
            ),
        )
        .await;
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, MnemonicStatus::Done);
    assert!(matches!(
        outcome.warnings.as_slice(),
        [MonitorError::Sink { .. }, MonitorError::Sink { .. }]
    ));
    // the unpersisted window is retried next run
    assert_eq!(env.store.get("SE_ZIMIRICEA"), Some(day(1)));
}
