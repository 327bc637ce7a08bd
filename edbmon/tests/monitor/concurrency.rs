use std::sync::Arc;
use std::time::Duration;

use edbmon::{
    AggregationMode, DependencySpec, Instrument, MnemonicCatalog, MnemonicConfig, MnemonicStatus,
    Relation,
};
use edbmon_mock::{DynamicMockController, DynamicMockSource, MockBehavior, MockSource};

use crate::helpers::{Env, day, hourly};

fn depends_on_dep(name: &str) -> MnemonicConfig {
    MnemonicConfig::new(name).with_dependency(DependencySpec::new(
        "DEP",
        Relation::GreaterThan,
        0.0,
    ))
}

async fn scripted() -> (Arc<dyn edbmon::TelemetrySource>, DynamicMockController) {
    let (source, ctrl) = DynamicMockSource::new_with_controller("dyn");
    for name in ["A", "B", "DEP"] {
        ctrl.set_behavior(name, MockBehavior::Return(hourly(name, day(1), 24, |_| 1.0)))
            .await;
    }
    (source, ctrl)
}

#[tokio::test]
async fn outcomes_follow_catalog_order() {
    let env = Env::new();
    let monitor = env
        .builder(Arc::new(MockSource::new()), day(2))
        .max_concurrent_mnemonics(2)
        .build()
        .unwrap();

    let catalog = MnemonicCatalog::new()
        .with(AggregationMode::None, MnemonicConfig::new("IMIR_HK_FW_POS_VOLT"))
        .with(AggregationMode::DailyMeans, MnemonicConfig::new("SE_ZIMIRICEA"))
        .with(AggregationMode::DailyMeans, MnemonicConfig::new("NOPE"))
        .with(
            AggregationMode::BlockMeans,
            MnemonicConfig::new("IMIR_HK_ICE_SEC_VOLT1"),
        )
        .with(
            AggregationMode::BlockMeans,
            MnemonicConfig::new("IMIR_HK_FW_POS_RATIO"),
        );
    let report = monitor.run(Instrument::Miri, &catalog).await;

    let expected: Vec<&str> = catalog.entries().map(|(_, c)| c.name.as_str()).collect();
    let got: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(got, expected);
    assert_eq!(report.instrument, Instrument::Miri);
    assert_eq!(report.failed(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_mnemonics_fetch_a_shared_dependency_once() {
    let env = Env::new();
    let (source, ctrl) = scripted().await;
    ctrl.set_latency(Some(Duration::from_millis(50))).await;
    let monitor = env
        .builder(source, day(2))
        .max_concurrent_mnemonics(2)
        .build()
        .unwrap();

    let catalog = MnemonicCatalog::new()
        .with(AggregationMode::BlockMeans, depends_on_dep("A"))
        .with(AggregationMode::BlockMeans, depends_on_dep("B"));
    let report = monitor.run(Instrument::Nirspec, &catalog).await;

    assert!(
        report
            .outcomes
            .iter()
            .all(|o| o.status == MnemonicStatus::Done)
    );
    assert_eq!(ctrl.fetches_of("DEP").await.len(), 1);
}

#[tokio::test]
async fn shared_cache_spans_instruments() {
    let env = Env::new();
    let (source, ctrl) = scripted().await;
    let monitor = env.monitor(source, day(2));
    let cache = monitor.new_cache();

    let miri = MnemonicCatalog::new().with(AggregationMode::BlockMeans, depends_on_dep("A"));
    let nircam = MnemonicCatalog::new().with(AggregationMode::BlockMeans, depends_on_dep("B"));
    monitor.run_with_cache(Instrument::Miri, &miri, &cache).await;
    monitor
        .run_with_cache(Instrument::Nircam, &nircam, &cache)
        .await;

    assert_eq!(ctrl.fetches_of("DEP").await.len(), 1);
    let schemas: Vec<_> = env.sink.entries().into_iter().map(|(s, _)| s.table()).collect();
    assert_eq!(schemas, vec!["miri_edb_mnemonics", "nircam_edb_mnemonics"]);

    // every plain run builds its own cache
    let raw = MnemonicCatalog::new().with(AggregationMode::None, depends_on_dep("A"));
    monitor.run(Instrument::Miri, &raw).await;
    monitor.run(Instrument::Miri, &raw).await;
    assert_eq!(ctrl.fetches_of("DEP").await.len(), 3);
}
