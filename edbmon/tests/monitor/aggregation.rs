use std::sync::Arc;

use edbmon::{
    AggregationMode, DependencySpec, Instrument, MnemonicCatalog, MnemonicConfig, MnemonicStatus,
    Relation,
};
use edbmon_mock::MockSource;

use crate::helpers::{Env, day};

const TARGET: &str = "SE_ZIMIRICEA";

// High (30) during the first 3h of every 6h period.
fn heater_on() -> DependencySpec {
    DependencySpec::new("IMIR_HK_ICE_SEC_VOLT1", Relation::GreaterThan, 15.0)
}

async fn run_one(mode: AggregationMode, config: MnemonicConfig) -> Env {
    let env = Env::with_history(&[(config.name.as_str(), day(1))]);
    let monitor = env.monitor(Arc::new(MockSource::new()), day(2));
    let report = monitor
        .run(Instrument::Miri, &MnemonicCatalog::new().with(mode, config))
        .await;
    assert_eq!(report.outcomes[0].status, MnemonicStatus::Done);
    env
}

#[tokio::test]
async fn block_means_one_bin_per_condition_block() {
    let env = run_one(
        AggregationMode::BlockMeans,
        MnemonicConfig::new(TARGET).with_dependency(heater_on()),
    )
    .await;

    let stats = &env.sink.entries_for(TARGET)[0].stats;
    assert_eq!(stats.len(), 4);
    assert!(stats.times.windows(2).all(|w| w[0] < w[1]));
    assert!(stats.stdevs.iter().all(|s| s.is_finite()));
}

#[tokio::test]
async fn time_interval_bins_restart_at_each_block() {
    let env = run_one(
        AggregationMode::TimeInterval,
        MnemonicConfig::new(TARGET)
            .with_dependency(heater_on())
            .with_mean_time_block("1_hour"),
    )
    .await;

    // each 3h block holds samples 00:00..02:45 relative to its start: bins at +0h, +1h, +2h
    let stats = &env.sink.entries_for(TARGET)[0].stats;
    assert_eq!(stats.len(), 12);
}

#[tokio::test]
async fn every_change_groups_by_dependency_level() {
    let env = run_one(
        AggregationMode::EveryChange,
        MnemonicConfig::new(TARGET).with_dependency(DependencySpec::new(
            "IMIR_HK_FW_POS_VOLT",
            Relation::GreaterThan,
            0.0,
        )),
    )
    .await;

    let entry = &env.sink.entries_for(TARGET)[0];
    let dependency = entry.dependency_stats.as_ref().unwrap();
    assert_eq!(dependency.means, vec![5.0, 1.0, 5.0, 1.0]);
    assert_eq!(entry.stats.len(), 4);
    assert!(entry.stats.means.iter().all(|m| m.is_finite()));
}

#[tokio::test]
async fn daily_means_of_filtered_samples_only() {
    let env = run_one(
        AggregationMode::DailyMeans,
        MnemonicConfig::new("IMIR_HK_FW_POS_VOLT").with_dependency(heater_on()),
    )
    .await;

    // the heater keeps 00-03h, 06-09h, 12-15h and 18-21h; the 12h square wave
    // is high (5) in the first and third of those and low (1) in the others
    let stats = &env.sink.entries_for("IMIR_HK_FW_POS_VOLT")[0].stats;
    assert_eq!(stats.len(), 1);
    assert!((stats.means[0] - 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn oversized_time_block_gives_one_bin_per_block() {
    let env = run_one(
        AggregationMode::TimeInterval,
        MnemonicConfig::new(TARGET)
            .with_dependency(heater_on())
            .with_mean_time_block("100000000_days"),
    )
    .await;

    let stats = &env.sink.entries_for(TARGET)[0].stats;
    assert_eq!(stats.len(), 4);
    assert!(stats.means.iter().all(|m| m.is_finite()));
}
