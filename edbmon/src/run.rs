use futures::StreamExt;

use edbmon_core::{Instrument, MnemonicCatalog, MnemonicOutcome, RunReport};
use edbmon_middleware::QueryCache;

use crate::Monitor;

impl Monitor {
    /// Process every mnemonic of `catalog` with a fresh run-scoped cache.
    ///
    /// Behavior:
    /// - Mnemonics run concurrently, at most `max_concurrent_mnemonics` at a time;
    ///   the windows of one mnemonic run in chronological order.
    /// - A failing mnemonic never affects the others; its error is reported in
    ///   its [`MnemonicOutcome`].
    /// - Outcomes are returned in catalog order.
    pub async fn run(&self, instrument: Instrument, catalog: &MnemonicCatalog) -> RunReport {
        let cache = self.new_cache();
        self.run_with_cache(instrument, catalog, &cache).await
    }

    /// Like [`Monitor::run`], reusing `cache` so dependencies fetched for one
    /// instrument are not fetched again for the next.
    #[tracing::instrument(
        name = "edbmon::run",
        skip_all,
        fields(instrument = %instrument, mnemonics = catalog.len()),
    )]
    pub async fn run_with_cache(
        &self,
        instrument: Instrument,
        catalog: &MnemonicCatalog,
        cache: &QueryCache,
    ) -> RunReport {
        let tasks = catalog
            .entries()
            .enumerate()
            .map(|(i, (mode, config))| async move {
                (i, self.process_mnemonic(instrument, mode, config, cache).await)
            });

        let mut joined: Vec<(usize, MnemonicOutcome)> = futures::stream::iter(tasks)
            .buffer_unordered(self.cfg.max_concurrent_mnemonics.max(1))
            .collect()
            .await;
        joined.sort_by_key(|(i, _)| *i);

        let report = RunReport {
            instrument,
            outcomes: joined.into_iter().map(|(_, o)| o).collect(),
        };
        tracing::info!(
            done = report.outcomes.iter().filter(|o| o.is_done()).count(),
            failed = report.failed(),
            "run finished"
        );
        report
    }
}
