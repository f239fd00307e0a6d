//! Seeded repetition of the selection body and best-run bookkeeping
//!
//! One pass (`run_seed`) is: variance filter, permutation importance,
//! positive-importance selection, PCA, K-means, silhouette. The
//! [`RunSelector`] walks `Initial -> Running(seed) -> Recorded(seed) -> ... -> Done`
//! and owns the only place where the best run is replaced.

use crate::ml::clustering::cluster_and_score;
use crate::ml::filter::variance_filter;
use crate::ml::importance::permutation_importance;
use crate::ml::reduction::run_pca;
use crate::structs::{
    FeatureTable, Result, RunOutcome, RunRecord, RunSelector, RunStatus, ScError, Selection,
    SelectionConfig, SelectorState,
};
use tracing::{info, warn};

/// Run the pipeline body once for `seed`
///
/// `table` is only read; every stage works on its own copy.
///
/// # Errors
/// Returns `DegenerateFilter`, `InsufficientFeatures` or `ClusteringFailure`
/// when the corresponding stage cannot proceed
pub fn run_seed(table: &FeatureTable, seed: u64, config: &SelectionConfig) -> Result<RunRecord> {
    let filtered = variance_filter(table, config.variance_threshold)?;
    info!(
        seed,
        kept = filtered.table.n_features(),
        dropped = filtered.dropped.len(),
        "variance filter"
    );

    let importance = permutation_importance(&filtered.table, &config.clustering, seed)?;
    let selected_features = importance.selected();
    info!(seed, selected = selected_features.len(), "positive-importance features");

    let selected_table = filtered.table.select(&selected_features)?;
    let reduced = run_pca(&selected_table, config.n_components)?;
    let scored = cluster_and_score(&reduced.projection, &config.clustering)?;

    Ok(RunRecord {
        seed,
        score: scored.score,
        clusters: scored.clusters,
        importance,
        selected_features,
        reduced,
        selected_table,
    })
}

impl Default for RunSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSelector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SelectorState::Initial,
            best: None,
            outcomes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> SelectorState {
        self.state
    }

    #[must_use]
    pub const fn best(&self) -> Option<&RunRecord> {
        self.best.as_ref()
    }

    #[must_use]
    pub fn outcomes(&self) -> &[RunOutcome] {
        &self.outcomes
    }

    /// Mark `seed` as in flight
    pub fn begin(&mut self, seed: u64) {
        info!(seed, "run started");
        self.state = SelectorState::Running(seed);
    }

    /// Close the in-flight run with its result
    ///
    /// A failed run is logged and kept only as a `Skipped` outcome.
    pub fn record(&mut self, seed: u64, result: Result<RunRecord>) {
        let status = match result {
            Ok(record) => {
                let score = record.score;
                info!(seed, score, "silhouette after PCA");
                self.offer(record);
                RunStatus::Recorded { score }
            }
            Err(e) => {
                warn!(seed, "run skipped: {e}");
                RunStatus::Skipped {
                    reason: e.to_string(),
                }
            }
        };
        self.outcomes.push(RunOutcome { seed, status });
        self.state = SelectorState::Recorded(seed);
    }

    /// Keep `record` only if it strictly beats the current best
    ///
    /// Returns whether the record replaced the best run. Equal scores keep
    /// the run that was offered first.
    pub fn offer(&mut self, record: RunRecord) -> bool {
        let improves = self
            .best
            .as_ref()
            .map_or(true, |best| record.score > best.score);
        if improves {
            self.best = Some(record);
        }
        improves
    }

    /// Terminate the loop and hand out the best run
    ///
    /// # Errors
    /// Returns `NoViableRun` if no run was recorded successfully
    pub fn finish(&mut self) -> Result<Selection> {
        self.state = SelectorState::Done;
        let outcomes = std::mem::take(&mut self.outcomes);
        match self.best.take() {
            Some(best) => Ok(Selection { best, outcomes }),
            None => Err(ScError::NoViableRun {
                attempted: outcomes.len(),
            }),
        }
    }
}

/// Run every configured seed in order and keep the best run
///
/// # Errors
/// Returns `NoViableRun` if every seed fails or no seeds are configured
pub fn select_best_run(table: &FeatureTable, config: &SelectionConfig) -> Result<Selection> {
    let mut selector = RunSelector::new();
    for &seed in &config.seeds {
        selector.begin(seed);
        let result = run_seed(table, seed, config);
        selector.record(seed, result);
    }

    let selection = selector.finish()?;
    info!(
        seed = selection.best.seed,
        score = selection.best.score,
        "best run selected"
    );
    Ok(selection)
}
