//! Analysis pipeline that orchestrates all ML computations

use crate::ml::clustering::{cluster_and_score, elbow};
use crate::ml::correlation::correlation_matrix;
use crate::ml::selector::select_best_run;
use crate::ml::summary::{build_cluster_summary, SummaryConfig};
use crate::structs::{AnalysisResult, FeatureTable, Result, SelectionConfig};
use tracing::{info, warn};

/// Configuration for the analysis pipeline
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub selection: SelectionConfig,
    pub summary: SummaryConfig,
    /// Run the inertia sweep up to this k
    pub elbow_max_k: Option<usize>,
}

/// Run the full analysis pipeline
///
/// # Errors
/// Returns `NoViableRun` if the run selector finds no viable seed, or an
/// error if the winning run cannot be summarised.
/// Elbow, full-table baseline and correlation failures are non-fatal
/// (logged and set to `None`).
pub fn run_pipeline(table: &FeatureTable, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let clustering = &config.selection.clustering;

    let elbow = config
        .elbow_max_k
        .and_then(|max_k| match elbow(&table.values, max_k, clustering) {
            Ok(result) => {
                info!(suggested_k = result.suggested_k, "elbow sweep");
                Some(result)
            }
            Err(e) => {
                warn!("elbow sweep failed: {e}");
                None
            }
        });

    let full_table_score = match cluster_and_score(&table.values, clustering) {
        Ok(scored) => {
            info!(score = scored.score, "silhouette on full table");
            Some(scored.score)
        }
        Err(e) => {
            warn!("full-table clustering failed: {e}");
            None
        }
    };

    let selection = select_best_run(table, &config.selection)?;
    let best = &selection.best;

    let summary = build_cluster_summary(
        &best.selected_table,
        &best.clusters.labels,
        best.clusters.k,
        &config.summary,
    )?;

    let correlation = match correlation_matrix(&best.selected_table) {
        Ok(corr) => Some(corr),
        Err(e) => {
            warn!("correlation failed: {e}");
            None
        }
    };

    Ok(AnalysisResult {
        n_rows: table.n_samples(),
        n_columns: table.n_features(),
        full_table_score,
        elbow,
        selection,
        summary,
        correlation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::{CsvData, ScError};
    use std::fmt::Write as _;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Encoded survey export with three respondent profiles
    fn create_test_csv() -> CsvData {
        let mut content = String::from(
            "What is your age?,Do you work remotely?_Always,Would you discuss with coworkers?_No,\
             Does your employer offer resources?_Yes,Is your employer a tech company?_1,\
             Did you hear of negative consequences?_Yes,Has a disorder_constant\n",
        );
        for i in 0..45_u32 {
            let profile = i % 3;
            let jitter = f64::from(i % 5) * 0.01;
            let age = 25 + profile * 10 + i % 4;
            let remote = u32::from(profile == 0);
            let reticent = u32::from(profile == 1);
            let resources = u32::from(profile != 1);
            let tech = u32::from(profile == 2);
            let negative = f64::from(u32::from(profile == 1)) + jitter;
            let _ = writeln!(
                content,
                "{age},{remote},{reticent},{resources},{tech},{negative},1"
            );
        }

        let mut file = NamedTempFile::new().expect("create");
        file.write_all(content.as_bytes()).expect("write");
        CsvData::from_file(file.path(), false).expect("parse")
    }

    #[test]
    fn test_full_pipeline() {
        let csv = create_test_csv();
        let table = FeatureTable::from_csv(&csv).expect("extract");

        let config = AnalysisConfig {
            elbow_max_k: Some(6),
            ..AnalysisConfig::default()
        };

        let result = run_pipeline(&table, &config).expect("pipeline");

        assert_eq!(result.n_rows, 45);
        assert_eq!(result.n_columns, 7);
        assert!(result.full_table_score.is_some());
        assert!(result.elbow.is_some());
        assert_eq!(result.selection.outcomes.len(), 4);

        let best = &result.selection.best;
        assert!(!best.selected_features.contains(&"Has a disorder_constant".to_string()));
        assert_eq!(best.clusters.labels.len(), 45);
        assert_eq!(result.summary.features, best.selected_features);
        assert_eq!(result.summary.k, 3);
        assert!(result.correlation.is_some());
    }

    #[test]
    fn test_pipeline_without_elbow() {
        let csv = create_test_csv();
        let table = FeatureTable::from_csv(&csv).expect("extract");

        let result = run_pipeline(&table, &AnalysisConfig::default()).expect("pipeline");
        assert!(result.elbow.is_none());
    }

    #[test]
    fn test_pipeline_reports_no_viable_run() {
        // Distinct rows, but every column sits under the variance threshold
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let x = f64::from(i) * 0.01;
                vec![x, 1.0 - x]
            })
            .collect();
        let table = FeatureTable::from_rows(vec!["a".into(), "b".into()], &rows).expect("table");

        let err = run_pipeline(&table, &AnalysisConfig::default()).expect_err("no viable run");
        assert!(matches!(err, ScError::NoViableRun { attempted: 4 }));
    }
}
