//! Output file writers for the analyze and summarize phases

use crate::structs::{
    AnalysisResult, ClusterSummary, CorrelationMatrix, ElbowResult, GroupSummary,
    ImportanceScores, Result, RunOutcome, RunRecord, RunStatus,
};
use csv::Writer;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Write `summary.txt` - human readable overview
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_summary(output_dir: &Path, content: &str) -> Result<()> {
    let path = output_dir.join("summary.txt");
    fs::write(path, content)?;
    Ok(())
}

/// Write `clusters.csv` - cluster label and projected coordinates per row
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_clusters(output_dir: &Path, best: &RunRecord) -> Result<()> {
    let mut writer = Writer::from_path(output_dir.join("clusters.csv"))?;

    let mut header = vec!["row_id".to_string(), "cluster".to_string()];
    header.extend((1..=best.reduced.n_components).map(|i| format!("pc{i}")));
    writer.write_record(&header)?;

    for (i, &cluster_id) in best.clusters.labels.iter().enumerate() {
        let mut record = vec![
            best.selected_table.row_ids[i].to_string(),
            cluster_id.to_string(),
        ];
        record.extend(
            best.reduced
                .projection
                .row(i)
                .iter()
                .map(|v| format!("{v:.6}")),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `importance.csv` - permutation importance, most important first
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_importance(output_dir: &Path, importance: &ImportanceScores) -> Result<()> {
    let mut writer = Writer::from_path(output_dir.join("importance.csv"))?;
    writer.write_record(["feature", "silhouette_drop", "selected"])?;

    for (name, drop) in importance.ranked() {
        let selected = if drop > 0.0 { "true" } else { "false" };
        let drop = format!("{drop:.6}");
        writer.write_record([name.as_str(), drop.as_str(), selected])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `cluster_summary.csv` - feature rows, one column per cluster
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_cluster_summary(output_dir: &Path, summary: &ClusterSummary) -> Result<()> {
    write_matrix(
        &output_dir.join("cluster_summary.csv"),
        "feature",
        summary.k,
        &summary.features,
        &summary.values,
    )
}

/// Write `group_summary.csv` - group rows, one column per cluster
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_group_summary(output_dir: &Path, groups: &GroupSummary) -> Result<()> {
    write_matrix(
        &output_dir.join("group_summary.csv"),
        "group",
        groups.k,
        &groups.groups,
        &groups.values,
    )
}

fn write_matrix(
    path: &Path,
    label: &str,
    k: usize,
    names: &[String],
    values: &[Vec<f64>],
) -> Result<()> {
    let mut writer = Writer::from_path(path)?;

    let mut header = vec![label.to_string()];
    header.extend((0..k).map(|c| format!("cluster_{c}")));
    writer.write_record(&header)?;

    for (name, row) in names.iter().zip(values) {
        let mut record = vec![name.clone()];
        record.extend(row.iter().map(|v| format!("{v:.4}")));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `correlation.csv` - correlation matrix of the selected features
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_correlation(output_dir: &Path, corr: &CorrelationMatrix) -> Result<()> {
    let mut writer = Writer::from_path(output_dir.join("correlation.csv"))?;

    let mut header = vec![String::new()];
    header.extend(corr.names.iter().cloned());
    writer.write_record(&header)?;

    for (name, row) in corr.names.iter().zip(&corr.matrix) {
        let mut record = vec![name.clone()];
        record.extend(row.iter().map(|v| format!("{v:.4}")));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `elbow.csv` - inertia per candidate k
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_elbow(output_dir: &Path, elbow: &ElbowResult) -> Result<()> {
    let mut writer = Writer::from_path(output_dir.join("elbow.csv"))?;
    writer.write_record(["k", "inertia"])?;
    for point in &elbow.points {
        writer.write_record([point.k.to_string(), format!("{:.6}", point.inertia)])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `runs.json` - machine-readable run outcomes and best run metadata
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_runs_json(output_dir: &Path, result: &AnalysisResult) -> Result<()> {
    let best = &result.selection.best;
    let output = RunsOutput {
        row_count: result.n_rows,
        column_count: result.n_columns,
        full_table_silhouette: result.full_table_score,
        runs: result.selection.outcomes.iter().map(RunEntry::from).collect(),
        best: BestRunEntry {
            seed: best.seed,
            silhouette: best.score,
            baseline_silhouette: best.importance.baseline,
            selected_features: &best.selected_features,
            cluster_sizes: &best.clusters.sizes,
            explained_variance_ratio: &best.reduced.explained_variance_ratio,
        },
        elbow: result.elbow.as_ref(),
    };

    let json = serde_json::to_string_pretty(&output)?;
    fs::write(output_dir.join("runs.json"), json)?;
    Ok(())
}

/// Build the `summary.txt` report
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn build_summary(source: &Path, result: &AnalysisResult) -> String {
    use std::fmt::Write as _;

    let best = &result.selection.best;
    let mut s = String::new();

    let _ = writeln!(s, "Source: {}", source.display());
    let _ = writeln!(
        s,
        "Input: {} respondents x {} features",
        result.n_rows, result.n_columns
    );
    if let Some(score) = result.full_table_score {
        let _ = writeln!(s, "Silhouette on full table (k={}): {score:.4}", best.clusters.k);
    }
    if let Some(elbow) = &result.elbow {
        let _ = writeln!(s, "Elbow suggestion: k={}", elbow.suggested_k);
    }

    let _ = writeln!(s, "\nRuns:");
    for outcome in &result.selection.outcomes {
        let _ = writeln!(s, "  {}", describe_outcome(outcome));
    }

    let _ = writeln!(
        s,
        "\nBest silhouette: {:.4} from seed {}",
        best.score, best.seed
    );
    let _ = writeln!(
        s,
        "Baseline silhouette before selection: {:.4}",
        best.importance.baseline
    );

    let _ = writeln!(s, "\nSelected features ({}):", best.selected_features.len());
    for (name, drop) in best.importance.ranked() {
        if drop > 0.0 {
            let _ = writeln!(s, "  {drop:+.4}  {name}");
        }
    }

    let _ = writeln!(s, "\nExplained variance:");
    for (i, ratio) in best.reduced.explained_variance_ratio.iter().enumerate() {
        let _ = writeln!(s, "  PC{}: {:.1}%", i + 1, ratio * 100.0);
    }

    let total = best.clusters.labels.len().max(1) as f64;
    let _ = writeln!(s, "\nClusters:");
    for (i, &size) in best.clusters.sizes.iter().enumerate() {
        let _ = writeln!(
            s,
            "  Cluster {i}: {size} respondents ({:.1}%)",
            size as f64 / total * 100.0
        );
    }

    let summary = &result.summary;
    let _ = writeln!(s, "\nCluster profiles:");
    for ((feature, row), &percent) in summary
        .features
        .iter()
        .zip(&summary.values)
        .zip(&summary.percent)
    {
        let cells: Vec<String> = row
            .iter()
            .map(|v| {
                if percent {
                    format!("{v:.1}%")
                } else {
                    format!("{v:.2}")
                }
            })
            .collect();
        let _ = writeln!(s, "  {feature}: {}", cells.join(" | "));
    }

    s
}

fn describe_outcome(outcome: &RunOutcome) -> String {
    match &outcome.status {
        RunStatus::Recorded { score } => {
            format!("seed {}: silhouette {score:.4}", outcome.seed)
        }
        RunStatus::Skipped { reason } => {
            format!("seed {}: skipped ({reason})", outcome.seed)
        }
    }
}

// JSON output structures

#[derive(Serialize)]
struct RunsOutput<'a> {
    row_count: usize,
    column_count: usize,
    full_table_silhouette: Option<f64>,
    runs: Vec<RunEntry<'a>>,
    best: BestRunEntry<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elbow: Option<&'a ElbowResult>,
}

#[derive(Serialize)]
struct RunEntry<'a> {
    seed: u64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    silhouette: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl<'a> From<&'a RunOutcome> for RunEntry<'a> {
    fn from(outcome: &'a RunOutcome) -> Self {
        match &outcome.status {
            RunStatus::Recorded { score } => Self {
                seed: outcome.seed,
                status: "recorded",
                silhouette: Some(*score),
                reason: None,
            },
            RunStatus::Skipped { reason } => Self {
                seed: outcome.seed,
                status: "skipped",
                silhouette: None,
                reason: Some(reason),
            },
        }
    }
}

#[derive(Serialize)]
struct BestRunEntry<'a> {
    seed: u64,
    silhouette: f64,
    baseline_silhouette: f64,
    selected_features: &'a [String],
    cluster_sizes: &'a [usize],
    explained_variance_ratio: &'a [f64],
}
