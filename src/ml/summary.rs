//! Per-cluster profiles of the winning run
//!
//! The cluster summary is the mean of every feature inside each cluster.
//! Indicator columns (every cluster mean at most 1.0) are reported as
//! percentages; columns listed in `SummaryConfig::absolute_columns` keep
//! their raw scale. Feature groups average several summary rows into one
//! thematic row.

use crate::structs::{
    ClusterSummary, FeatureGroup, FeatureTable, GroupSummary, Result, ScError,
};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Column label of the survey's age question
pub const AGE_COLUMN: &str = "What is your age?";

/// How summaries are scaled and which standalone rows are appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryConfig {
    /// Never scaled to percentages even if all means are <= 1.0
    pub absolute_columns: Vec<String>,
    /// `(feature, label)` copied as its own row into group summaries
    pub standalone: Option<(String, String)>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            absolute_columns: vec![AGE_COLUMN.to_string()],
            standalone: Some((AGE_COLUMN.to_string(), "Average Age".to_string())),
        }
    }
}

/// Mean of every column of `table` inside each of the `k` clusters
///
/// # Errors
/// Returns error if `labels` does not have one entry per row or a label is
/// out of range
#[allow(clippy::cast_precision_loss)]
pub fn build_cluster_summary(
    table: &FeatureTable,
    labels: &[usize],
    k: usize,
    config: &SummaryConfig,
) -> Result<ClusterSummary> {
    if labels.len() != table.n_samples() {
        return Err(ScError::Data(format!(
            "{} labels for {} rows",
            labels.len(),
            table.n_samples()
        )));
    }
    if let Some(bad) = labels.iter().find(|&&l| l >= k) {
        return Err(ScError::Data(format!("label {bad} outside 0..{k}")));
    }

    let mut counts = vec![0usize; k];
    for &label in labels {
        counts[label] += 1;
    }

    let mut values = Vec::with_capacity(table.n_features());
    let mut percent = Vec::with_capacity(table.n_features());

    for (col_idx, name) in table.names.iter().enumerate() {
        let mut sums = vec![0.0; k];
        for (row, &label) in labels.iter().enumerate() {
            sums[label] += table.values[[row, col_idx]];
        }

        let mut means: Vec<f64> = sums
            .iter()
            .zip(&counts)
            .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
            .collect();

        let max = means.iter().copied().fold(f64::MIN, f64::max);
        let scale = max <= 1.0 && !config.absolute_columns.contains(name);
        if scale {
            for m in &mut means {
                *m *= 100.0;
            }
        }

        values.push(means);
        percent.push(scale);
    }

    Ok(ClusterSummary {
        features: table.names.clone(),
        k,
        values,
        percent,
    })
}

impl ClusterSummary {
    /// Row of one feature
    #[must_use]
    pub fn row(&self, feature: &str) -> Option<&[f64]> {
        self.features
            .iter()
            .position(|f| f == feature)
            .map(|i| self.values[i].as_slice())
    }

    /// Read a summary written by `write_cluster_summary`
    ///
    /// Scaling flags are not stored in the file and come back as `false`.
    ///
    /// # Errors
    /// Returns error if the file is missing, has no cluster columns, or holds
    /// non-numeric values
    pub fn from_csv_file(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

        let k = reader.headers()?.len().saturating_sub(1);
        if k == 0 {
            return Err(ScError::Data(format!(
                "{} has no cluster columns",
                path.display()
            )));
        }

        let mut features = Vec::new();
        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut fields = record.iter();
            let feature = fields.next().unwrap_or_default().to_string();
            let row = fields
                .map(|v| {
                    v.trim().parse::<f64>().map_err(|_| {
                        ScError::Data(format!("'{v}' for '{feature}' is not numeric"))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            features.push(feature);
            values.push(row);
        }

        let percent = vec![false; features.len()];
        Ok(Self {
            features,
            k,
            values,
            percent,
        })
    }
}

/// Load feature group definitions from a JSON array
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub fn load_groups(path: &Path) -> Result<Vec<FeatureGroup>> {
    let file = File::open(path)?;
    let groups: Vec<FeatureGroup> = serde_json::from_reader(file)?;
    Ok(groups)
}

/// Average the summary rows of each group
///
/// Members missing from the summary are ignored; a group with no member
/// present is left out. The configured standalone feature is appended last
/// when the summary has it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_groups(
    summary: &ClusterSummary,
    groups: &[FeatureGroup],
    config: &SummaryConfig,
) -> GroupSummary {
    let mut names = Vec::new();
    let mut values = Vec::new();

    for group in groups {
        let rows: Vec<&[f64]> = group
            .features
            .iter()
            .filter_map(|f| summary.row(f))
            .collect();

        if rows.is_empty() {
            debug!(group = %group.name, "no group member present in summary");
            continue;
        }

        let means: Vec<f64> = (0..summary.k)
            .map(|c| rows.iter().map(|r| r[c]).sum::<f64>() / rows.len() as f64)
            .collect();

        names.push(group.name.clone());
        values.push(means);
    }

    if let Some((feature, label)) = &config.standalone {
        if let Some(row) = summary.row(feature) {
            names.push(label.clone());
            values.push(row.to_vec());
        }
    }

    GroupSummary {
        groups: names,
        k: summary.k,
        values,
    }
}
