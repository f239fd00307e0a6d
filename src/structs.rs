//! Consolidated public types for the survey-cluster crate
//!
//! This module contains the data model shared by the loader, the selection
//! core and the report writers. Behaviour lives next to the stage that owns it
//! (`ml::*`, `csv_reader`).

use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use crate::error::{Result, ScError};

// ============================================================================
// CSV Types
// ============================================================================

/// Represents a parsed CSV/TSV file with headers and rows
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ============================================================================
// Feature Types
// ============================================================================

/// Named numeric columns, one row per respondent
///
/// Every cell is finite; the loader refuses anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// Column names in input order
    pub names: Vec<String>,
    /// Row-major values, `n_rows x names.len()`
    pub values: Array2<f64>,
    /// Original row indices (for mapping back)
    pub row_ids: Vec<usize>,
}

/// Output of the variance filter
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Surviving columns, original order
    pub table: FeatureTable,
    /// Names of the dropped columns with their variance
    pub dropped: Vec<(String, f64)>,
}

/// Permutation importance of every column of one table
#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceScores {
    /// Quality score of the unpermuted table
    pub baseline: f64,
    /// `(column, baseline - permuted_score)` in table column order
    pub scores: Vec<(String, f64)>,
}

// ============================================================================
// Clustering Types
// ============================================================================

/// K-means tuning shared by every clustering call of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    pub k: usize,
    pub init_seed: u64,
    pub max_iterations: u64,
    pub n_runs: usize,
    pub tolerance: f64,
    /// Refits with a derived seed when a cluster comes back empty
    pub reseed_attempts: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 3,
            init_seed: 0,
            max_iterations: 300,
            n_runs: 10,
            tolerance: 1e-4,
            reseed_attempts: 3,
        }
    }
}

/// Result of K-means clustering
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    /// Cluster assignment for each sample
    pub labels: Vec<usize>,
    /// Number of clusters
    pub k: usize,
    /// Cluster sizes
    pub sizes: Vec<usize>,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
}

/// Partition plus its silhouette
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredClustering {
    pub clusters: ClusterResult,
    /// Mean silhouette coefficient, in `[-1, 1]`
    pub score: f64,
}

/// Inertia for one candidate `k`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElbowPoint {
    pub k: usize,
    pub inertia: f64,
}

/// Inertia sweep with the knee of the curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElbowResult {
    pub points: Vec<ElbowPoint>,
    pub suggested_k: usize,
}

/// PCA projection of a feature table
#[derive(Debug, Clone, PartialEq)]
pub struct PcaResult {
    pub n_components: usize,
    /// `n_rows x n_components`
    pub projection: Array2<f64>,
    pub explained_variance_ratio: Vec<f64>,
}

// ============================================================================
// Run Selection Types
// ============================================================================

/// Knobs of the seeded selection loop
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub variance_threshold: f64,
    pub n_components: usize,
    pub seeds: Vec<u64>,
    pub clustering: ClusterConfig,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            variance_threshold: 0.071,
            n_components: 3,
            seeds: vec![0, 1, 2, 3],
            clustering: ClusterConfig::default(),
        }
    }
}

/// Snapshot of one seed's pass through the pipeline body
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub seed: u64,
    /// Silhouette of the final clustering on the projection
    pub score: f64,
    pub clusters: ClusterResult,
    pub importance: ImportanceScores,
    /// Columns with strictly positive importance, table order
    pub selected_features: Vec<String>,
    pub reduced: PcaResult,
    /// Rows x selected columns
    pub selected_table: FeatureTable,
}

/// What happened to a seed
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Recorded { score: f64 },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub seed: u64,
    pub status: RunStatus,
}

/// Lifecycle of the selection loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Initial,
    Running(u64),
    Recorded(u64),
    Done,
}

/// Holds the best run seen so far
#[derive(Debug, Clone)]
pub struct RunSelector {
    pub(crate) state: SelectorState,
    pub(crate) best: Option<RunRecord>,
    pub(crate) outcomes: Vec<RunOutcome>,
}

/// Terminal output of the selector
#[derive(Debug, Clone)]
pub struct Selection {
    pub best: RunRecord,
    pub outcomes: Vec<RunOutcome>,
}

// ============================================================================
// Report Types
// ============================================================================

/// Pearson correlation between every pair of features
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

/// Per-cluster mean of every feature
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub features: Vec<String>,
    pub k: usize,
    /// `features.len()` rows of `k` values
    pub values: Vec<Vec<f64>>,
    /// Rows that were scaled to percentages
    pub percent: Vec<bool>,
}

/// Named set of summary rows averaged together
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeatureGroup {
    pub name: String,
    pub features: Vec<String>,
}

/// Per-cluster value of every feature group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub groups: Vec<String>,
    pub k: usize,
    pub values: Vec<Vec<f64>>,
}

/// Everything `analyze` produces
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub n_rows: usize,
    pub n_columns: usize,
    /// Silhouette of K-means on the unfiltered table
    pub full_table_score: Option<f64>,
    pub elbow: Option<ElbowResult>,
    pub selection: Selection,
    pub summary: ClusterSummary,
    pub correlation: Option<CorrelationMatrix>,
}
