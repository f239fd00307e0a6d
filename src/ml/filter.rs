//! Near-constant column removal

use crate::ml::stats::variance;
use crate::structs::{FeatureTable, FilterResult, Result, ScError};
use tracing::debug;

/// Keep the columns whose variance is strictly greater than `threshold`
///
/// Column order and row alignment are preserved.
///
/// # Errors
/// Returns `DegenerateFilter` if no column survives
pub fn variance_filter(table: &FeatureTable, threshold: f64) -> Result<FilterResult> {
    let mut kept = Vec::with_capacity(table.n_features());
    let mut dropped = Vec::new();

    for (i, name) in table.names.iter().enumerate() {
        let column = table.values.column(i).to_vec();
        let var = variance(&column);
        if var > threshold {
            kept.push(i);
        } else {
            debug!(column = %name, variance = var, "dropping low-variance column");
            dropped.push((name.clone(), var));
        }
    }

    if kept.is_empty() {
        return Err(ScError::DegenerateFilter { threshold });
    }

    Ok(FilterResult {
        table: table.select_indices(&kept),
        dropped,
    })
}
