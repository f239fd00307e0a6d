//! Correlation matrix computation

use crate::ml::stats::correlation;
use crate::structs::{CorrelationMatrix, FeatureTable, Result};

/// Compute the `NxN` correlation matrix between all features of a table
///
/// # Errors
/// Returns error if the table has fewer than 2 rows
pub fn correlation_matrix(table: &FeatureTable) -> Result<CorrelationMatrix> {
    let n = table.n_features();
    let mut matrix = vec![vec![0.0; n]; n];

    let columns: Vec<Vec<f64>> = table.values.columns().into_iter().map(|c| c.to_vec()).collect();

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = correlation(&columns[i], &columns[j])?;
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        names: table.names.clone(),
        matrix,
    })
}
