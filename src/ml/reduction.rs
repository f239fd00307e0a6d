//! PCA dimensionality reduction using linfa-reduction

use crate::ml::stats::variance;
use crate::structs::{FeatureTable, PcaResult, Result, ScError};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_reduction::Pca;
use ndarray::Array2;

/// Project a table onto exactly `n_components` principal components
///
/// The projection is fitted on `table` alone; nothing is reused between calls.
///
/// # Errors
/// Returns `InsufficientFeatures` if the table has fewer than `n_components`
/// columns, or an ML error if the decomposition fails
#[allow(clippy::cast_precision_loss)]
pub fn run_pca(table: &FeatureTable, n_components: usize) -> Result<PcaResult> {
    let n_samples = table.n_samples();
    let n_features = table.n_features();

    if n_features < n_components {
        return Err(ScError::InsufficientFeatures {
            found: n_features,
            required: n_components,
        });
    }
    if n_samples <= n_components {
        return Err(ScError::Ml(format!(
            "PCA to {n_components} components needs more than {n_components} samples, got {n_samples}"
        )));
    }

    let dataset = DatasetBase::from(table.values.clone());

    let pca = Pca::params(n_components)
        .fit(&dataset)
        .map_err(|e| ScError::Ml(format!("PCA failed: {e}")))?;

    let projection: Array2<f64> = pca.predict(&table.values);
    if projection.ncols() != n_components {
        return Err(ScError::Ml(format!(
            "PCA returned {} components, expected {n_components}",
            projection.ncols()
        )));
    }

    // Explained variance per component relative to the total input variance.
    // Both sides use the n - 1 estimator, matching the singular values.
    let dof = (n_samples - 1) as f64;
    let total_variance: f64 = table
        .values
        .columns()
        .into_iter()
        .map(|c| variance(&c.to_vec()) * n_samples as f64 / dof)
        .sum();

    let explained_variance_ratio: Vec<f64> = if total_variance > 0.0 {
        pca.singular_values()
            .iter()
            .map(|s| (s * s / dof) / total_variance)
            .collect()
    } else {
        vec![0.0; n_components]
    };

    Ok(PcaResult {
        n_components,
        projection,
        explained_variance_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlated_table(n_features: usize) -> FeatureTable {
        let names = (0..n_features).map(|i| format!("f{i}")).collect();
        let rows: Vec<Vec<f64>> = (0..12)
            .map(|r| {
                let base = f64::from(r);
                (0..n_features)
                    .map(|c| {
                        let c = f64::from(u32::try_from(c).expect("small"));
                        base * (c + 1.0) + ((base * 1.7 + c).sin())
                    })
                    .collect()
            })
            .collect();
        FeatureTable::from_rows(names, &rows).expect("table")
    }

    #[test]
    fn test_run_pca_three_components() {
        let table = correlated_table(5);
        let result = run_pca(&table, 3).expect("pca");

        assert_eq!(result.n_components, 3);
        assert_eq!(result.projection.dim(), (12, 3));
        assert_eq!(result.explained_variance_ratio.len(), 3);

        let total: f64 = result.explained_variance_ratio.iter().sum();
        assert!(total > 0.0 && total <= 1.0 + 1e-9);
        // Components come out in decreasing order of variance
        for pair in result.explained_variance_ratio.windows(2) {
            assert!(pair[0] + 1e-12 >= pair[1]);
        }
    }

    #[test]
    fn test_pca_refit_is_deterministic() {
        let table = correlated_table(4);
        let a = run_pca(&table, 3).expect("first");
        let b = run_pca(&table, 3).expect("second");
        assert_eq!(a, b);
    }

    #[test]
    fn test_pca_too_few_features() {
        for n in 0..3 {
            let table = correlated_table(n);
            let err = run_pca(&table, 3).expect_err("too few features");
            assert!(matches!(
                err,
                ScError::InsufficientFeatures { found, required: 3 } if found == n
            ));
        }
    }
}
