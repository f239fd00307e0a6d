use crate::structs::{CsvData, FeatureTable, Result, ScError};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

impl FeatureTable {
    /// Build a table from named rows
    ///
    /// # Errors
    /// Returns error if a name repeats, a row width differs from `names` or
    /// a value is not finite
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        {
            let mut seen = HashSet::with_capacity(names.len());
            if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
                return Err(ScError::Data(format!("duplicate column '{dup}'")));
            }
        }

        let n_cols = names.len();
        let mut flat = Vec::with_capacity(rows.len() * n_cols);

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(ScError::Data(format!(
                    "row {row_idx} has {} values, expected {n_cols}",
                    row.len()
                )));
            }
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                return Err(ScError::Data(format!(
                    "row {row_idx}, column '{}' is not finite",
                    names[col]
                )));
            }
            flat.extend_from_slice(row);
        }

        let values = Array2::from_shape_vec((rows.len(), n_cols), flat)
            .map_err(|e| ScError::Data(format!("Failed to create array: {e}")))?;

        Ok(Self {
            names,
            values,
            row_ids: (0..rows.len()).collect(),
        })
    }

    /// Convert an encoded CSV into a table
    ///
    /// The encoding stage upstream guarantees a complete numeric table, so a
    /// blank or non-numeric cell is an error rather than a row to skip.
    ///
    /// # Errors
    /// Returns error on empty input, blank cells or non-numeric cells
    pub fn from_csv(csv: &CsvData) -> Result<Self> {
        if csv.rows.is_empty() {
            return Err(ScError::Data("No data rows".into()));
        }

        let mut rows = Vec::with_capacity(csv.row_count());
        for (row_idx, row) in csv.rows.iter().enumerate() {
            let parsed = row
                .iter()
                .zip(&csv.headers)
                .map(|(cell, header)| {
                    if cell.is_empty() {
                        return Err(ScError::Data(format!(
                            "row {row_idx}: missing value in '{header}'"
                        )));
                    }
                    cell.parse::<f64>().map_err(|_| {
                        ScError::Data(format!(
                            "row {row_idx}: '{cell}' in '{header}' is not numeric"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(parsed);
        }

        Self::from_rows(csv.headers.clone(), &rows)
    }

    /// Get number of samples (rows)
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// Get number of features (columns)
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Get column index by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Sub-table with the given columns, in the given order
    ///
    /// # Errors
    /// Returns error if a name is not a column of this table
    pub fn select(&self, names: &[String]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| ScError::Data(format!("unknown column '{name}'")))
            })
            .collect::<Result<Vec<usize>>>()?;

        Ok(self.select_indices(&indices))
    }

    /// Sub-table by column indices; callers guarantee the indices are in range
    #[must_use]
    pub fn select_indices(&self, indices: &[usize]) -> Self {
        Self {
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
            values: self.values.select(Axis(1), indices),
            row_ids: self.row_ids.clone(),
        }
    }

    /// Copy of the table with one column shuffled across rows
    ///
    /// Same `rng_seed` always yields the same permutation.
    #[must_use]
    pub fn with_permuted_column(&self, index: usize, rng_seed: u64) -> Self {
        let mut permuted = self.clone();
        if index >= self.n_features() {
            return permuted;
        }

        let mut column: Vec<f64> = self.values.column(index).to_vec();
        let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
        column.shuffle(&mut rng);

        for (cell, value) in permuted.values.column_mut(index).iter_mut().zip(column) {
            *cell = value;
        }
        permuted
    }
}
