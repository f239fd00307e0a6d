//! Permutation importance against a fixed K-means baseline
//!
//! Each column is shuffled on its own copy of the table, the copy is
//! re-clustered with the same `k` and initialisation seed, and the drop in
//! silhouette relative to the unpermuted table is that column's importance.
//! The shuffle for column `i` of run `seed` is drawn from its own RNG,
//! seeded with [`column_seed`], so the result never depends on how many
//! draws earlier columns consumed.

use crate::ml::clustering::cluster_and_score;
use crate::structs::{ClusterConfig, FeatureTable, ImportanceScores, Result};
use tracing::{debug, info};

/// Seed of the permutation stream for one column of one run (SplitMix64 finaliser)
#[must_use]
pub fn column_seed(run_seed: u64, column_index: usize) -> u64 {
    let mut z = run_seed
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(column_index as u64)
        .wrapping_add(0x632B_E59B_D9B4_E019);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Score every column of `table` by permutation importance
///
/// # Errors
/// Returns `ClusteringFailure` if the baseline or any permuted table cannot
/// be clustered
pub fn permutation_importance(
    table: &FeatureTable,
    config: &ClusterConfig,
    run_seed: u64,
) -> Result<ImportanceScores> {
    let baseline = cluster_and_score(&table.values, config)?.score;
    info!(seed = run_seed, baseline, columns = table.n_features(), "baseline silhouette");

    let mut scores = Vec::with_capacity(table.n_features());
    for (i, name) in table.names.iter().enumerate() {
        let permuted = table.with_permuted_column(i, column_seed(run_seed, i));
        let permuted_score = cluster_and_score(&permuted.values, config)?.score;
        let drop = baseline - permuted_score;
        debug!(column = %name, drop, "permutation importance");
        scores.push((name.clone(), drop));
    }

    Ok(ImportanceScores { baseline, scores })
}

impl ImportanceScores {
    /// Importance of one column
    #[must_use]
    #[allow(dead_code)]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.scores
            .iter()
            .find_map(|(n, s)| (n == name).then_some(*s))
    }

    /// Columns with strictly positive importance, in table order
    #[must_use]
    pub fn selected(&self) -> Vec<String> {
        self.scores
            .iter()
            .filter(|(_, s)| *s > 0.0)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Scores sorted by decreasing importance; ties keep table order
    #[must_use]
    pub fn ranked(&self) -> Vec<(String, f64)> {
        let mut ranked = self.scores.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// One column aligned with a planted 3-group structure, one independent noise column
    fn planted_table(trial_seed: u64) -> FeatureTable {
        let mut rng = ChaCha8Rng::seed_from_u64(trial_seed);
        let rows: Vec<Vec<f64>> = (0..45)
            .map(|i| {
                let group = f64::from(i % 3);
                let informative = group * 3.0 + rng.gen_range(-0.3..0.3);
                let noise = rng.gen_range(0.0..1.0);
                vec![informative, noise]
            })
            .collect();
        FeatureTable::from_rows(vec!["informative".into(), "noise".into()], &rows)
            .expect("table")
    }

    #[test]
    fn test_column_seed_is_stable_and_distinct() {
        assert_eq!(column_seed(3, 7), column_seed(3, 7));
        assert_ne!(column_seed(0, 0), column_seed(0, 1));
        assert_ne!(column_seed(0, 1), column_seed(1, 0));
        assert_ne!(column_seed(1, 0), column_seed(2, 0));
    }

    #[test]
    fn test_importance_is_deterministic() {
        let table = planted_table(11);
        let config = ClusterConfig::default();

        let a = permutation_importance(&table, &config, 2).expect("first");
        let b = permutation_importance(&table, &config, 2).expect("second");

        assert_eq!(a.scores.len(), 2);
        for ((na, sa), (nb, sb)) in a.scores.iter().zip(&b.scores) {
            assert_eq!(na, nb);
            assert!((sa - sb).abs() < 1e-12);
        }
        assert!((a.baseline - b.baseline).abs() < 1e-12);
    }

    #[test]
    fn test_informative_column_beats_noise() {
        let config = ClusterConfig::default();
        let trials: u64 = 20;
        let mut wins: u64 = 0;

        for trial in 0..trials {
            let table = planted_table(100 + trial);
            let importance = permutation_importance(&table, &config, trial).expect("importance");
            let informative = importance.get("informative").expect("informative");
            let noise = importance.get("noise").expect("noise");
            if informative > noise {
                wins += 1;
            }
        }

        // At least 90% of trials
        assert!(wins * 10 >= trials * 9, "informative won only {wins}/{trials}");
    }

    #[test]
    fn test_selection_follows_sign() {
        let scores = ImportanceScores {
            baseline: 0.5,
            scores: vec![
                ("a".into(), 0.2),
                ("b".into(), 0.0),
                ("c".into(), -0.1),
                ("d".into(), 0.05),
            ],
        };

        let selected = scores.selected();
        assert_eq!(selected, vec!["a", "d"]);
        for (name, score) in &scores.scores {
            assert_eq!(selected.contains(name), *score > 0.0);
        }

        let ranked: Vec<String> = scores.ranked().into_iter().map(|(n, _)| n).collect();
        assert_eq!(ranked, vec!["a", "d", "b", "c"]);
        assert_eq!(scores.get("c"), Some(-0.1));
        assert_eq!(scores.get("zzz"), None);
    }
}
