use crate::structs::{
    ClusterConfig, ClusterResult, ElbowPoint, ElbowResult, Result, ScError, ScoredClustering,
};
use linfa::metrics::SilhouetteScore;
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Perform K-means clustering with a seeded k-means++ initialisation
///
/// A fit that leaves a cluster without members is retried with
/// `init_seed + attempt` until `reseed_attempts` is exhausted.
///
/// # Errors
/// Returns `ClusteringFailure` if there are fewer rows than clusters, the
/// fit fails, or every reseed still produces an empty cluster
pub fn kmeans(records: &Array2<f64>, config: &ClusterConfig) -> Result<ClusterResult> {
    let k = config.k;
    let n_samples = records.nrows();

    if k == 0 {
        return Err(ScError::ClusteringFailure("k must be at least 1".into()));
    }

    if n_samples < k {
        return Err(ScError::ClusteringFailure(format!(
            "Cannot create {k} clusters with only {n_samples} samples"
        )));
    }

    let dataset = DatasetBase::from(records.clone());

    for attempt in 0..=config.reseed_attempts {
        let seed = config.init_seed.wrapping_add(attempt);
        let model = KMeans::params_with_rng(k, ChaCha8Rng::seed_from_u64(seed))
            .max_n_iterations(config.max_iterations)
            .tolerance(config.tolerance)
            .n_runs(config.n_runs)
            .fit(&dataset)
            .map_err(|e| ScError::ClusteringFailure(format!("K-means failed: {e}")))?;

        let predictions: Array1<usize> = model.predict(records);
        let labels: Vec<usize> = predictions.to_vec();

        let mut sizes = vec![0usize; k];
        for &cluster_id in &labels {
            sizes[cluster_id] += 1;
        }

        if sizes.iter().all(|&s| s > 0) {
            return Ok(ClusterResult {
                labels,
                k,
                sizes,
                inertia: model.inertia(),
            });
        }

        warn!(k, seed, attempt, "empty cluster after K-means, refitting");
    }

    Err(ScError::ClusteringFailure(format!(
        "empty cluster persisted after {} reseeds",
        config.reseed_attempts
    )))
}

/// Mean silhouette coefficient of a labelling
///
/// A sample alone in its cluster contributes 0. linfa scores such a sample
/// as 1, so its share is taken back out of the mean.
///
/// # Errors
/// Returns `ClusteringFailure` if lengths disagree or the metric is undefined
#[allow(clippy::cast_precision_loss)]
pub fn silhouette(records: &Array2<f64>, labels: &[usize]) -> Result<f64> {
    if records.nrows() != labels.len() {
        return Err(ScError::ClusteringFailure(format!(
            "{} labels for {} samples",
            labels.len(),
            records.nrows()
        )));
    }

    let dataset = DatasetBase::new(records.view(), Array1::from(labels.to_vec()));
    let score = dataset
        .silhouette_score()
        .map_err(|e| ScError::ClusteringFailure(format!("silhouette failed: {e}")))?;

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let singletons = counts.values().filter(|&&c| c == 1).count();

    Ok(score - singletons as f64 / labels.len() as f64)
}

/// Cluster and score in one step; the score is computed on `records`
///
/// # Errors
/// Propagates [`kmeans`] and [`silhouette`] failures
pub fn cluster_and_score(records: &Array2<f64>, config: &ClusterConfig) -> Result<ScoredClustering> {
    let clusters = kmeans(records, config)?;
    let score = silhouette(records, &clusters.labels)?;
    debug!(k = clusters.k, score, inertia = clusters.inertia, "scored clustering");
    Ok(ScoredClustering { clusters, score })
}

/// Inertia for k = 1..=`max_k` and the knee of that curve
///
/// The knee is the point of maximum second difference, never below 2.
///
/// # Errors
/// Returns error if no `k` could be fitted
pub fn elbow(records: &Array2<f64>, max_k: usize, config: &ClusterConfig) -> Result<ElbowResult> {
    let max_k = max_k.min(records.nrows());
    let mut points = Vec::with_capacity(max_k);

    for k in 1..=max_k {
        let params = ClusterConfig {
            k,
            ..config.clone()
        };
        match kmeans(records, &params) {
            Ok(result) => points.push(ElbowPoint {
                k,
                inertia: result.inertia,
            }),
            Err(e) => {
                warn!(k, "elbow sweep stopped: {e}");
                break;
            }
        }
    }

    if points.is_empty() {
        return Err(ScError::ClusteringFailure(
            "elbow sweep produced no fits".into(),
        ));
    }

    let suggested_k = knee(&points).max(2);
    Ok(ElbowResult {
        points,
        suggested_k,
    })
}

fn knee(points: &[ElbowPoint]) -> usize {
    if points.len() < 3 {
        return points.last().map_or(1, |p| p.k);
    }

    let mut max_diff = f64::MIN;
    let mut knee_k = points[1].k;

    for i in 1..points.len() - 1 {
        let second_diff = (points[i + 1].inertia - points[i].inertia)
            - (points[i].inertia - points[i - 1].inertia);
        if second_diff > max_diff {
            max_diff = second_diff;
            knee_k = points[i].k;
        }
    }

    knee_k
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three tight blobs of 5 points each
    fn three_blobs() -> Array2<f64> {
        let centers = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)];
        let offsets = [(0.0, 0.0), (0.1, 0.0), (0.0, 0.1), (-0.1, 0.0), (0.0, -0.1)];
        let mut flat = Vec::new();
        for (cx, cy) in centers {
            for (dx, dy) in offsets {
                flat.push(cx + dx);
                flat.push(cy + dy);
            }
        }
        Array2::from_shape_vec((15, 2), flat).expect("shape")
    }

    #[test]
    fn test_kmeans_clustering() {
        let records = three_blobs();
        let result = kmeans(&records, &ClusterConfig::default()).expect("run kmeans");

        assert_eq!(result.k, 3);
        assert_eq!(result.labels.len(), 15);
        assert!(result.labels.iter().all(|&l| l < 3));
        // Each blob is its own cluster
        assert!(result.sizes.iter().all(|&s| s == 5));
        for blob in result.labels.chunks(5) {
            assert!(blob.iter().all(|&l| l == blob[0]));
        }
    }

    #[test]
    fn test_kmeans_is_deterministic() {
        let records = three_blobs();
        let config = ClusterConfig::default();
        let a = kmeans(&records, &config).expect("first");
        let b = kmeans(&records, &config).expect("second");
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_few_samples() {
        let records = Array2::from_shape_vec((2, 1), vec![0.0, 1.0]).expect("shape");
        let err = kmeans(&records, &ClusterConfig::default()).expect_err("n < k");
        assert!(matches!(err, ScError::ClusteringFailure(_)));
    }

    #[test]
    fn test_silhouette_well_separated() {
        let records = three_blobs();
        let scored = cluster_and_score(&records, &ClusterConfig::default()).expect("score");
        assert!(scored.score > 0.9);
        assert!(scored.score <= 1.0);
    }

    #[test]
    fn test_silhouette_length_mismatch() {
        let records = three_blobs();
        assert!(silhouette(&records, &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_silhouette_singleton_scores_zero() {
        let records =
            Array2::from_shape_vec((5, 1), vec![0.0, 1.0, 10.0, 11.0, 100.0]).expect("shape");
        let score = silhouette(&records, &[0, 0, 1, 1, 2]).expect("silhouette");

        // 0 -> 1 - 1/10.5, 1 -> 1 - 1/9.5, 10 -> 1 - 1/9.5, 11 -> 1 - 1/10.5, 100 -> 0
        let expected = (2.0 * (1.0 - 1.0 / 10.5) + 2.0 * (1.0 - 1.0 / 9.5)) / 5.0;
        assert!((score - expected).abs() < 1e-9, "got {score}, expected {expected}");
    }

    #[test]
    fn test_empty_cluster_after_reseeds_fails() {
        // Two distinct points cannot fill three clusters
        let records = Array2::from_shape_vec((5, 1), vec![0.0, 0.0, 0.0, 1.0, 1.0]).expect("shape");
        let err = kmeans(&records, &ClusterConfig::default()).expect_err("empty cluster");
        assert!(matches!(err, ScError::ClusteringFailure(_)));

        let no_reseed = ClusterConfig {
            reseed_attempts: 0,
            ..ClusterConfig::default()
        };
        assert!(matches!(
            kmeans(&records, &no_reseed),
            Err(ScError::ClusteringFailure(_))
        ));
    }

    #[test]
    fn test_elbow_finds_three_blobs() {
        let records = three_blobs();
        let result = elbow(&records, 8, &ClusterConfig::default()).expect("elbow");

        assert!(result.points.len() >= 4);
        assert_eq!(result.points[0].k, 1);
        for pair in result.points.windows(2) {
            assert!(pair[1].inertia <= pair[0].inertia + 1e-9);
        }
        assert_eq!(result.suggested_k, 3);
    }

    #[test]
    fn test_knee_short_curves() {
        let one = [ElbowPoint { k: 1, inertia: 4.0 }];
        assert_eq!(knee(&one), 1);
        let two = [
            ElbowPoint { k: 1, inertia: 4.0 },
            ElbowPoint { k: 2, inertia: 1.0 },
        ];
        assert_eq!(knee(&two), 2);
    }
}
