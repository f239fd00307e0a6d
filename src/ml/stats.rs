use crate::structs::{Result, ScError};

/// Arithmetic mean; `0.0` for an empty slice
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance over all values (divides by `n`)
///
/// This is the estimator a variance threshold on a fixed table is defined
/// against, so a constant column always scores exactly zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Calculate correlation coefficient between two variables
///
/// # Errors
/// Returns error if vectors have different lengths or fewer than 2 values
#[allow(clippy::cast_precision_loss)]
pub fn correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(ScError::Ml("Vectors must have same length".into()));
    }
    if x.len() < 2 {
        return Err(ScError::Ml("Need at least 2 values for correlation".into()));
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }

    Ok(cov / denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((variance(&values) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_variance_is_zero() {
        assert!(variance(&[3.0; 10]).abs() < f64::EPSILON);
        assert!(variance(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_correlation() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let corr = correlation(&x, &y).expect("calculate correlation");

        assert!((corr - 1.0).abs() < 0.01); // Perfect positive correlation
    }

    #[test]
    fn test_correlation_constant_is_zero() {
        let corr = correlation(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]).expect("correlation");
        assert!(corr.abs() < f64::EPSILON);
        assert!(correlation(&[1.0], &[1.0]).is_err());
    }
}
