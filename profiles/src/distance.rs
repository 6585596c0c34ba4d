//! Pairwise dissimilarity between profiles of unequal length.

use crate::ProfileError;
use log::debug;
use rayon::prelude::*;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// Angle between the centred slope series, `acos(pearson r)`.
    #[default]
    Correlation,

    /// Root-mean-square slope difference.
    Rmse,
}

impl FromStr for Metric {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, ProfileError> {
        match s.to_lowercase().as_str() {
            "correlation" | "corr" => Ok(Self::Correlation),
            "rmse" => Ok(Self::Rmse),
            _ => Err(ProfileError::Metric(s.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correlation => write!(f, "correlation"),
            Self::Rmse => write!(f, "rmse"),
        }
    }
}

/// Dissimilarity of `a` and `b` over their common prefix.
///
/// Both series start at their profile heads, so the prefix compares
/// the same distance downstream in each.
pub fn dissimilarity(a: &[f64], b: &[f64], metric: Metric) -> f64 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);
    match metric {
        Metric::Correlation => pearson(a, b).clamp(-1.0, 1.0).acos(),
        Metric::Rmse => {
            if n == 0 {
                return 0.0;
            }
            #[allow(clippy::cast_precision_loss)]
            let mse = a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                / n as f64;
            mse.sqrt()
        }
    }
}

/// Pearson correlation, 0 when either series has no variance.
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len();
    if n < 2 || is_flat(a) || is_flat(b) {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let nf = n as f64;
    let mean_a = a.iter().sum::<f64>() / nf;
    let mean_b = b.iter().sum::<f64>() / nf;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (da, db) = (x - mean_a, y - mean_b);
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    cov / (var_a * var_b).sqrt()
}

fn is_flat(series: &[f64]) -> bool {
    series.windows(2).all(|pair| pair[0] == pair[1])
}

/// Condensed (upper triangle, row-major) distance matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn pairwise(series: &[Vec<f64>], metric: Metric) -> Self {
        Self::pairwise_with_progress(series, metric, || ())
    }

    /// Computes rows in parallel, calling `on_row` once each row is
    /// done.
    pub fn pairwise_with_progress<F>(series: &[Vec<f64>], metric: Metric, on_row: F) -> Self
    where
        F: Fn() + Sync,
    {
        let n = series.len();
        let now = std::time::Instant::now();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let row = ((i + 1)..n)
                    .map(|j| dissimilarity(&series[i], &series[j], metric))
                    .collect();
                on_row();
                row
            })
            .collect();
        let values: Vec<f64> = rows.into_iter().flatten().collect();
        debug!(
            "distance matrix; n: {n}, metric: {metric}, exec: {:?}",
            now.elapsed()
        );
        Self { n, values }
    }

    /// Wraps a scipy-style condensed vector of `n·(n-1)/2` distances.
    pub fn from_condensed(n: usize, values: Vec<f64>) -> Result<Self, ProfileError> {
        let expected = n * n.saturating_sub(1) / 2;
        if values.len() == expected {
            Ok(Self { n, values })
        } else {
            Err(ProfileError::Condensed {
                expected,
                actual: values.len(),
            })
        }
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn condensed(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Less => self.values[self.index(i, j)],
            std::cmp::Ordering::Greater => self.values[self.index(j, i)],
        }
    }

    fn index(&self, i: usize, j: usize) -> usize {
        self.n * i - i * (i + 1) / 2 + j - i - 1
    }
}

#[cfg(test)]
mod tests {
    use super::{dissimilarity, DistanceMatrix, Metric};
    use approx::assert_relative_eq;
    use std::{
        f64::consts::{FRAC_PI_2, PI},
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn test_correlation_uses_common_prefix() {
        let short = [0.1, 0.2, 0.3];
        let long = [1.0, 2.0, 3.0, -50.0, 8.0];
        assert_relative_eq!(
            dissimilarity(&short, &long, Metric::Correlation),
            0.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            dissimilarity(&long, &short, Metric::Correlation),
            0.0,
            epsilon = 1e-6
        );
        let reversed = [3.0, 2.0, 1.0];
        assert_relative_eq!(
            dissimilarity(&short, &reversed, Metric::Correlation),
            PI,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_flat_or_tiny_series_are_uncorrelated() {
        let flat = [0.2, 0.2, 0.2];
        let rising = [0.1, 0.2, 0.3];
        assert_relative_eq!(dissimilarity(&flat, &rising, Metric::Correlation), FRAC_PI_2);
        assert_relative_eq!(dissimilarity(&[0.1], &[0.5, 0.6], Metric::Correlation), FRAC_PI_2);
    }

    #[test]
    fn test_rmse() {
        let a = [0.0, 0.0, 0.0, 7.0];
        let b = [3.0, 3.0, 3.0];
        assert_relative_eq!(dissimilarity(&a, &b, Metric::Rmse), 3.0);
        assert_relative_eq!(dissimilarity(&[], &b, Metric::Rmse), 0.0);
    }

    #[test]
    fn test_condensed_layout_matches_scipy() {
        let series = vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![3.0, 3.0],
            vec![6.0, 6.0],
        ];
        let rows = AtomicUsize::new(0);
        let dm = DistanceMatrix::pairwise_with_progress(&series, Metric::Rmse, || {
            rows.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(rows.load(Ordering::Relaxed), 4);
        assert_eq!(dm.len(), 4);
        assert_eq!(dm.condensed(), &[1.0, 3.0, 6.0, 2.0, 5.0, 3.0]);
        assert_relative_eq!(dm.get(3, 1), 5.0);
        assert_relative_eq!(dm.get(2, 2), 0.0);
    }

    #[test]
    fn test_from_condensed_checks_len() {
        assert!(DistanceMatrix::from_condensed(3, vec![1.0, 2.0, 3.0]).is_ok());
        assert!(DistanceMatrix::from_condensed(3, vec![1.0, 2.0]).is_err());
        assert!(DistanceMatrix::from_condensed(0, vec![]).is_ok());
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!("Correlation".parse::<Metric>().unwrap(), Metric::Correlation);
        assert_eq!("rmse".parse::<Metric>().unwrap(), Metric::Rmse);
        assert!("dtw".parse::<Metric>().is_err());
    }
}
