//! Flat clusters from a dendrogram.

use crate::{Linkage, ProfileError};
use log::info;

/// Where to cut the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Threshold {
    /// Merge distance.
    Distance(f64),

    /// Minimum correlation inside a cluster, cut at `acos(c)`.
    MinCorrelation(f64),

    /// Lowest cut giving at most this many clusters.
    MaxClusters(usize),

    /// Middle of the largest gap between successive merge distances.
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clusters {
    /// 1-based cluster id per observation.
    pub labels: Vec<u32>,

    /// Merge distance the tree was cut at.
    pub threshold: f64,
}

impl Clusters {
    pub fn n_clusters(&self) -> usize {
        self.labels.iter().max().map_or(0, |&k| k as usize)
    }
}

/// Cuts `linkage` into flat clusters.
///
/// Every subtree whose largest merge distance is at most the threshold
/// becomes one cluster. Clusters are numbered from 1 in dendrogram
/// order, left to right.
pub fn fcluster(linkage: &Linkage, threshold: Threshold) -> Result<Clusters, ProfileError> {
    let max_dists = linkage.max_dists();
    let clusters = match threshold {
        Threshold::Distance(t) => {
            if t.is_nan() {
                return Err(ProfileError::Threshold(format!("distance {t}")));
            }
            cut(linkage, &max_dists, t)
        }
        Threshold::MinCorrelation(c) => {
            if !(-1.0..=1.0).contains(&c) {
                return Err(ProfileError::Threshold(format!(
                    "correlation {c} outside [-1, 1]"
                )));
            }
            cut(linkage, &max_dists, c.acos())
        }
        Threshold::MaxClusters(0) => {
            return Err(ProfileError::Threshold("zero clusters".to_string()))
        }
        Threshold::MaxClusters(k) => {
            let mut candidates = max_dists.clone();
            candidates.sort_by(f64::total_cmp);
            let mut clusters = cut(linkage, &max_dists, 0.0);
            for t in candidates {
                if clusters.n_clusters() <= k {
                    break;
                }
                clusters = cut(linkage, &max_dists, t);
            }
            clusters
        }
        Threshold::Auto => cut(linkage, &max_dists, largest_gap(&max_dists)),
    };
    info!(
        "cut dendrogram at {:.4} into {} clusters",
        clusters.threshold,
        clusters.n_clusters()
    );
    Ok(clusters)
}

/// Midpoint of the widest gap between sorted merge distances, or the
/// top merge when there is no gap to choose.
fn largest_gap(max_dists: &[f64]) -> f64 {
    let mut heights = max_dists.to_vec();
    heights.sort_by(f64::total_cmp);
    let mut best: Option<(f64, f64)> = None;
    for pair in heights.windows(2) {
        let gap = pair[1] - pair[0];
        if best.map_or(true, |(widest, _)| gap > widest) {
            best = Some((gap, (pair[0] + pair[1]) / 2.0));
        }
    }
    best.map_or_else(|| heights.last().copied().unwrap_or(0.0), |(_, t)| t)
}

fn cut(linkage: &Linkage, max_dists: &[f64], t: f64) -> Clusters {
    let n = linkage.len();
    let mut labels = vec![0_u32; n];
    let mut next = 0_u32;
    let mut stack = vec![linkage.root()];
    while let Some(id) = stack.pop() {
        if id >= n && max_dists[id - n] > t {
            let merge = &linkage.merges()[id - n];
            stack.push(merge.right);
            stack.push(merge.left);
        } else {
            next += 1;
            for leaf in linkage.leaves(id) {
                labels[leaf] = next;
            }
        }
    }
    Clusters {
        labels,
        threshold: t,
    }
}

#[cfg(test)]
mod tests {
    use super::{fcluster, Threshold};
    use crate::{
        linkage::{linkage, tests::line},
        Method, ProfileError,
    };

    // Single linkage of the line gives merge distances 1, 2 and 4.
    fn labels(threshold: Threshold) -> (Vec<u32>, f64) {
        let z = linkage(&line(), Method::Single).unwrap();
        let clusters = fcluster(&z, threshold).unwrap();
        (clusters.labels, clusters.threshold)
    }

    #[test]
    fn test_distance_cut_numbers_left_to_right() {
        assert_eq!(labels(Threshold::Distance(1.5)).0, vec![3, 3, 2, 1]);
        assert_eq!(labels(Threshold::Distance(0.5)).0, vec![3, 4, 2, 1]);
        assert_eq!(labels(Threshold::Distance(10.0)).0, vec![1, 1, 1, 1]);
        // Cut exactly at a merge keeps that merge.
        assert_eq!(labels(Threshold::Distance(2.0)).0, vec![2, 2, 2, 1]);
    }

    #[test]
    fn test_auto_cuts_in_largest_gap() {
        assert_eq!(labels(Threshold::Auto), (vec![2, 2, 2, 1], 3.0));
    }

    #[test]
    fn test_max_clusters() {
        assert_eq!(labels(Threshold::MaxClusters(2)), (vec![2, 2, 2, 1], 2.0));
        assert_eq!(labels(Threshold::MaxClusters(4)).0, vec![3, 4, 2, 1]);
        assert_eq!(labels(Threshold::MaxClusters(1)).0, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_min_correlation() {
        // acos(1) = 0 keeps every profile apart.
        assert_eq!(labels(Threshold::MinCorrelation(1.0)).0, vec![3, 4, 2, 1]);
        // acos(-1) = π sits between the last two merges.
        assert_eq!(labels(Threshold::MinCorrelation(-1.0)).0, vec![2, 2, 2, 1]);
    }

    #[test]
    fn test_invalid_thresholds() {
        let z = linkage(&line(), Method::Single).unwrap();
        for threshold in [
            Threshold::MaxClusters(0),
            Threshold::MinCorrelation(1.5),
            Threshold::Distance(f64::NAN),
        ] {
            assert!(matches!(
                fcluster(&z, threshold),
                Err(ProfileError::Threshold(_))
            ));
        }
    }

    #[test]
    fn test_two_observations_auto_is_one_cluster() {
        let dm = crate::DistanceMatrix::from_condensed(2, vec![0.3]).unwrap();
        let z = linkage(&dm, Method::Average).unwrap();
        let clusters = fcluster(&z, Threshold::Auto).unwrap();
        assert_eq!(clusters.labels, vec![1, 1]);
        assert_eq!(clusters.n_clusters(), 1);
    }
}
