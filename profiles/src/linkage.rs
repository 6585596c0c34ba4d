//! Agglomerative hierarchical clustering over a condensed distance
//! matrix.

use crate::{DistanceMatrix, ProfileError};
use log::debug;
use serde::Serialize;
use std::{fmt, fs::File, io::Write, path::Path, str::FromStr};

/// Inter-cluster distance update, named as in scipy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    Single,
    Complete,
    Average,
    Weighted,
    Centroid,
    Median,
    #[default]
    Ward,
}

impl Method {
    /// New distance from the union of clusters `i` and `j` to cluster
    /// `k`, given the current pairwise distances and cluster sizes.
    #[allow(clippy::cast_precision_loss, clippy::too_many_arguments)]
    fn update(self, d_ik: f64, d_jk: f64, d_ij: f64, s_i: usize, s_j: usize, s_k: usize) -> f64 {
        let (s_i, s_j, s_k) = (s_i as f64, s_j as f64, s_k as f64);
        match self {
            Self::Single => d_ik.min(d_jk),
            Self::Complete => d_ik.max(d_jk),
            Self::Average => (s_i * d_ik + s_j * d_jk) / (s_i + s_j),
            Self::Weighted => (d_ik + d_jk) / 2.0,
            Self::Centroid => {
                let s = s_i + s_j;
                ((s_i * d_ik * d_ik + s_j * d_jk * d_jk - s_i * s_j * d_ij * d_ij / s) / s)
                    .max(0.0)
                    .sqrt()
            }
            Self::Median => (d_ik * d_ik / 2.0 + d_jk * d_jk / 2.0 - d_ij * d_ij / 4.0)
                .max(0.0)
                .sqrt(),
            Self::Ward => (((s_i + s_k) * d_ik * d_ik + (s_j + s_k) * d_jk * d_jk
                - s_k * d_ij * d_ij)
                / (s_i + s_j + s_k))
                .max(0.0)
                .sqrt(),
        }
    }
}

impl FromStr for Method {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, ProfileError> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "complete" => Ok(Self::Complete),
            "average" => Ok(Self::Average),
            "weighted" => Ok(Self::Weighted),
            "centroid" => Ok(Self::Centroid),
            "median" => Ok(Self::Median),
            "ward" => Ok(Self::Ward),
            _ => Err(ProfileError::Method(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single",
            Self::Complete => "complete",
            Self::Average => "average",
            Self::Weighted => "weighted",
            Self::Centroid => "centroid",
            Self::Median => "median",
            Self::Ward => "ward",
        };
        f.write_str(name)
    }
}

/// One row of the linkage table.
///
/// Ids below `n` are observations, id `n + s` is the cluster formed
/// at merge `s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Linkage {
    n: usize,
    merges: Vec<Merge>,
}

/// Clusters the `n` observations of `matrix`, always merging the
/// closest pair of clusters.
///
/// Ties go to the pair with the lowest row-major index.
pub fn linkage(matrix: &DistanceMatrix, method: Method) -> Result<Linkage, ProfileError> {
    let n = matrix.len();
    if n < 2 {
        return Err(ProfileError::TooFewProfiles(n));
    }
    let now = std::time::Instant::now();

    let mut dist = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = matrix.get(i, j);
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }
    let mut active = vec![true; n];
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1_usize; n];
    let mut merges = Vec::with_capacity(n - 1);

    for step in 0..(n - 1) {
        let mut closest: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                let d = dist[i * n + j];
                if closest.map_or(true, |(_, _, best)| d < best) {
                    closest = Some((i, j, d));
                }
            }
        }
        let Some((i, j, d_ij)) = closest else {
            break;
        };

        for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
            let d = method.update(
                dist[i * n + k],
                dist[j * n + k],
                d_ij,
                sizes[i],
                sizes[j],
                sizes[k],
            );
            dist[i * n + k] = d;
            dist[k * n + i] = d;
        }

        merges.push(Merge {
            left: ids[i].min(ids[j]),
            right: ids[i].max(ids[j]),
            distance: d_ij,
            size: sizes[i] + sizes[j],
        });
        active[j] = false;
        ids[i] = n + step;
        sizes[i] += sizes[j];
    }

    debug!(
        "linkage; n: {n}, method: {method}, exec: {:?}",
        now.elapsed()
    );
    Ok(Linkage { n, merges })
}

impl Linkage {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Merge distances in merge order.
    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }

    /// Observations in the left-to-right order of the dendrogram.
    pub fn leaves_order(&self) -> Vec<usize> {
        self.leaves(self.root())
    }

    /// Largest merge distance in the subtree of each merge.
    ///
    /// Equals `heights()` for monotone trees; centroid and median
    /// linkage can merge below an earlier merge.
    pub fn max_dists(&self) -> Vec<f64> {
        let mut max_dists: Vec<f64> = Vec::with_capacity(self.merges.len());
        for merge in &self.merges {
            let mut max = merge.distance;
            for child in [merge.left, merge.right] {
                if child >= self.n {
                    max = max.max(max_dists[child - self.n]);
                }
            }
            max_dists.push(max);
        }
        max_dists
    }

    /// Id of the final cluster.
    pub(crate) fn root(&self) -> usize {
        self.n + self.merges.len() - 1
    }

    /// Observations below `id`, left subtree first.
    pub(crate) fn leaves(&self, id: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if id < self.n {
                leaves.push(id);
            } else {
                let merge = &self.merges[id - self.n];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        leaves
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), ProfileError> {
        self.write(File::create(path)?)
    }

    pub fn write<W: Write>(&self, wtr: W) -> Result<(), ProfileError> {
        let mut wtr = csv::Writer::from_writer(wtr);
        for merge in &self.merges {
            wtr.serialize(merge)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
