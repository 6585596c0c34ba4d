//! Summary statistics over clustered profiles.

use crate::{profile::ClusteredProfile, PointTable};
use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Quantile with linear interpolation between closest ranks (the
/// numpy/pandas default). NaNs are ignored.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    #[allow(clippy::cast_precision_loss)]
    let pos = q * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    let frac = pos - pos.floor();
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Ordinary least squares fit of `y = intercept + gradient * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fit {
    pub gradient: f64,
    pub intercept: f64,

    /// Standard errors, NaN with fewer than 3 points.
    pub gradient_err: f64,
    pub intercept_err: f64,

    pub r_squared: f64,
}

/// Returns `None` for fewer than 2 points or a vertical line.
pub fn ols(xs: &[f64], ys: &[f64]) -> Option<Fit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let nf = n as f64;
    let mean_x = xs[..n].iter().sum::<f64>() / nf;
    let mean_y = ys[..n].iter().sum::<f64>() / nf;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys.iter()) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }
    let gradient = sxy / sxx;
    let intercept = mean_y - gradient * mean_x;
    let sse = (syy - gradient * sxy).max(0.0);
    let r_squared = if syy == 0.0 { 1.0 } else { 1.0 - sse / syy };
    let (gradient_err, intercept_err) = if n > 2 {
        let s2 = sse / (nf - 2.0);
        (
            (s2 / sxx).sqrt(),
            (s2 * (1.0 / nf + mean_x * mean_x / sxx)).sqrt(),
        )
    } else {
        (f64::NAN, f64::NAN)
    };
    Some(Fit {
        gradient,
        intercept,
        gradient_err,
        intercept_err,
        r_squared,
    })
}

/// Median and interquartile range of slope along a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct MedianProfile {
    pub cluster_id: u32,
    pub colour: String,

    /// `(reg_dist, median, q25, q75)` per regular distance reached by
    /// at least one profile of the cluster.
    pub points: Vec<(f64, f64, f64, f64)>,
}

/// Median profile of every cluster, in ascending cluster order.
///
/// Samples are aligned by their position from the segment head, and
/// distances are read from the longest profile overall.
pub fn median_profiles(profiles: &[ClusteredProfile]) -> Vec<MedianProfile> {
    let Some(longest) = profiles.iter().max_by_key(|p| p.nodes.len()) else {
        return Vec::new();
    };
    let distances: Vec<f64> = longest.nodes.iter().map(|n| n.reg_dist).collect();

    by_cluster(profiles)
        .into_iter()
        .map(|(cluster_id, members)| {
            let points = distances
                .iter()
                .enumerate()
                .filter_map(|(idx, &dist)| {
                    let slopes: Vec<f64> = members
                        .iter()
                        .filter_map(|p| p.nodes.get(idx).map(|n| n.slope))
                        .collect();
                    Some((
                        dist,
                        median(&slopes)?,
                        quantile(&slopes, 0.25)?,
                        quantile(&slopes, 0.75)?,
                    ))
                })
                .collect();
            MedianProfile {
                cluster_id,
                colour: members[0].colour.clone(),
                points,
            }
        })
        .collect()
}

/// One log-spaced drainage area bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaBin {
    /// log10 of the bin centre area.
    pub log_area: f64,

    /// log10 median slope and interquartile bounds.
    pub log_slope: f64,
    pub log_lower: f64,
    pub log_upper: f64,

    pub count: usize,
}

/// Log-binned slope–area relation and its power law fit
/// `S = ks · A^-θ`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlopeArea {
    pub bins: Vec<AreaBin>,

    /// Points that passed the area and slope filters, `(area, slope)`.
    #[serde(skip)]
    pub points: Vec<(f64, f64)>,

    pub fit: Option<Fit>,
}

impl SlopeArea {
    /// Channel steepness index.
    pub fn ks(&self) -> Option<f64> {
        self.fit.map(|fit| 10_f64.powf(fit.intercept))
    }

    pub fn ks_err(&self) -> Option<f64> {
        self.fit.map(|fit| 10_f64.powf(fit.intercept_err))
    }

    /// Concavity index.
    pub fn theta(&self) -> Option<f64> {
        self.fit.map(|fit| fit.gradient.abs())
    }

    pub fn theta_err(&self) -> Option<f64> {
        self.fit.map(|fit| fit.gradient_err.abs())
    }
}

/// Bins `(drainage_area, slope)` pairs with area above
/// `area_threshold` into `nbins` equal log10 area bins.
///
/// Returns `None` when no point survives the filters.
pub fn slope_area<I>(pairs: I, area_threshold: f64, nbins: usize) -> Option<SlopeArea>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let points: Vec<(f64, f64)> = pairs
        .into_iter()
        .filter(|&(area, slope)| {
            area > area_threshold && area > 0.0 && slope > 0.0 && slope.is_finite()
        })
        .collect();
    if points.is_empty() || nbins == 0 {
        return None;
    }

    let logs: Vec<(f64, f64)> = points
        .iter()
        .map(|&(area, slope)| (area.log10(), slope.log10()))
        .collect();
    let (lo, hi) = match logs.iter().map(|&(a, _)| a).minmax() {
        itertools::MinMaxResult::NoElements => return None,
        itertools::MinMaxResult::OneElement(a) => (a - 0.5, a + 0.5),
        itertools::MinMaxResult::MinMax(lo, hi) if lo == hi => (lo - 0.5, hi + 0.5),
        itertools::MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    #[allow(clippy::cast_precision_loss)]
    let width = (hi - lo) / nbins as f64;

    let mut members: Vec<Vec<f64>> = vec![Vec::new(); nbins];
    for &(log_area, log_slope) in &logs {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bin = (((log_area - lo) / width) as usize).min(nbins - 1);
        members[bin].push(log_slope);
    }

    let bins: Vec<AreaBin> = members
        .iter()
        .enumerate()
        .filter_map(|(idx, slopes)| {
            #[allow(clippy::cast_precision_loss)]
            let log_area = lo + (idx as f64 + 0.5) * width;
            Some(AreaBin {
                log_area,
                log_slope: median(slopes)?,
                log_lower: quantile(slopes, 0.25)?,
                log_upper: quantile(slopes, 0.75)?,
                count: slopes.len(),
            })
        })
        .collect();

    let (xs, ys): (Vec<f64>, Vec<f64>) = bins.iter().map(|b| (b.log_area, b.log_slope)).unzip();
    let fit = ols(&xs, &ys);

    Some(SlopeArea { bins, points, fit })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSlopeArea {
    pub cluster_id: u32,
    pub colour: String,
    pub slope_area: Option<SlopeArea>,
}

/// Slope–area relation of every cluster over the whole flow paths of
/// its member sources, not just the clustered segments.
///
/// Nodes drained by sources of more than one cluster are left out.
pub fn cluster_slope_area(
    table: &PointTable,
    profiles: &[ClusteredProfile],
    area_threshold: f64,
    nbins: usize,
) -> Vec<ClusterSlopeArea> {
    let cluster_of: HashMap<u32, u32> = profiles.iter().map(|p| (p.id, p.cluster_id)).collect();

    let mut node_clusters: HashMap<u64, HashSet<u32>> = HashMap::new();
    for source in table.sources() {
        if let Some(&cluster_id) = cluster_of.get(&source.id) {
            for point in &source.points {
                node_clusters.entry(point.node).or_default().insert(cluster_id);
            }
        }
    }

    by_cluster(profiles)
        .into_iter()
        .map(|(cluster_id, members)| {
            let pairs = members
                .iter()
                .filter_map(|p| table.source(p.id))
                .flat_map(|source| source.points.iter())
                .filter(|point| node_clusters.get(&point.node).map_or(0, HashSet::len) == 1)
                .filter_map(|point| point.slope.map(|slope| (point.drainage_area, slope)));
            ClusterSlopeArea {
                cluster_id,
                colour: members[0].colour.clone(),
                slope_area: slope_area(pairs, area_threshold, nbins),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster_id: u32,
    pub colour: String,
    pub n_profiles: usize,
    pub n_nodes: usize,
    pub median_slope: f64,

    /// Mean of the last `reg_dist` of each member profile.
    pub mean_length_m: f64,
}

pub fn cluster_summaries(profiles: &[ClusteredProfile]) -> Vec<ClusterSummary> {
    by_cluster(profiles)
        .into_iter()
        .map(|(cluster_id, members)| {
            let slopes: Vec<f64> = members
                .iter()
                .flat_map(|p| p.nodes.iter().map(|n| n.slope))
                .collect();
            let lengths: Vec<f64> = members
                .iter()
                .filter_map(|p| p.nodes.last().map(|n| n.reg_dist))
                .collect();
            #[allow(clippy::cast_precision_loss)]
            let mean_length_m = lengths.iter().sum::<f64>() / lengths.len().max(1) as f64;
            ClusterSummary {
                cluster_id,
                colour: members[0].colour.clone(),
                n_profiles: members.len(),
                n_nodes: slopes.len(),
                median_slope: median(&slopes).unwrap_or(f64::NAN),
                mean_length_m,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LithologyShare {
    pub cluster_id: u32,
    pub lithology: i64,
    pub count: usize,

    /// Share of the cluster's sampled nodes on this lithology.
    pub fraction: f64,
}

/// Tallies `(cluster_id, lithology code)` samples per cluster.
pub fn lithology_composition<I>(samples: I) -> Vec<LithologyShare>
where
    I: IntoIterator<Item = (u32, i64)>,
{
    let mut counts: BTreeMap<u32, BTreeMap<i64, usize>> = BTreeMap::new();
    for (cluster_id, code) in samples {
        *counts.entry(cluster_id).or_default().entry(code).or_default() += 1;
    }
    counts
        .into_iter()
        .flat_map(|(cluster_id, codes)| {
            let total: usize = codes.values().sum();
            codes.into_iter().map(move |(lithology, count)| {
                #[allow(clippy::cast_precision_loss)]
                let fraction = count as f64 / total as f64;
                LithologyShare {
                    cluster_id,
                    lithology,
                    count,
                    fraction,
                }
            })
        })
        .collect()
}

/// Groups profiles by cluster id, ascending.
pub fn by_cluster(profiles: &[ClusteredProfile]) -> BTreeMap<u32, Vec<&ClusteredProfile>> {
    let mut clusters: BTreeMap<u32, Vec<&ClusteredProfile>> = BTreeMap::new();
    for profile in profiles {
        clusters.entry(profile.cluster_id).or_default().push(profile);
    }
    clusters
}
