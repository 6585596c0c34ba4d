use crate::{points::RiverPoint, PointTable, ProfileError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs::File,
    io::{Read, Write},
    path::Path,
};

/// A regularly spaced sample along a profile, carrying the attributes
/// of the nearest channel node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileNode {
    pub id: u32,
    pub node: u64,

    /// Distance downstream of the profile head, in meters.
    pub reg_dist: f64,

    pub slope: f64,
    pub elevation: f64,
    pub drainage_area: f64,
    pub distance_from_outlet: f64,
    pub latitude: f64,
    pub longitude: f64,

    #[serde(default)]
    pub row: Option<usize>,

    #[serde(default)]
    pub col: Option<usize>,

    #[serde(default)]
    pub x: Option<f64>,

    #[serde(default)]
    pub y: Option<f64>,
}

impl ProfileNode {
    fn resampled(point: &RiverPoint, reg_dist: f64, slope: f64) -> Self {
        Self {
            id: point.id,
            node: point.node,
            reg_dist,
            slope,
            elevation: point.elevation,
            drainage_area: point.drainage_area,
            distance_from_outlet: point.distance_from_outlet,
            latitude: point.latitude,
            longitude: point.longitude,
            row: point.row,
            col: point.col,
            x: point.x,
            y: point.y,
        }
    }
}

/// One source's channel segment of a single stream order, resampled
/// at a regular step from its head.
#[derive(Debug, Clone, PartialEq)]
pub struct RiverProfile {
    pub id: u32,
    pub nodes: Vec<ProfileNode>,
}

impl RiverProfile {
    /// Number of regular samples.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn slopes(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.slope).collect()
    }
}

/// Extracts one profile per source from the nodes of `stream_order`
/// with a defined slope.
///
/// The head of a profile is its most upstream qualifying node. Samples
/// are taken every `step` meters downstream of it, each from the
/// nearest node.
pub fn profiles_by_stream_order(
    table: &PointTable,
    step: f64,
    stream_order: u32,
) -> Result<Vec<RiverProfile>, ProfileError> {
    if !(step > 0.0 && step.is_finite()) {
        return Err(ProfileError::Step(step));
    }

    let profiles: Vec<RiverProfile> = table
        .sources()
        .iter()
        .filter_map(|source| {
            let segment: Vec<(&RiverPoint, f64)> = source
                .points
                .iter()
                .filter(|p| p.stream_order == stream_order)
                .filter_map(|p| p.slope.map(|slope| (p, slope)))
                .collect();
            let (head, _) = segment.first()?;
            let head_dist = head.distance_from_outlet;
            let distances: Vec<f64> = segment
                .iter()
                .map(|(p, _)| head_dist - p.distance_from_outlet)
                .collect();
            let max_dist = *distances.last()?;

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let n_steps = (max_dist / step + 1e-9).floor() as usize;
            let nodes = (0..=n_steps)
                .map(|k| {
                    #[allow(clippy::cast_precision_loss)]
                    let reg_dist = k as f64 * step;
                    let (point, slope) = segment[nearest_index(&distances, reg_dist)];
                    ProfileNode::resampled(point, reg_dist, slope)
                })
                .collect();
            Some(RiverProfile {
                id: source.id,
                nodes,
            })
        })
        .collect();

    info!(
        "extracted {} profiles of stream order {stream_order} from {} sources",
        profiles.len(),
        table.sources().len()
    );
    Ok(profiles)
}

/// Index of the value in ascending `sorted` closest to `value`. Ties
/// resolve to the larger value.
fn nearest_index(sorted: &[f64], value: f64) -> usize {
    let idx = sorted.partition_point(|&d| d < value);
    if idx == 0 {
        return 0;
    }
    let closer_below =
        idx == sorted.len() || (value - sorted[idx - 1]).abs() < (sorted[idx] - value).abs();
    if closer_below {
        idx - 1
    } else {
        idx
    }
}

/// Drops profiles that share all of their nodes with longer profiles.
///
/// Above first order, every source draining through a segment yields
/// the same (or a truncated) copy of it. Profiles are visited longest
/// first and kept if they add at least one node not already covered.
pub fn remove_non_unique_profiles(profiles: Vec<RiverProfile>) -> Vec<RiverProfile> {
    let mut order: Vec<usize> = (0..profiles.len()).collect();
    order.sort_by_key(|&idx| std::cmp::Reverse(profiles[idx].len()));

    let mut covered: HashSet<u64> = HashSet::new();
    let mut keep = vec![false; profiles.len()];
    for idx in order {
        let nodes: Vec<u64> = profiles[idx].nodes.iter().map(|n| n.node).collect();
        if nodes.iter().any(|node| !covered.contains(node)) {
            keep[idx] = true;
            covered.extend(nodes);
        }
    }

    let before = profiles.len();
    let unique: Vec<RiverProfile> = profiles
        .into_iter()
        .zip(keep)
        .filter_map(|(profile, keep)| keep.then_some(profile))
        .collect();
    debug!("kept {} of {before} unique profiles", unique.len());
    unique
}

pub fn remove_profiles_shorter_than(
    mut profiles: Vec<RiverProfile>,
    min_len: usize,
) -> Vec<RiverProfile> {
    let before = profiles.len();
    profiles.retain(|profile| profile.len() >= min_len);
    debug!(
        "kept {} of {before} profiles with at least {min_len} samples",
        profiles.len()
    );
    profiles
}

/// Writes profiles as one row per sample.
pub fn write_profiles_csv<P: AsRef<Path>>(
    path: P,
    profiles: &[RiverProfile],
) -> Result<(), ProfileError> {
    let mut wtr = csv::Writer::from_writer(File::create(path)?);
    for node in profiles.iter().flat_map(|p| p.nodes.iter()) {
        wtr.serialize(node)?;
    }
    wtr.flush()?;
    Ok(())
}

/// A profile sample with its cluster assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredNode {
    pub id: u32,
    pub node: u64,
    pub reg_dist: f64,
    pub slope: f64,
    pub elevation: f64,
    pub drainage_area: f64,
    pub distance_from_outlet: f64,
    pub latitude: f64,
    pub longitude: f64,

    #[serde(default)]
    pub row: Option<usize>,

    #[serde(default)]
    pub col: Option<usize>,

    #[serde(default)]
    pub x: Option<f64>,

    #[serde(default)]
    pub y: Option<f64>,

    pub cluster_id: u32,

    /// `#rrggbb` display colour of the cluster.
    pub colour: String,
}

impl ClusteredNode {
    fn new(node: &ProfileNode, cluster_id: u32, colour: &str) -> Self {
        Self {
            id: node.id,
            node: node.node,
            reg_dist: node.reg_dist,
            slope: node.slope,
            elevation: node.elevation,
            drainage_area: node.drainage_area,
            distance_from_outlet: node.distance_from_outlet,
            latitude: node.latitude,
            longitude: node.longitude,
            row: node.row,
            col: node.col,
            x: node.x,
            y: node.y,
            cluster_id,
            colour: colour.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusteredProfile {
    pub id: u32,
    pub cluster_id: u32,
    pub colour: String,
    pub nodes: Vec<ClusteredNode>,
}

/// Attaches `labels[i]` (1-based cluster ids) to `profiles[i]`, with
/// colours taken from `palette[label - 1]`.
pub fn assign_clusters(
    profiles: &[RiverProfile],
    labels: &[u32],
    palette: &[String],
) -> Result<Vec<ClusteredProfile>, ProfileError> {
    if profiles.len() != labels.len() {
        return Err(ProfileError::Labels(labels.len(), profiles.len()));
    }
    profiles
        .iter()
        .zip(labels)
        .map(|(profile, &cluster_id)| {
            let colour = cluster_id
                .checked_sub(1)
                .and_then(|idx| palette.get(idx as usize))
                .ok_or(ProfileError::Palette {
                    cluster_id,
                    colours: palette.len(),
                })?;
            Ok(ClusteredProfile {
                id: profile.id,
                cluster_id,
                colour: colour.clone(),
                nodes: profile
                    .nodes
                    .iter()
                    .map(|node| ClusteredNode::new(node, cluster_id, colour))
                    .collect(),
            })
        })
        .collect()
}

pub fn write_clustered_csv<P: AsRef<Path>>(
    path: P,
    profiles: &[ClusteredProfile],
) -> Result<(), ProfileError> {
    write_clustered(File::create(path)?, profiles)
}

pub fn write_clustered<W: Write>(
    wtr: W,
    profiles: &[ClusteredProfile],
) -> Result<(), ProfileError> {
    let mut wtr = csv::Writer::from_writer(wtr);
    for node in profiles.iter().flat_map(|p| p.nodes.iter()) {
        wtr.serialize(node)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_clustered_csv<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<ClusteredProfile>, ProfileError> {
    read_clustered(File::open(path)?)
}

/// Reads clustered rows and regroups consecutive rows of one source
/// into profiles.
pub fn read_clustered<R: Read>(rdr: R) -> Result<Vec<ClusteredProfile>, ProfileError> {
    let mut rdr = csv::Reader::from_reader(rdr);
    let mut profiles: Vec<ClusteredProfile> = Vec::new();
    for record in rdr.deserialize() {
        let node: ClusteredNode = record?;
        match profiles.last_mut() {
            Some(profile) if profile.id == node.id => profile.nodes.push(node),
            _ => profiles.push(ClusteredProfile {
                id: node.id,
                cluster_id: node.cluster_id,
                colour: node.colour.clone(),
                nodes: vec![node],
            }),
        }
    }
    if profiles.is_empty() {
        return Err(ProfileError::EmptyTable);
    }
    Ok(profiles)
}
