//! River longitudinal profiles: extraction from a channel network and
//! hierarchical clustering of profiles of unequal length.
//!
//! # References
//!
//! 1. [LSDTopoTools channel extraction](https://lsdtopotools.github.io/LSDTT_documentation/LSDTT_channel_extraction.html)
//! 1. [scipy.cluster.hierarchy.linkage](https://docs.scipy.org/doc/scipy/reference/generated/scipy.cluster.hierarchy.linkage.html)

pub mod colour;
mod cut;
mod distance;
mod error;
pub mod linkage;
mod points;
pub mod profile;
mod slope;
pub mod stats;

pub use crate::{
    cut::{fcluster, Clusters, Threshold},
    distance::{dissimilarity, DistanceMatrix, Metric},
    error::ProfileError,
    linkage::{linkage, Linkage, Merge, Method},
    points::{PointTable, RiverPoint, Source},
    profile::{ClusteredNode, ClusteredProfile, ProfileNode, RiverProfile},
    slope::calculate_slope,
};
