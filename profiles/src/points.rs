//! River network point table, as written by LSDTopoTools'
//! `*_all_tribs.csv` export.

use crate::ProfileError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{Read, Write},
    path::Path,
};

/// One channel node on the flow path of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverPoint {
    /// Source (channel head) id.
    pub id: u32,

    /// Node index in the flow network.
    pub node: u64,

    #[serde(default)]
    pub row: Option<usize>,

    #[serde(default)]
    pub col: Option<usize>,

    /// Projected easting.
    #[serde(default)]
    pub x: Option<f64>,

    /// Projected northing.
    #[serde(default)]
    pub y: Option<f64>,

    pub latitude: f64,

    pub longitude: f64,

    /// Flow distance to the basin outlet in meters.
    pub distance_from_outlet: f64,

    pub elevation: f64,

    /// Drainage area in m².
    pub drainage_area: f64,

    /// Strahler order.
    pub stream_order: u32,

    /// Channel gradient (m/m), undefined near the ends of a flow path.
    #[serde(default)]
    pub slope: Option<f64>,
}

/// All nodes of one source, ordered from the channel head toward the
/// outlet.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub id: u32,
    pub points: Vec<RiverPoint>,
}

impl Source {
    /// Flow length from the channel head to the outlet.
    pub fn length(&self) -> f64 {
        self.points
            .first()
            .map_or(0.0, |head| head.distance_from_outlet)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointTable {
    sources: Vec<Source>,
}

impl PointTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        debug!("reading {:?}", path.as_ref());
        Self::from_reader(File::open(path)?)
    }

    /// Reads CSV records and groups them by source id. Sources keep the
    /// order they first appear in; unknown columns are ignored.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, ProfileError> {
        let mut rdr = csv::Reader::from_reader(rdr);
        let mut index: HashMap<u32, usize> = HashMap::new();
        let mut sources: Vec<Source> = Vec::new();

        for record in rdr.deserialize() {
            let mut point: RiverPoint = record?;
            if point.slope.is_some_and(f64::is_nan) {
                point.slope = None;
            }
            let slot = *index.entry(point.id).or_insert_with(|| {
                sources.push(Source {
                    id: point.id,
                    points: Vec::new(),
                });
                sources.len() - 1
            });
            sources[slot].points.push(point);
        }

        if sources.is_empty() {
            return Err(ProfileError::EmptyTable);
        }

        for source in &mut sources {
            source
                .points
                .sort_by(|a, b| b.distance_from_outlet.total_cmp(&a.distance_from_outlet));
        }

        Ok(Self::from_sources(sources))
    }

    pub fn from_sources(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), ProfileError> {
        self.write(File::create(path)?)
    }

    pub fn write<W: Write>(&self, wtr: W) -> Result<(), ProfileError> {
        let mut wtr = csv::Writer::from_writer(wtr);
        for point in self.points() {
            wtr.serialize(point)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut [Source] {
        &mut self.sources
    }

    pub fn source(&self, id: u32) -> Option<&Source> {
        self.sources.iter().find(|source| source.id == id)
    }

    pub fn points(&self) -> impl Iterator<Item = &RiverPoint> + '_ {
        self.sources.iter().flat_map(|source| source.points.iter())
    }

    /// Total number of points.
    pub fn len(&self) -> usize {
        self.sources.iter().map(|source| source.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The longest flow path in the network.
    pub fn trunk(&self) -> Option<&Source> {
        self.sources
            .iter()
            .max_by(|a, b| a.length().total_cmp(&b.length()))
    }
}
