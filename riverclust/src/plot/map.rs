//! Channel nodes drawn over rasters, in raster (row, column) space.

use super::rgb;
use crate::paths::Paths;
use anyhow::{Context, Result};
use bil::{hillshade, Raster};
use geo::geometry::Coord;
use log::{info, warn};
use plotters::{coord::Shift, prelude::*};
use profiles::{
    colour::{hex_palette, parse_hex},
    stats::lithology_composition,
    ClusteredNode, ClusteredProfile,
};
use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

/// Longest side of a map in pixels.
const MAX_SIDE: u32 = 1600;

/// Sun position for computed hillshades, degrees.
const AZIMUTH: f64 = 315.0;
const ALTITUDE: f64 = 45.0;

/// Shaded relief for the cluster map: `<fname>_hs.bil`, or computed
/// from `<fname>.bil`. `None` when neither exists.
pub fn background(paths: &Paths) -> Result<Option<Raster>> {
    let hs = paths.hillshade();
    if hs.exists() {
        let raster = Raster::memmap(&hs).with_context(|| format!("reading {}", hs.display()))?;
        return Ok(Some(raster));
    }
    let dem = paths.dem();
    if dem.exists() {
        info!("computing hillshade from {}", dem.display());
        let dem = Raster::memmap(&dem).with_context(|| format!("reading {}", dem.display()))?;
        return Ok(Some(hillshade(&dem, AZIMUTH, ALTITUDE)?));
    }
    Ok(None)
}

/// Cluster coloured nodes over shaded relief.
pub fn hillshade_map(
    path: &Path,
    hillshade: &Raster,
    clustered: &[ClusteredProfile],
) -> Result<()> {
    let frame = Frame::new(hillshade.dimensions());
    let root = BitMapBackend::new(path, frame.size()).into_drawing_area();
    root.fill(&WHITE)?;
    draw_raster(&root, hillshade, &frame, |value| match value {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(v) => {
            let grey = v.clamp(0.0, 255.0) as u8;
            RGBColor(grey, grey, grey)
        }
        None => WHITE,
    })?;
    draw_nodes(&root, hillshade, &frame, clustered)?;
    root.present()?;
    Ok(())
}

/// Cluster coloured nodes over a categorical lithology raster, plus a
/// table of each cluster's share of every lithology.
pub fn lithology_map(
    paths: &Paths,
    lithology: &Path,
    clustered: &[ClusteredProfile],
) -> Result<()> {
    let raster =
        Raster::load(lithology).with_context(|| format!("reading {}", lithology.display()))?;
    if raster.header().map_info.is_none() {
        warn!(
            "{} has no map info, placing nodes by their DEM row and column",
            lithology.display()
        );
    }

    let samples = clustered.iter().flat_map(|profile| {
        profile.nodes.iter().filter_map(|node| {
            let (row, col) = locate(&raster, node)?;
            raster.get(row, col).map(|v| (node.cluster_id, code(v)))
        })
    });
    let shares = lithology_composition(samples);
    let table = paths.lithology_table();
    let mut wtr = csv::Writer::from_path(&table)
        .with_context(|| format!("writing {}", table.display()))?;
    for share in &shares {
        wtr.serialize(share)?;
    }
    wtr.flush()?;

    let codes: BTreeSet<i64> = raster.iter().map(|(_, _, v)| code(v)).collect();
    let colours: HashMap<i64, RGBColor> = codes
        .iter()
        .zip(hex_palette(codes.len()))
        .map(|(&code, hex)| (code, pastel(&hex)))
        .collect();

    let path = paths.lithology_map();
    let frame = Frame::new(raster.dimensions());
    let root = BitMapBackend::new(&path, frame.size()).into_drawing_area();
    root.fill(&WHITE)?;
    draw_raster(&root, &raster, &frame, |value| {
        value
            .and_then(|v| colours.get(&code(v)).copied())
            .unwrap_or(WHITE)
    })?;
    draw_nodes(&root, &raster, &frame, clustered)?;
    root.present()?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn code(value: f32) -> i64 {
    value.round() as i64
}

/// Palette colour halfway to white, so nodes stand out.
fn pastel(hex: &str) -> RGBColor {
    let (r, g, b) = parse_hex(hex).unwrap_or((0, 0, 0));
    let half = |c: u8| ((u16::from(c) + 255) / 2) as u8;
    RGBColor(half(r), half(g), half(b))
}

/// Raster cell of a node.
///
/// A georeferenced raster is sampled at the node's map coordinate, so
/// rasters on another grid than the DEM line up. Without map info or a
/// coordinate the node's DEM row and column are used as is.
fn locate(raster: &Raster, node: &ClusteredNode) -> Option<(usize, usize)> {
    if let (Some(x), Some(y), Some(_)) = (node.x, node.y, raster.header().map_info) {
        return raster.coord_to_rowcol(Coord { x, y });
    }
    let (row, col) = (node.row?, node.col?);
    let (rows, cols) = raster.dimensions();
    (row < rows && col < cols).then_some((row, col))
}

/// Scaling between raster cells and map pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    rows: usize,
    cols: usize,
    scale: f64,
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
impl Frame {
    fn new((rows, cols): (usize, usize)) -> Self {
        let scale = f64::from(MAX_SIDE) / rows.max(cols).max(1) as f64;
        Self { rows, cols, scale }
    }

    /// Bitmap (width, height).
    fn size(&self) -> (u32, u32) {
        (
            ((self.cols as f64 * self.scale).ceil() as u32).max(1),
            ((self.rows as f64 * self.scale).ceil() as u32).max(1),
        )
    }

    /// Cell under pixel (`px`, `py`), as (row, col).
    fn cell(&self, px: u32, py: u32) -> (usize, usize) {
        let row = (f64::from(py) / self.scale) as usize;
        let col = (f64::from(px) / self.scale) as usize;
        (
            row.min(self.rows.saturating_sub(1)),
            col.min(self.cols.saturating_sub(1)),
        )
    }

    /// Pixel at the centre of (`row`, `col`).
    fn pixel(&self, row: usize, col: usize) -> (i32, i32) {
        (
            ((col as f64 + 0.5) * self.scale) as i32,
            ((row as f64 + 0.5) * self.scale) as i32,
        )
    }
}

#[allow(clippy::cast_possible_wrap)]
fn draw_raster<DB, F>(
    root: &DrawingArea<DB, Shift>,
    raster: &Raster,
    frame: &Frame,
    colour: F,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    F: Fn(Option<f32>) -> RGBColor,
{
    let (width, height) = frame.size();
    for py in 0..height {
        for px in 0..width {
            let (row, col) = frame.cell(px, py);
            root.draw_pixel((px as i32, py as i32), &colour(raster.get(row, col)))?;
        }
    }
    Ok(())
}

fn draw_nodes<DB>(
    root: &DrawingArea<DB, Shift>,
    raster: &Raster,
    frame: &Frame,
    clustered: &[ClusteredProfile],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut skipped = 0_usize;
    for profile in clustered {
        let colour = rgb(&profile.colour);
        for node in &profile.nodes {
            match locate(raster, node) {
                Some((row, col)) => {
                    root.draw(&Circle::new(frame.pixel(row, col), 2, colour.filled()))?;
                }
                None => skipped += 1,
            }
        }
    }
    if skipped > 0 {
        warn!("{skipped} channel nodes could not be placed on the map");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{background, code, locate, pastel, Frame};
    use crate::paths::Paths;
    use bil::{ByteOrder, DataType, Header, MapInfo, Raster};
    use geo::geometry::Coord;
    use plotters::style::RGBColor;
    use profiles::ClusteredNode;
    use std::fs;
    use tempfile::tempdir;

    fn raster() -> Raster {
        georeferenced(Some(MapInfo {
            upper_left: Coord {
                x: 1000.0,
                y: 2000.0,
            },
            pixel_size: (10.0, 10.0),
        }))
    }

    fn georeferenced(map_info: Option<MapInfo>) -> Raster {
        let header = Header {
            samples: 4,
            lines: 2,
            data_type: DataType::F32,
            byte_order: ByteOrder::Little,
            header_offset: 0,
            map_info,
            no_data: Some(-9999.0),
        };
        Raster::from_samples(header, vec![1.0; 8]).unwrap()
    }

    fn node(
        row: Option<usize>,
        col: Option<usize>,
        x: Option<f64>,
        y: Option<f64>,
    ) -> ClusteredNode {
        ClusteredNode {
            id: 1,
            node: 1,
            reg_dist: 0.0,
            slope: 0.1,
            elevation: 0.0,
            drainage_area: 0.0,
            distance_from_outlet: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            row,
            col,
            x,
            y,
            cluster_id: 1,
            colour: "#8000ff".to_string(),
        }
    }

    #[test]
    fn test_locate() {
        let raster = raster();
        assert_eq!(locate(&raster, &node(Some(1), Some(3), None, None)), Some((1, 3)));
        assert_eq!(locate(&raster, &node(Some(2), Some(0), None, None)), None);
        assert_eq!(
            locate(&raster, &node(None, None, Some(1025.0), Some(1995.0))),
            Some((0, 2))
        );
        assert_eq!(locate(&raster, &node(None, None, None, Some(1995.0))), None);
    }

    #[test]
    fn test_locate_prefers_map_coordinate() {
        // DEM cell (0, 0), but the coordinate falls in (1, 3) of this grid.
        let inside = node(Some(0), Some(0), Some(1035.0), Some(1985.0));
        assert_eq!(locate(&raster(), &inside), Some((1, 3)));
        // Outside this raster, even though the DEM cell is inside.
        let outside = node(Some(0), Some(0), Some(900.0), Some(1985.0));
        assert_eq!(locate(&raster(), &outside), None);
        // No map info: DEM row and column.
        assert_eq!(locate(&georeferenced(None), &inside), Some((0, 0)));
    }

    #[test]
    fn test_background_prefers_hillshade_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::new(
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
            "basin".to_string(),
            1,
            25,
        );
        assert!(background(&paths).unwrap().is_none());

        fs::write(
            dir.path().join("basin_hs.hdr"),
            "ENVI\nsamples = 2\nlines = 1\nbands = 1\ndata type = 4\nbyte order = 0\n",
        )
        .unwrap();
        let raw: Vec<u8> = [180.0_f32, 90.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(paths.hillshade(), raw).unwrap();
        let shade = background(&paths).unwrap().unwrap();
        assert_eq!(shade.dimensions(), (1, 2));
        assert_eq!(shade.get(0, 1), Some(90.0));
    }

    #[test]
    fn test_frame() {
        let frame = Frame::new((2, 4));
        assert_eq!(frame.size(), (1600, 800));
        assert_eq!(frame.cell(0, 0), (0, 0));
        assert_eq!(frame.cell(1599, 799), (1, 3));
        assert_eq!(frame.cell(400, 399), (0, 1));
        assert_eq!(frame.pixel(1, 3), (1400, 600));
    }

    #[test]
    fn test_lithology_colours() {
        assert_eq!(code(2.6), 3);
        assert_eq!(code(-1.2), -1);
        assert_eq!(pastel("#8000ff"), RGBColor(191, 127, 255));
    }
}
