//! Figures, rendered to PNG with plotters.

mod boxplot;
mod dendrogram;
mod gradient;
mod map;
mod slope_area;
mod trunk;

pub use dendrogram::dendrogram;

use crate::{options::Options, paths::Paths};
use anyhow::{Context, Result};
use itertools::{Itertools, MinMaxResult};
use log::{info, warn};
use plotters::style::{RGBColor, BLACK};
use profiles::{colour::parse_hex, profile::read_clustered_csv, PointTable};
use std::ops::Range;

/// Figure size in pixels.
const SIZE: (u32, u32) = (1200, 800);

/// Drainage area below which nodes are left out of slope–area plots,
/// in m².
const AREA_THRESHOLD: f64 = 1000.0;

const AREA_BINS: usize = 20;

impl Options {
    /// Renders every figure from the clustered profiles table.
    pub fn plot(&self) -> Result<()> {
        let paths = self.paths();
        let table = self.load_points(&paths)?;
        self.plot_points(&paths, &table)
    }

    /// Renders every figure, taking slopes and the trunk channel from
    /// an already loaded `table`.
    pub fn plot_points(&self, paths: &Paths, table: &PointTable) -> Result<()> {
        let clustered_path = paths.clustered();
        let clustered = read_clustered_csv(&clustered_path)
            .with_context(|| format!("reading {}", clustered_path.display()))?;

        gradient::per_cluster(paths, &clustered)?;
        gradient::median(&paths.median_profiles(), &clustered)?;
        boxplot::boxplot(&paths.boxplot(), &clustered)?;
        slope_area::slope_area(&paths.slope_area(), table, &clustered)?;
        trunk::trunk(&paths.trunk(), table)?;

        match map::background(paths)? {
            Some(hillshade) => {
                map::hillshade_map(&paths.hillshade_map(), &hillshade, &clustered)?;
            }
            None => warn!(
                "neither {} nor {} found, skipping hillshade map",
                paths.hillshade().display(),
                paths.dem().display()
            ),
        }
        if let Some(lithology) = &self.lithology {
            map::lithology_map(paths, lithology, &clustered)?;
        }

        info!("figures written to {}", paths.out_dir().display());
        Ok(())
    }
}

/// Cluster colour for drawing, black if `colour` is not `#rrggbb`.
fn rgb(colour: &str) -> RGBColor {
    parse_hex(colour).map_or(BLACK, |(r, g, b)| RGBColor(r, g, b))
}

/// Axis range spanning `values` with a 5% margin on each side.
fn padded<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    match values.into_iter().filter(|v| v.is_finite()).minmax() {
        MinMaxResult::NoElements => 0.0..1.0,
        MinMaxResult::OneElement(v) => (v - 1.0)..(v + 1.0),
        MinMaxResult::MinMax(lo, hi) if lo == hi => (lo - 1.0)..(hi + 1.0),
        MinMaxResult::MinMax(lo, hi) => {
            let margin = (hi - lo) * 0.05;
            (lo - margin)..(hi + margin)
        }
    }
}
