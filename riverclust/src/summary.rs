use crate::options::Options;
use anyhow::{Context, Result};
use profiles::{
    profile::read_clustered_csv,
    stats::{cluster_summaries, median_profiles, ClusterSummary, MedianProfile},
};
use serde::Serialize;
use std::io::Write;
use textplots::{Chart, Plot, Shape};

#[derive(Serialize)]
struct JsonMedian {
    cluster_id: u32,
    reg_dist: Vec<f64>,
    median: Vec<f64>,
    q25: Vec<f64>,
    q75: Vec<f64>,
}

impl From<&MedianProfile> for JsonMedian {
    fn from(profile: &MedianProfile) -> Self {
        let mut json = Self {
            cluster_id: profile.cluster_id,
            reg_dist: Vec::with_capacity(profile.points.len()),
            median: Vec::with_capacity(profile.points.len()),
            q25: Vec::with_capacity(profile.points.len()),
            q75: Vec::with_capacity(profile.points.len()),
        };
        for &(dist, median, q25, q75) in &profile.points {
            json.reg_dist.push(dist);
            json.median.push(median);
            json.q25.push(q25);
            json.q75.push(q75);
        }
        json
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    clusters: &'a [ClusterSummary],
    median_profiles: Vec<JsonMedian>,
}

impl Options {
    /// Prints per-cluster statistics of the clustered profiles.
    pub fn summary(&self, json: bool) -> Result<()> {
        let path = self.paths().clustered();
        let clustered = read_clustered_csv(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let summaries = cluster_summaries(&clustered);
        let medians = median_profiles(&clustered);

        if json {
            let summary = JsonSummary {
                clusters: &summaries,
                median_profiles: medians.iter().map(JsonMedian::from).collect(),
            };
            println!("{}", serde_json::to_string(&summary)?);
            return Ok(());
        }

        write_table(std::io::stdout().lock(), &summaries)?;
        for profile in &medians {
            plot_median_ascii(profile);
        }
        Ok(())
    }
}

fn write_table<W: Write>(mut wtr: W, summaries: &[ClusterSummary]) -> std::io::Result<()> {
    writeln!(
        wtr,
        "{:>7} {:>7} {:>8} {:>7} {:>12} {:>14}",
        "cluster", "colour", "profiles", "nodes", "median slope", "mean length m"
    )?;
    for s in summaries {
        writeln!(
            wtr,
            "{:>7} {:>7} {:>8} {:>7} {:>12.4} {:>14.1}",
            s.cluster_id, s.colour, s.n_profiles, s.n_nodes, s.median_slope, s.mean_length_m
        )?;
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn plot_median_ascii(profile: &MedianProfile) {
    let plot_data: Vec<(f32, f32)> = profile
        .points
        .iter()
        .map(|&(dist, median, _, _)| (dist as f32, median as f32))
        .collect();
    let Some(&(x_max, _)) = plot_data.last() else {
        return;
    };
    if x_max <= 0.0 {
        return;
    }
    println!("\ncluster {} median gradient", profile.cluster_id);
    Chart::new(160, 60, 0.0, x_max)
        .lineplot(&Shape::Lines(&plot_data))
        .display();
}
