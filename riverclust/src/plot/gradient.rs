//! Gradient against distance from the profile head.

use super::{padded, rgb, SIZE};
use crate::paths::Paths;
use anyhow::Result;
use plotters::prelude::*;
use profiles::{
    stats::{by_cluster, median_profiles},
    ClusteredProfile,
};
use std::path::Path;

const X_DESC: &str = "Distance from source (m)";
const Y_DESC: &str = "Gradient (m/m)";

/// One figure per cluster with every member profile.
pub fn per_cluster(paths: &Paths, clustered: &[ClusteredProfile]) -> Result<()> {
    for (cluster_id, members) in by_cluster(clustered) {
        let path = paths.cluster_profiles(cluster_id);
        let nodes = || members.iter().flat_map(|p| p.nodes.iter());
        let x_range = padded(nodes().map(|n| n.reg_dist));
        let y_range = padded(nodes().map(|n| n.slope));
        let colour = rgb(&members[0].colour);

        let root = BitMapBackend::new(&path, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Cluster {cluster_id}"), ("sans-serif", 24).into_font())
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;
        chart
            .configure_mesh()
            .x_desc(X_DESC)
            .y_desc(Y_DESC)
            .draw()?;
        for profile in &members {
            chart.draw_series(LineSeries::new(
                profile.nodes.iter().map(|n| (n.reg_dist, n.slope)),
                &colour,
            ))?;
        }
        root.present()?;
    }
    Ok(())
}

/// Median gradient of each cluster with its interquartile range
/// shaded.
pub fn median(path: &Path, clustered: &[ClusteredProfile]) -> Result<()> {
    let medians = median_profiles(clustered);
    let points = || medians.iter().flat_map(|m| m.points.iter());
    let x_range = padded(points().map(|&(dist, ..)| dist));
    let y_range = padded(points().flat_map(|&(_, _, q25, q75)| [q25, q75]));

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(X_DESC)
        .y_desc(Y_DESC)
        .draw()?;

    for profile in &medians {
        let colour = rgb(&profile.colour);
        chart.draw_series(std::iter::once(Polygon::new(
            iqr_outline(&profile.points),
            colour.mix(0.2).filled(),
        )))?;
        chart
            .draw_series(LineSeries::new(
                profile.points.iter().map(|&(dist, median, ..)| (dist, median)),
                &colour,
            ))?
            .label(format!("Cluster {}", profile.cluster_id))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &colour));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Closed outline running along the lower quartile and back along the
/// upper one.
fn iqr_outline(points: &[(f64, f64, f64, f64)]) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|&(dist, _, q25, _)| (dist, q25))
        .chain(points.iter().rev().map(|&(dist, _, _, q75)| (dist, q75)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::iqr_outline;

    #[test]
    fn test_iqr_outline() {
        let points = [(0.0, 0.2, 0.1, 0.3), (2.0, 0.4, 0.3, 0.6)];
        assert_eq!(
            iqr_outline(&points),
            vec![(0.0, 0.1), (2.0, 0.3), (2.0, 0.6), (0.0, 0.3)]
        );
    }
}
