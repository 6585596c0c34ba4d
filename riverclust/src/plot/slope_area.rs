use super::{rgb, AREA_BINS, AREA_THRESHOLD};
use anyhow::Result;
use log::warn;
use plotters::prelude::*;
use profiles::{
    stats::{cluster_slope_area, SlopeArea},
    ClusteredProfile, PointTable,
};
use std::path::Path;

/// Gradient axis limits.
const SLOPE_RANGE: (f64, f64) = (0.001, 1.0);

const PANEL_SIZE: (u32, u32) = (1000, 450);

/// Log–log slope–area panel per cluster over the full flow paths of
/// its sources, with binned medians and the fitted power law.
pub fn slope_area(path: &Path, table: &PointTable, clustered: &[ClusteredProfile]) -> Result<()> {
    let by_cluster = cluster_slope_area(table, clustered, AREA_THRESHOLD, AREA_BINS);
    if by_cluster.is_empty() {
        return Ok(());
    }

    #[allow(clippy::cast_possible_truncation)]
    let height = PANEL_SIZE.1 * by_cluster.len() as u32;
    let root = BitMapBackend::new(path, (PANEL_SIZE.0, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((by_cluster.len(), 1));

    for (panel, cluster) in panels.iter().zip(&by_cluster) {
        let Some(sa) = &cluster.slope_area else {
            warn!(
                "cluster {} has no nodes above {AREA_THRESHOLD} m², skipping slope-area panel",
                cluster.cluster_id
            );
            continue;
        };
        let colour = rgb(&cluster.colour);
        let in_range = |slope: f64| (SLOPE_RANGE.0..=SLOPE_RANGE.1).contains(&slope);
        let area_max = sa
            .points
            .iter()
            .map(|&(area, _)| area)
            .fold(AREA_THRESHOLD, f64::max)
            * 1.5;

        let mut chart = ChartBuilder::on(panel)
            .caption(title(cluster.cluster_id, sa), ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(
                (AREA_THRESHOLD * 0.7..area_max).log_scale(),
                (SLOPE_RANGE.0..SLOPE_RANGE.1).log_scale(),
            )?;
        chart
            .configure_mesh()
            .x_desc("Drainage area (m²)")
            .y_desc("Gradient (m/m)")
            .draw()?;

        chart.draw_series(
            sa.points
                .iter()
                .filter(|&&(_, slope)| in_range(slope))
                .map(|&(area, slope)| Circle::new((area, slope), 1, colour.filled())),
        )?;
        chart.draw_series(
            sa.bins
                .iter()
                .filter(|bin| in_range(10_f64.powf(bin.log_slope)))
                .map(|bin| {
                    ErrorBar::new_vertical(
                        10_f64.powf(bin.log_area),
                        10_f64.powf(bin.log_lower).max(SLOPE_RANGE.0),
                        10_f64.powf(bin.log_slope),
                        10_f64.powf(bin.log_upper).min(SLOPE_RANGE.1),
                        BLACK.filled(),
                        8,
                    )
                }),
        )?;
        if let Some(fit) = sa.fit {
            chart.draw_series(LineSeries::new(
                power_law(fit.intercept, fit.gradient, sa)
                    .into_iter()
                    .filter(|&(_, slope)| in_range(slope)),
                &BLACK,
            ))?;
        }
    }
    root.present()?;
    Ok(())
}

/// Panel title with the steepness and concavity indices when the fit
/// succeeded.
fn title(cluster_id: u32, sa: &SlopeArea) -> String {
    match (sa.ks(), sa.ks_err(), sa.theta(), sa.theta_err()) {
        (Some(ks), Some(ks_err), Some(theta), Some(theta_err)) => format!(
            "Cluster {cluster_id}: ks = {ks:.2} ± {ks_err:.2}; θ = {theta:.2} ± {theta_err:.2}"
        ),
        _ => format!("Cluster {cluster_id}"),
    }
}

/// `log S = intercept + gradient · log A`, sampled across the binned
/// area range.
#[allow(clippy::cast_precision_loss)]
fn power_law(intercept: f64, gradient: f64, sa: &SlopeArea) -> Vec<(f64, f64)> {
    let (Some(first), Some(last)) = (sa.bins.first(), sa.bins.last()) else {
        return Vec::new();
    };
    let (lo, hi) = (first.log_area, last.log_area);
    (0..100)
        .map(|i| {
            let log_area = lo + (hi - lo) * i as f64 / 99.0;
            (10_f64.powf(log_area), 10_f64.powf(intercept + gradient * log_area))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{power_law, title};
    use approx::assert_relative_eq;
    use profiles::stats::slope_area;

    #[test]
    fn test_title_and_fit_line() {
        // S = 2 A^-0.5
        let pairs: Vec<(f64, f64)> = (0..200)
            .map(|i| {
                let area = 10_f64.powf(3.0 + f64::from(i) / 50.0);
                (area, 2.0 * area.powf(-0.5))
            })
            .collect();
        let sa = slope_area(pairs, 1000.0, 10).unwrap();
        let fit = sa.fit.unwrap();
        let title = title(3, &sa);
        assert!(title.starts_with("Cluster 3: ks = "));
        assert!(title.contains("θ = 0.50"));

        let line = power_law(fit.intercept, fit.gradient, &sa);
        assert_eq!(line.len(), 100);
        let (area, slope) = line[50];
        assert_relative_eq!(slope, 2.0 * area.powf(-0.5), max_relative = 0.05);
    }

    #[test]
    fn test_title_without_fit() {
        let sa = slope_area([(5000.0, 0.1)], 1000.0, 10).unwrap();
        assert_eq!(title(1, &sa), "Cluster 1");
    }
}
