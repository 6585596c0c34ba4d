use super::{padded, SIZE};
use anyhow::Result;
use plotters::prelude::*;
use profiles::PointTable;
use std::path::Path;

/// Long profile of the longest channel in the network.
pub fn trunk(path: &Path, table: &PointTable) -> Result<()> {
    let Some(trunk) = table.trunk() else {
        return Ok(());
    };
    let x_range = padded(trunk.points.iter().map(|p| p.distance_from_outlet));
    let y_range = padded(trunk.points.iter().map(|p| p.elevation));

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Trunk channel, source {}", trunk.id), ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc("Distance from outlet (m)")
        .y_desc("Elevation (m)")
        .draw()?;
    chart.draw_series(LineSeries::new(
        trunk
            .points
            .iter()
            .map(|p| (p.distance_from_outlet, p.elevation)),
        &BLACK,
    ))?;
    root.present()?;
    Ok(())
}
