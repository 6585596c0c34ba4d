use super::{rgb, SIZE};
use anyhow::Result;
use log::info;
use plotters::prelude::*;
use profiles::{
    stats::{by_cluster, median},
    ClusteredProfile,
};
use std::{collections::BTreeMap, path::Path};

/// Gradient distribution of each cluster as a box plot.
pub fn boxplot(path: &Path, clustered: &[ClusteredProfile]) -> Result<()> {
    let slopes = slopes_by_cluster(clustered);
    let Some(&last) = slopes.keys().next_back() else {
        return Ok(());
    };
    for (cluster_id, (_, values)) in &slopes {
        info!(
            "cluster {cluster_id}, median gradient = {:.4}",
            median(values).unwrap_or(f64::NAN)
        );
    }

    let boxes: Vec<(u32, String, Quartiles)> = slopes
        .iter()
        .map(|(&k, (colour, values))| (k, colour.clone(), Quartiles::new(values.as_slice())))
        .collect();
    let (lo, hi) = boxes
        .iter()
        .map(|(_, _, q)| q.values())
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v[0]), hi.max(v[4])));
    let margin = ((hi - lo) * 0.05).max(1e-3);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((1..last + 1).into_segmented(), (lo - margin)..(hi + margin))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(k) => format!("Cluster {k}"),
            _ => String::new(),
        })
        .y_desc("Gradient (m/m)")
        .draw()?;
    chart.draw_series(boxes.iter().map(|(k, colour, quartiles)| {
        Boxplot::new_vertical(SegmentValue::CenterOf(*k), quartiles)
            .style(&rgb(colour))
            .width(40)
    }))?;
    root.present()?;
    Ok(())
}

/// Colour and every sample gradient of each cluster.
fn slopes_by_cluster(clustered: &[ClusteredProfile]) -> BTreeMap<u32, (String, Vec<f64>)> {
    by_cluster(clustered)
        .into_iter()
        .filter_map(|(cluster_id, members)| {
            let values: Vec<f64> = members
                .iter()
                .flat_map(|p| p.nodes.iter().map(|n| n.slope))
                .filter(|s| s.is_finite())
                .collect();
            (!values.is_empty()).then(|| (cluster_id, (members[0].colour.clone(), values)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::slopes_by_cluster;
    use profiles::{ClusteredNode, ClusteredProfile};

    fn profile(id: u32, cluster_id: u32, slopes: &[f64]) -> ClusteredProfile {
        let colour = format!("#0000{cluster_id:02x}");
        ClusteredProfile {
            id,
            cluster_id,
            colour: colour.clone(),
            nodes: slopes
                .iter()
                .map(|&slope| ClusteredNode {
                    id,
                    node: 0,
                    reg_dist: 0.0,
                    slope,
                    elevation: 0.0,
                    drainage_area: 0.0,
                    distance_from_outlet: 0.0,
                    latitude: 0.0,
                    longitude: 0.0,
                    row: None,
                    col: None,
                    x: None,
                    y: None,
                    cluster_id,
                    colour: colour.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_slopes_by_cluster() {
        let clustered = vec![
            profile(1, 2, &[0.1, 0.2]),
            profile(2, 1, &[0.5]),
            profile(3, 2, &[f64::NAN, 0.3]),
            profile(4, 3, &[]),
        ];
        let slopes = slopes_by_cluster(&clustered);
        assert_eq!(slopes.len(), 2);
        assert_eq!(slopes[&1], ("#000001".to_string(), vec![0.5]));
        assert_eq!(slopes[&2], ("#000002".to_string(), vec![0.1, 0.2, 0.3]));
    }
}
