use super::SIZE;
use anyhow::Result;
use plotters::prelude::*;
use profiles::{Clusters, Linkage};
use std::path::Path;

const GREY: RGBColor = RGBColor(128, 128, 128);

/// One ⊓-shaped link joining two subtrees.
#[derive(Debug, Clone, PartialEq)]
struct Link {
    points: [(f64, f64); 4],

    /// Shared cluster of all leaves below the link.
    cluster_id: Option<u32>,
}

/// Link geometry in dendrogram coordinates: leaf `i` of the display
/// order sits at `x = 5 + 10·i`, links at their merge distance.
#[allow(clippy::cast_precision_loss)]
fn layout(linkage: &Linkage, labels: &[u32]) -> Vec<Link> {
    let n = linkage.len();
    let total = n + linkage.merges().len();
    let mut x = vec![0.0; total];
    let mut y = vec![0.0; total];
    let mut cluster: Vec<Option<u32>> = vec![None; total];
    for (pos, &leaf) in linkage.leaves_order().iter().enumerate() {
        x[leaf] = 5.0 + 10.0 * pos as f64;
        cluster[leaf] = labels.get(leaf).copied();
    }

    let mut links = Vec::with_capacity(linkage.merges().len());
    for (step, merge) in linkage.merges().iter().enumerate() {
        let (l, r, id) = (merge.left, merge.right, n + step);
        x[id] = (x[l] + x[r]) / 2.0;
        y[id] = merge.distance;
        cluster[id] = if cluster[l] == cluster[r] {
            cluster[l]
        } else {
            None
        };
        links.push(Link {
            points: [
                (x[l], y[l]),
                (x[l], merge.distance),
                (x[r], merge.distance),
                (x[r], y[r]),
            ],
            cluster_id: cluster[id],
        });
    }
    links
}

/// Draws the dendrogram with each cluster's links in its colour and
/// the cut as a horizontal line.
#[allow(clippy::cast_precision_loss)]
pub fn dendrogram(
    path: &Path,
    linkage: &Linkage,
    clusters: &Clusters,
    palette: &[String],
) -> Result<()> {
    let links = layout(linkage, &clusters.labels);
    let x_max = 10.0 * linkage.len() as f64;
    let top = links
        .iter()
        .flat_map(|link| link.points.iter().map(|&(_, y)| y))
        .fold(clusters.threshold, f64::max);
    let y_max = if top > 0.0 { top * 1.05 } else { 1.0 };

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(20)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .y_desc("Distance")
        .draw()?;

    for link in &links {
        let colour = link
            .cluster_id
            .and_then(|k| (k as usize).checked_sub(1))
            .and_then(|idx| palette.get(idx))
            .map_or(GREY, |colour| super::rgb(colour));
        chart.draw_series(std::iter::once(PathElement::new(
            link.points.to_vec(),
            colour.stroke_width(2),
        )))?;
    }
    chart.draw_series(LineSeries::new(
        [(0.0, clusters.threshold), (x_max, clusters.threshold)],
        &BLACK,
    ))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::layout;
    use profiles::{fcluster, linkage, DistanceMatrix, Method, Threshold};

    #[test]
    fn test_layout() {
        // Observations at 0, 1, 3 and 7 on a line.
        let dm = DistanceMatrix::from_condensed(4, vec![1.0, 3.0, 7.0, 2.0, 6.0, 4.0]).unwrap();
        let z = linkage(&dm, Method::Single).unwrap();
        let clusters = fcluster(&z, Threshold::Distance(1.5)).unwrap();
        let links = layout(&z, &clusters.labels);
        assert_eq!(links.len(), 3);
        assert_eq!(
            links[0].points,
            [(25.0, 0.0), (25.0, 1.0), (35.0, 1.0), (35.0, 0.0)]
        );
        assert_eq!(
            links[1].points,
            [(15.0, 0.0), (15.0, 2.0), (30.0, 2.0), (30.0, 1.0)]
        );
        assert_eq!(
            links[2].points,
            [(5.0, 0.0), (5.0, 4.0), (22.5, 4.0), (22.5, 2.0)]
        );
        let clusters: Vec<Option<u32>> = links.iter().map(|l| l.cluster_id).collect();
        assert_eq!(clusters, vec![Some(3), None, None]);
    }
}
