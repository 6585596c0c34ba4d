use crate::{stats::ols, PointTable, ProfileError};
use log::info;

/// Fills in `slope` for every point of `table`.
///
/// Slope at a node is the absolute gradient of a least squares line
/// through elevation against flow distance for the `window` nodes
/// centred on it. Nodes closer than `window / 2` to either end of
/// their flow path have no full window and get no slope.
pub fn calculate_slope(table: &mut PointTable, window: usize) -> Result<(), ProfileError> {
    if window < 3 || window % 2 == 0 {
        return Err(ProfileError::SlopeWindow(window));
    }
    let half = (window - 1) / 2;
    let now = std::time::Instant::now();

    for source in table.sources_mut() {
        let n = source.points.len();
        let distances: Vec<f64> = source
            .points
            .iter()
            .map(|p| p.distance_from_outlet)
            .collect();
        let elevations: Vec<f64> = source.points.iter().map(|p| p.elevation).collect();

        for (idx, point) in source.points.iter_mut().enumerate() {
            point.slope = if idx >= half && idx + half < n {
                let span = idx - half..=idx + half;
                ols(&distances[span.clone()], &elevations[span]).map(|fit| fit.gradient.abs())
            } else {
                None
            };
        }
    }

    info!(
        "got the slope over a window of {window} nodes in {:?}",
        now.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::calculate_slope;
    use crate::{points::tests::TRIBS, PointTable, ProfileError};
    use approx::assert_relative_eq;

    fn straight_channel(n: usize) -> PointTable {
        let mut csv = String::from(
            "id,node,latitude,longitude,distance_from_outlet,elevation,drainage_area,stream_order\n",
        );
        for i in 0..n {
            let dist = (n - i) as f64 * 10.0;
            // 0.05 m/m with a small wiggle that cancels over 3 nodes.
            let wiggle = [0.0, 0.2, -0.2][i % 3];
            let elev = dist * 0.05 + wiggle;
            csv.push_str(&format!("1,{i},0,0,{dist},{elev},100,1\n"));
        }
        PointTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_window_edges_have_no_slope() {
        let mut table = straight_channel(10);
        calculate_slope(&mut table, 5).unwrap();
        let slopes: Vec<Option<f64>> = table.sources()[0].points.iter().map(|p| p.slope).collect();
        assert_eq!(slopes[..2], [None, None]);
        assert_eq!(slopes[8..], [None, None]);
        for slope in &slopes[2..8] {
            assert!(slope.is_some());
        }
    }

    #[test]
    fn test_slope_is_absolute_gradient() {
        let mut table = straight_channel(12);
        calculate_slope(&mut table, 3).unwrap();
        for point in &table.sources()[0].points[1..11] {
            // Every 3-node window holds one full wiggle cycle, so the
            // fitted line keeps the 0.05 trend up to the wiggle's tilt.
            assert_relative_eq!(point.slope.unwrap(), 0.05, epsilon = 0.021);
        }

        let mut table = straight_channel(12);
        calculate_slope(&mut table, 11).unwrap();
        assert_relative_eq!(
            table.sources()[0].points[5].slope.unwrap(),
            0.05,
            epsilon = 1e-2
        );
    }

    #[test]
    fn test_short_sources_have_no_slope() {
        let mut table = PointTable::from_reader(TRIBS.as_bytes()).unwrap();
        calculate_slope(&mut table, 25).unwrap();
        assert!(table.points().all(|p| p.slope.is_none()));
    }

    #[test]
    fn test_rejects_even_or_tiny_window() {
        let mut table = straight_channel(5);
        assert!(matches!(
            calculate_slope(&mut table, 4),
            Err(ProfileError::SlopeWindow(4))
        ));
        assert!(matches!(
            calculate_slope(&mut table, 1),
            Err(ProfileError::SlopeWindow(1))
        ));
    }
}
