use crate::{BilError, Raster};
use std::f64::consts::{FRAC_PI_2, PI};

/// Shaded relief of `dem` using Horn's (1981) 3x3 gradient.
///
/// `azimuth` and `altitude` are the sun position in degrees. Output
/// values are in `0..=255`. Missing neighbours are replaced by the
/// center cell, so edges shade as if locally flat across the gap.
pub fn hillshade(dem: &Raster, azimuth: f64, altitude: f64) -> Result<Raster, BilError> {
    let (rows, cols) = dem.dimensions();
    let (dx, dy) = dem
        .header()
        .map_info
        .map_or((1.0, 1.0), |info| info.pixel_size);

    let zenith = (90.0 - altitude).to_radians();
    let azimuth = ((360.0 - azimuth + 90.0) % 360.0).to_radians();
    let (zenith_sin, zenith_cos) = zenith.sin_cos();

    let mut shaded = vec![f32::NAN; rows * cols];
    for row in 0..rows {
        for col in 0..cols {
            let Some(center) = dem.get(row, col) else {
                continue;
            };
            let z = |dr: isize, dc: isize| -> f64 {
                let r = row.checked_add_signed(dr);
                let c = col.checked_add_signed(dc);
                match (r, c) {
                    (Some(r), Some(c)) => f64::from(dem.get(r, c).unwrap_or(center)),
                    _ => f64::from(center),
                }
            };
            let (a, b, c) = (z(-1, -1), z(-1, 0), z(-1, 1));
            let (d, f) = (z(0, -1), z(0, 1));
            let (g, h, i) = (z(1, -1), z(1, 0), z(1, 1));

            let dzdx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / (8.0 * dx);
            let dzdy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / (8.0 * dy);
            let slope = dzdx.hypot(dzdy).atan();
            let aspect = if dzdx != 0.0 {
                let aspect = dzdy.atan2(-dzdx);
                if aspect < 0.0 {
                    aspect + 2.0 * PI
                } else {
                    aspect
                }
            } else if dzdy > 0.0 {
                FRAC_PI_2
            } else if dzdy < 0.0 {
                2.0 * PI - FRAC_PI_2
            } else {
                0.0
            };

            let value = 255.0
                * (zenith_cos * slope.cos()
                    + zenith_sin * slope.sin() * (azimuth - aspect).cos());
            #[allow(clippy::cast_possible_truncation)]
            {
                shaded[row * cols + col] = value.clamp(0.0, 255.0) as f32;
            }
        }
    }

    let mut header = dem.header().clone();
    header.no_data = None;
    Raster::from_samples(header, shaded)
}

#[cfg(test)]
mod tests {
    use super::hillshade;
    use crate::{Header, Raster};
    use approx::assert_relative_eq;

    fn header(rows: usize, cols: usize) -> Header {
        format!(
            "samples = {cols}\nlines = {rows}\ndata type = 4\n\
             map info = {{UTM, 1, 1, 0, 0, 1, 1, 11, North}}\n\
             data ignore value = -9999\n"
        )
        .parse()
        .unwrap()
    }

    #[test]
    fn test_flat_surface() {
        let dem = Raster::from_samples(header(3, 3), vec![10.0; 9]).unwrap();
        let hs = hillshade(&dem, 315.0, 45.0).unwrap();
        let expected = 255.0 * 45_f64.to_radians().cos();
        for (_, _, v) in hs.iter() {
            assert_relative_eq!(f64::from(v), expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_slope_facing_the_sun_is_brighter() {
        // Elevation rises to the east, so the surface faces west.
        let west_facing: Vec<f32> = (0..5)
            .flat_map(|_| (0..5).map(|c| c as f32))
            .collect();
        let east_facing: Vec<f32> = (0..5)
            .flat_map(|_| (0..5).map(|c| 4.0 - c as f32))
            .collect();
        let west = Raster::from_samples(header(5, 5), west_facing).unwrap();
        let east = Raster::from_samples(header(5, 5), east_facing).unwrap();
        // Sun in the west.
        let lit = hillshade(&west, 270.0, 45.0).unwrap();
        let shadowed = hillshade(&east, 270.0, 45.0).unwrap();
        assert!(lit.get(2, 2).unwrap() > shadowed.get(2, 2).unwrap());
    }

    #[test]
    fn test_no_data_stays_missing() {
        let mut samples = vec![5.0; 9];
        samples[4] = -9999.0;
        let dem = Raster::from_samples(header(3, 3), samples).unwrap();
        let hs = hillshade(&dem, 315.0, 45.0).unwrap();
        assert_eq!(hs.get(1, 1), None);
        assert!(hs.get(0, 0).is_some());
    }
}
