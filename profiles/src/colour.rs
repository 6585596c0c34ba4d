//! Cluster display colours.

use std::f64::consts::PI;

/// `n` colours spread evenly over a rainbow colour map, violet first
/// and red last, as `#rrggbb`.
pub fn hex_palette(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let x = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            let (r, g, b) = rainbow(x);
            format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
        })
        .collect()
}

/// Parses `#rrggbb` (the leading `#` is optional).
pub fn parse_hex(colour: &str) -> Option<(u8, u8, u8)> {
    let hex = colour.strip_prefix('#').unwrap_or(colour);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let component = |range| u8::from_str_radix(&hex[range], 16).ok();
    Some((component(0..2)?, component(2..4)?, component(4..6)?))
}

fn rainbow(x: f64) -> (f64, f64, f64) {
    let r = (2.0 * x - 0.5).abs();
    let g = (PI * x).sin();
    let b = (PI * x / 2.0).cos();
    (r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(value: f64) -> u8 {
    (value * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::{hex_palette, parse_hex};

    #[test]
    fn test_palette_endpoints() {
        assert_eq!(hex_palette(0), Vec::<String>::new());
        assert_eq!(hex_palette(1), vec!["#8000ff"]);
        let palette = hex_palette(3);
        assert_eq!(palette.len(), 3);
        assert_eq!(palette[0], "#8000ff");
        assert_eq!(palette[2], "#ff0000");
        // Middle of the map: r = 0.5, g = 1, b = cos(π/4).
        assert_eq!(palette[1], "#80ffb4");
    }

    #[test]
    fn test_palette_colours_are_distinct() {
        let palette = hex_palette(12);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#8000ff"), Some((128, 0, 255)));
        assert_eq!(parse_hex("80FFB4"), Some((128, 255, 180)));
        assert_eq!(parse_hex("#80ff"), None);
        assert_eq!(parse_hex("#80ffzz"), None);
        assert_eq!(parse_hex("#8é0fff"), None);
    }
}
