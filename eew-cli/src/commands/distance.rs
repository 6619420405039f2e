//! Great-circle distance between two points.

use anyhow::{bail, Context, Result};
use eew_types::Coordinate;

/// Run the distance command.
pub fn run(from: &str, to: &str) -> Result<String> {
    let a = parse_point(from)?;
    let b = parse_point(to)?;
    Ok(format!("{:.1} km", eew_core::distance_km(a, b)))
}

/// Parse `"lat,lon"` in decimal degrees.
fn parse_point(input: &str) -> Result<Coordinate> {
    let (lat, lon) = input
        .split_once(',')
        .with_context(|| format!("Expected \"lat,lon\", got {input:?}"))?;
    let lat: f64 = lat.trim().parse().with_context(|| format!("Bad latitude in {input:?}"))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("Bad longitude in {input:?}"))?;

    let point = Coordinate::new(lat, lon);
    if !point.is_valid() {
        bail!("Coordinate out of range: {input}");
    }
    Ok(point)
}
