//! Validate a node configuration file.

use anyhow::{Context, Result};
use eew_node::Config;
use std::fmt::Write;
use std::path::Path;

/// Run the check-config command. Returns a summary of the effective settings.
pub fn run(path: &Path) -> Result<String> {
    let config = Config::from_file(path)
        .with_context(|| format!("Invalid configuration {}", path.display()))?;

    let providers: Vec<_> = config
        .enabled_providers()
        .iter()
        .map(|p| p.as_str())
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "Configuration OK: {}", path.display());
    let _ = writeln!(out, "  Node:      {}", config.node.label);
    let _ = writeln!(out, "  Providers: {}", providers.join(", "));
    let _ = writeln!(out, "  Min mag:   {:.1}", config.region.min_magnitude);
    if let (Some(nw), Some(se)) = (config.region.north_west, config.region.south_east) {
        let _ = writeln!(
            out,
            "  Region:    ({:.2}, {:.2}) to ({:.2}, {:.2})",
            nw.lat, nw.lon, se.lat, se.lon
        );
    }
    if let (Some(device), Some(radius)) = (config.region.device, config.region.radius_km) {
        let _ = writeln!(
            out,
            "  Radius:    {radius:.0} km around ({:.2}, {:.2})",
            device.lat, device.lon
        );
    }
    let _ = write!(
        out,
        "  Polling:   {}s fast / {}s slow, quiet after {}s",
        config.polling.fast_interval_secs,
        config.polling.slow_interval_secs,
        config.polling.quiet_period_secs
    );
    Ok(out)
}
