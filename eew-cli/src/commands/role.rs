//! Relay role for a battery level.

use anyhow::{Context, Result};
use eew_core::RelayRole;

/// Run the role command.
pub fn run(level: f64) -> Result<String> {
    let role = RelayRole::from_battery(level).context("Battery level is not a number")?;
    let forwards = if role.forwards_third_party() {
        "all alerts"
    } else {
        "SOS only"
    };
    Ok(format!("{role} (forwards {forwards})"))
}
