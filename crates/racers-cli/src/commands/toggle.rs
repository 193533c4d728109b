//! Toggle command implementation.

use std::path::Path;

use anyhow::{Result, bail};
use racers::Feature;

/// Run the toggle command
pub fn run(pid: u32, layout: &Path, feature: Feature, enabled: bool) -> Result<()> {
    let Some(attached) = super::attach(pid, layout)? else {
        return Ok(());
    };

    if !attached.session.set_feature(feature, enabled) {
        bail!("Failed to switch {} (see log for the failed writes)", feature);
    }
    println!(
        "{}: {}",
        feature,
        if attached.session.feature(feature)? { "on" } else { "off" }
    );
    Ok(())
}
