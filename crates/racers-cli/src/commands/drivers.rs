//! Drivers command implementation.

use std::path::Path;

use anyhow::{Result, bail};
use racers::session::MAX_AI_DRIVERS;

/// Run the drivers command
pub fn run(pid: u32, layout: &Path, count: i32) -> Result<()> {
    if !(0..=MAX_AI_DRIVERS).contains(&count) {
        bail!("AI driver count must be between 0 and {}", MAX_AI_DRIVERS);
    }

    let Some(attached) = super::attach(pid, layout)? else {
        return Ok(());
    };
    attached.session.set_ai_driver_count(count)?;
    println!("AI drivers for the next race: {}", count);
    Ok(())
}
