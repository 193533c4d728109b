//! Race command implementation.

use std::path::Path;

use anyhow::Result;

/// Run the race command
pub fn run(pid: u32, layout: &Path, circuit: i32, race: i32) -> Result<()> {
    let Some(attached) = super::attach(pid, layout)? else {
        return Ok(());
    };
    let session = &attached.session;

    let from = session.current_menu()?;
    if session.setup_race(circuit, race)? {
        println!("Selected circuit {} race {}", circuit, race);
    } else {
        println!("Race setup from {} did not reach racer selection", from);
    }
    Ok(())
}
