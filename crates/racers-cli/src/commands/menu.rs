//! Menu command implementation.

use std::path::Path;

use anyhow::Result;
use racers::MenuState;

/// Run the menu command
pub fn run(pid: u32, layout: &Path, target: MenuState) -> Result<()> {
    let Some(attached) = super::attach(pid, layout)? else {
        return Ok(());
    };
    let session = &attached.session;

    let current = session.current_menu()?;
    if session.goto_menu(target)? {
        println!("{} -> {}", current, target);
    } else {
        println!("No transition from {} to {}", current, target);
    }
    Ok(())
}
