//! Watch command implementation.

use std::path::Path;
use std::sync::mpsc::TryRecvError;
use std::time::Duration;

use anyhow::{Result, bail};
use racers::SessionEvent;
use tracing::{debug, info, warn};

/// Run the watch command
pub fn run(pid: u32, layout: &Path, interval: u64) -> Result<()> {
    let Some(attached) = super::attach(pid, layout)? else {
        return Ok(());
    };
    let session = &attached.session;
    info!("Game ready, current menu: {}", session.current_menu()?);

    let interval = Duration::from_secs(interval.max(1));
    loop {
        loop {
            match attached.events.try_recv() {
                Ok(SessionEvent::DriversReady) => info!(
                    "Race started with {} AI drivers",
                    session.ai_driver_count().unwrap_or_default()
                ),
                Ok(event) => debug!("{:?}", event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => bail!("Supervisor stopped unexpectedly"),
            }
        }

        if session.is_race_running().unwrap_or(false) {
            if let Some(drivers) = session.drivers() {
                match drivers.player.position() {
                    Ok(p) => info!("Player at ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z),
                    Err(e) => warn!("Failed to read player position: {}", e),
                }
            }
        }

        if attached.shutdown.wait(interval) {
            return Ok(());
        }
    }
}
