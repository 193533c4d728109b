//! CLI command implementations.
//!
//! Every command attaches to the game, waits for it to finish loading and
//! then acts through the session.

pub mod drivers;
pub mod menu;
pub mod race;
pub mod toggle;
pub mod watch;

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use racers::{ProcessHandle, Session, SessionConfig, SessionEvent, ShutdownSignal, load_layout};
use tracing::info;

/// How often the wait loops look at the shutdown flag.
const WAIT_STEP: Duration = Duration::from_millis(200);

pub struct Attached {
    pub session: Session<ProcessHandle>,
    pub events: Receiver<SessionEvent>,
    pub shutdown: Arc<ShutdownSignal>,
}

/// Attach to `pid` and block until the game core is ready or Ctrl+C.
///
/// Returns `None` when interrupted.
pub fn attach(pid: u32, layout_path: &Path) -> Result<Option<Attached>> {
    let layout = load_layout(layout_path)
        .with_context(|| format!("Failed to load layout {}", layout_path.display()))?;
    let process =
        Arc::new(ProcessHandle::open(pid).with_context(|| format!("Failed to attach to {}", pid))?);

    let mut session = Session::new(process, layout, SessionConfig::default())?;
    let events = session.subscribe();
    session.start()?;

    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    info!("Waiting for the game to finish loading... (Ctrl+C to quit)");
    while !shutdown.is_shutdown() {
        match events.recv_timeout(WAIT_STEP) {
            Ok(SessionEvent::CoreReady) => {
                return Ok(Some(Attached {
                    session,
                    events,
                    shutdown,
                }));
            }
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => bail!("Supervisor stopped unexpectedly"),
        }
    }
    Ok(None)
}
