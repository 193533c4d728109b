//! Readiness tracking.
//!
//! The supervisor polls the game until the front end has left its loading
//! screens, then follows races: on every start of a race it waits for the
//! player's driver structure to fill in and publishes a fresh set of drivers.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::driver::RaceDrivers;
use crate::error::Result;
use crate::layout::GameLayout;
use crate::memory::AddressSpace;
use crate::menu::MenuNavigator;
use crate::process::RemoteProcess;

use super::shutdown::ShutdownSignal;

/// Notifications published by the supervisor thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The game finished loading; menu, toggles and race state are usable.
    CoreReady,
    /// A race started and its drivers are resolvable.
    DriversReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Readiness {
    Pending = 0,
    Core = 1,
    /// Core is ready and the current or last race's drivers are published.
    Drivers = 2,
}

impl Readiness {
    fn from_u8(value: u8) -> Self {
        match value {
            2 => Self::Drivers,
            1 => Self::Core,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Phase {
    #[default]
    Uninitialized,
    CoreReady,
    WaitingForRace,
    /// A race is running; waiting for the player's structure.
    DriversReady,
    /// Drivers published; waiting for the race to end.
    InRace,
}

/// State written by the supervisor and read by session callers.
pub(crate) struct SharedState<P: RemoteProcess> {
    readiness: AtomicU8,
    drivers: RwLock<Option<Arc<RaceDrivers<P>>>>,
}

impl<P: RemoteProcess> SharedState<P> {
    pub fn new() -> Self {
        Self {
            readiness: AtomicU8::new(Readiness::Pending as u8),
            drivers: RwLock::new(None),
        }
    }

    pub fn readiness(&self) -> Readiness {
        Readiness::from_u8(self.readiness.load(Ordering::Acquire))
    }

    fn set_readiness(&self, readiness: Readiness) {
        self.readiness.store(readiness as u8, Ordering::Release);
    }

    pub fn drivers(&self) -> Option<Arc<RaceDrivers<P>>> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_drivers(&self, drivers: Option<Arc<RaceDrivers<P>>>) {
        *self.drivers.write().unwrap_or_else(PoisonError::into_inner) = drivers;
    }
}

/// Whether a game flag reads 1.
pub(crate) fn read_flag<P: RemoteProcess>(space: &AddressSpace<P>, address: u32) -> Result<bool> {
    Ok(space.read_i32(address)? == 1)
}

pub(crate) struct Supervisor<P: RemoteProcess> {
    phase: Phase,
    space: AddressSpace<P>,
    navigator: Arc<MenuNavigator<P>>,
    layout: Arc<GameLayout>,
    shared: Arc<SharedState<P>>,
}

impl<P: RemoteProcess> Supervisor<P> {
    pub(crate) fn new(
        space: AddressSpace<P>,
        navigator: Arc<MenuNavigator<P>>,
        layout: Arc<GameLayout>,
        shared: Arc<SharedState<P>>,
    ) -> Self {
        Self {
            phase: Phase::default(),
            space,
            navigator,
            layout,
            shared,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn race_running(&self) -> Result<bool> {
        read_flag(&self.space, self.layout.race.race_running)
    }

    /// Poll once, returning the event to publish if the poll completed a
    /// transition. A failed read leaves the phase unchanged.
    pub fn tick(&mut self) -> Result<Option<SessionEvent>> {
        match self.phase {
            Phase::Uninitialized => {
                let menu = self.navigator.current_menu()?;
                if menu.is_loading() {
                    return Ok(None);
                }
                info!("Game core ready ({})", menu);
                self.shared.set_readiness(Readiness::Core);
                self.phase = Phase::CoreReady;
                Ok(Some(SessionEvent::CoreReady))
            }
            Phase::CoreReady => {
                self.phase = Phase::WaitingForRace;
                Ok(None)
            }
            Phase::WaitingForRace => {
                if !self.race_running()? {
                    return Ok(None);
                }
                debug!("Race started, waiting for drivers");
                self.shared.replace_drivers(None);
                self.shared.set_readiness(Readiness::Core);
                self.phase = Phase::DriversReady;
                Ok(None)
            }
            Phase::DriversReady => {
                let player = RaceDrivers::player(&self.space, &self.layout.drivers);
                if !player.is_valid() {
                    return Ok(None);
                }
                let drivers = RaceDrivers::new(player, &self.space, &self.layout.drivers);
                self.shared.replace_drivers(Some(Arc::new(drivers)));
                self.shared.set_readiness(Readiness::Drivers);
                info!("Drivers ready");
                self.phase = Phase::InRace;
                Ok(Some(SessionEvent::DriversReady))
            }
            Phase::InRace => {
                if self.race_running()? {
                    return Ok(None);
                }
                debug!("Race ended");
                self.phase = Phase::WaitingForRace;
                Ok(None)
            }
        }
    }

    /// Poll until `shutdown` is triggered, sending every event to the
    /// subscribers. Disconnected subscribers are dropped.
    pub(crate) fn run(
        mut self,
        subscribers: Arc<Mutex<Vec<Sender<SessionEvent>>>>,
        shutdown: Arc<ShutdownSignal>,
        poll_interval: Duration,
    ) {
        debug!("Supervisor started");
        while !shutdown.is_shutdown() {
            match self.tick() {
                Ok(Some(event)) => {
                    subscribers
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|tx| tx.send(event).is_ok());
                }
                Ok(None) => {}
                // Unreadable memory is routine while the game loads
                Err(e) if e.is_access_failure() => {
                    debug!("Poll failed in {:?}: {}", self.phase(), e)
                }
                Err(e) => warn!("Poll failed in {:?}: {}", self.phase(), e),
            }

            if shutdown.wait(poll_interval) {
                break;
            }
        }
        debug!("Supervisor stopped");
    }
}
