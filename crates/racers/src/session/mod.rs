//! Attachment to one running game.
//!
//! A [`Session`] owns the components that act on the game and a supervisor
//! thread that reports when they become usable. Until the game has left its
//! loading screens every operation other than [`Session::current_menu`] and
//! [`Session::readiness`] does nothing.
//!
//! # Example
//!
//! ```ignore
//! use racers::prelude::*;
//!
//! let process = Arc::new(ProcessHandle::open(pid)?);
//! let layout = load_layout("layouts/retail.json")?;
//! let mut session = Session::new(process, layout, SessionConfig::default())?;
//!
//! let events = session.subscribe();
//! session.start()?;
//! while let Ok(event) = events.recv() {
//!     if event == SessionEvent::CoreReady {
//!         session.set_feature(Feature::AiPowerUps, false);
//!     }
//! }
//! ```

mod config;
mod race;
mod shutdown;
mod supervisor;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use race::{Circuit, MAX_AI_DRIVERS};
pub use shutdown::ShutdownSignal;
pub use supervisor::{Readiness, SessionEvent};

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::driver::RaceDrivers;
use crate::error::Result;
use crate::inject::{CodeInjector, ScratchRegion};
use crate::layout::GameLayout;
use crate::memory::AddressSpace;
use crate::menu::{MenuNavigator, MenuState};
use crate::patch::{BehaviorPatcher, Feature};
use crate::process::RemoteProcess;

use supervisor::{SharedState, Supervisor};

pub struct Session<P: RemoteProcess> {
    space: AddressSpace<P>,
    layout: Arc<GameLayout>,
    config: SessionConfig,
    injector: Arc<CodeInjector<P>>,
    patcher: BehaviorPatcher<P>,
    navigator: Arc<MenuNavigator<P>>,
    shared: Arc<SharedState<P>>,
    subscribers: Arc<Mutex<Vec<Sender<SessionEvent>>>>,
    shutdown: Arc<ShutdownSignal>,
    worker: Option<JoinHandle<()>>,
}

impl<P: RemoteProcess> Session<P> {
    /// Attach to a process.
    ///
    /// Validates the layout and allocates the scratch region. The supervisor
    /// does not run until [`start`](Self::start).
    pub fn new(process: Arc<P>, layout: GameLayout, config: SessionConfig) -> Result<Self> {
        layout.validate()?;
        config.validate()?;
        info!("Using layout {}", layout.version);

        let space = AddressSpace::new(process);
        let layout = Arc::new(layout);
        let injector = Arc::new(CodeInjector::allocate(space.clone(), config.scratch_size)?);

        let patcher = BehaviorPatcher::new(
            space.clone(),
            Arc::clone(&injector),
            Arc::clone(&layout),
            config.detour_offset,
        );
        let navigator = Arc::new(MenuNavigator::new(
            space.clone(),
            Arc::clone(&injector),
            Arc::clone(&layout),
        ));

        Ok(Self {
            space,
            layout,
            config,
            injector,
            patcher,
            navigator,
            shared: Arc::new(SharedState::new()),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            shutdown: Arc::new(ShutdownSignal::new()),
            worker: None,
        })
    }

    pub fn layout(&self) -> &GameLayout {
        &self.layout
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scratch_region(&self) -> ScratchRegion {
        self.injector.region()
    }

    /// Receive every event published from now on.
    ///
    /// Subscribe before [`start`](Self::start) to be sure to see
    /// [`SessionEvent::CoreReady`].
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Stop the supervisor and wait for it to exit. A stopped session cannot
    /// be started again.
    pub fn shutdown(&mut self) {
        self.shutdown.trigger();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Supervisor thread panicked");
            }
            info!("Session stopped");
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.shared.readiness()
    }

    pub fn is_core_ready(&self) -> bool {
        self.readiness() >= Readiness::Core
    }

    fn ready(&self, operation: &str) -> bool {
        let ready = self.is_core_ready();
        if !ready {
            debug!("Ignoring {}: game not ready", operation);
        }
        ready
    }

    /// Drivers of the current race, or of the last one once it has ended.
    pub fn drivers(&self) -> Option<Arc<RaceDrivers<P>>> {
        self.shared.drivers()
    }

    pub fn feature(&self, feature: Feature) -> Result<bool> {
        if !self.ready("feature query") {
            return Ok(false);
        }
        self.patcher.is_enabled(feature)
    }

    /// Switch a feature. Returns true only if every write succeeded.
    pub fn set_feature(&self, feature: Feature, enabled: bool) -> bool {
        if !self.ready("feature change") {
            return false;
        }
        self.patcher.set(feature, enabled)
    }

    pub fn current_menu(&self) -> Result<MenuState> {
        self.navigator.current_menu()
    }

    /// Take one step from the current screen to `target`.
    ///
    /// Returns false when the game is not ready or the current screen has no
    /// direct transition to `target`.
    pub fn goto_menu(&self, target: MenuState) -> Result<bool> {
        if !self.ready("navigation") {
            return Ok(false);
        }
        Ok(self.navigator.goto(target)?.is_some())
    }
}

impl<P: RemoteProcess + 'static> Session<P> {
    /// Spawn the supervisor thread. Calling this twice is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            warn!("Session already started");
            return Ok(());
        }

        let supervisor = Supervisor::new(
            self.space.clone(),
            Arc::clone(&self.navigator),
            Arc::clone(&self.layout),
            Arc::clone(&self.shared),
        );
        let subscribers = Arc::clone(&self.subscribers);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.config.poll_interval;

        let worker = thread::Builder::new()
            .name("racers-supervisor".to_string())
            .spawn(move || supervisor.run(subscribers, shutdown, interval))?;
        self.worker = Some(worker);

        info!("Session started");
        Ok(())
    }
}

impl<P: RemoteProcess> Drop for Session<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
