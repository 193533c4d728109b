//! # racers
//!
//! Instrumentation core for a running LEGO Racers process.
//!
//! This crate provides:
//! - Typed reads, writes and pointer-chain resolution in the game's 32-bit
//!   address space
//! - Injection of synthesized x86 stubs through one scratch region
//! - Feature toggles implemented as code patches and a power-up detour
//! - Front-end navigation by replaying the UI engine's button dispatch
//! - A supervisor that reports when the game and each race's drivers are
//!   ready
//!
//! Addresses and patterns for a game build are described by a
//! [`GameLayout`] JSON file.

pub mod driver;
pub mod error;
pub mod inject;
pub mod layout;
pub mod memory;
pub mod menu;
pub mod patch;
pub mod prelude;
pub mod process;
pub mod session;

pub use driver::{Driver, RaceDrivers, Vec3};
pub use error::{Error, Result};
pub use inject::{CodeInjector, ScratchRegion};
pub use layout::{GameLayout, load_layout, save_layout};
pub use memory::{AddressSpace, Patch, PointerChain};
pub use menu::{MenuGraph, MenuNavigator, MenuState, TransitionEdge};
pub use patch::{BehaviorPatcher, Feature, FeatureToggle};
pub use process::{ProcessHandle, RemoteProcess};
pub use session::{
    Circuit, Readiness, Session, SessionConfig, SessionConfigBuilder, SessionEvent, ShutdownSignal,
};
