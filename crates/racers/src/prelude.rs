//! Prelude module for convenient imports
//!
//! ```ignore
//! use racers::prelude::*;
//! ```
//!
//! Brings the session surface, its events and the game vocabulary into
//! scope, together with `Arc` since sessions are built over a shared process.

pub use std::sync::Arc;

// Session
pub use crate::session::{
    Circuit, Readiness, Session, SessionConfig, SessionConfigBuilder, SessionEvent,
};

// Error handling
pub use crate::error::{Error, Result};

// Game vocabulary
pub use crate::driver::{Driver, RaceDrivers, Vec3};
pub use crate::layout::{GameLayout, load_layout};
pub use crate::menu::MenuState;
pub use crate::patch::Feature;

// Process access
pub use crate::process::{ProcessHandle, RemoteProcess};
