//! Front-end screens, the transitions between them, and navigation.

mod graph;
mod navigator;
mod state;

pub use graph::{MenuGraph, TransitionEdge};
pub use navigator::{MenuNavigator, UiContext};
pub use state::MenuState;
