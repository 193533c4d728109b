//! The front-end transition table.
//!
//! Each edge names the offset, relative to the UI engine's active context,
//! of the button object whose handler performs the transition. Prompt edges
//! only apply while a confirmation prompt is open.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::MenuState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from: MenuState,
    pub to: MenuState,
    pub offset: i32,
    #[serde(default)]
    pub prompt: bool,
}

impl TransitionEdge {
    pub const fn new(from: MenuState, to: MenuState, offset: i32) -> Self {
        Self {
            from,
            to,
            offset,
            prompt: false,
        }
    }

    pub const fn prompt(from: MenuState, to: MenuState, offset: i32) -> Self {
        Self {
            from,
            to,
            offset,
            prompt: true,
        }
    }
}

/// Directed graph of supported single-hop transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TransitionEdge>", into = "Vec<TransitionEdge>")]
pub struct MenuGraph {
    edges: Vec<TransitionEdge>,
}

impl MenuGraph {
    /// Build a graph, rejecting two edges for the same
    /// `(from, to, prompt)` triple.
    pub fn new(edges: Vec<TransitionEdge>) -> Result<Self> {
        for (i, edge) in edges.iter().enumerate() {
            if edges[..i]
                .iter()
                .any(|e| e.from == edge.from && e.to == edge.to && e.prompt == edge.prompt)
            {
                return Err(Error::InvalidLayout(format!(
                    "duplicate {}transition {} -> {}",
                    if edge.prompt { "prompt " } else { "" },
                    edge.from,
                    edge.to
                )));
            }
        }
        Ok(Self { edges })
    }

    /// Find the edge leaving `from` toward `to` in the requested table.
    pub fn find(&self, from: MenuState, to: MenuState, prompt: bool) -> Option<&TransitionEdge> {
        self.edges
            .iter()
            .find(|e| e.prompt == prompt && e.from == from && e.to == to)
    }

    pub fn edges(&self) -> &[TransitionEdge] {
        &self.edges
    }

    /// Transition table of the supported retail build.
    pub fn standard() -> Self {
        use MenuState::*;

        let edges = vec![
            // Confirmation prompts
            TransitionEdge::prompt(Options, DisplayOptions, 0x549C),
            TransitionEdge::prompt(Build, PromptYes, 0x5B38),
            TransitionEdge::prompt(Build, PromptNo, 0x5E28),
            TransitionEdge::prompt(CreateDriver, PromptYes, 0x3FD0),
            TransitionEdge::prompt(CreateDriver, PromptNo, 0x42C0),
            // Main menu
            TransitionEdge::new(MainMenu, Build, 0x1058),
            TransitionEdge::new(MainMenu, SingleRace, 0x498),
            TransitionEdge::new(MainMenu, Options, 0x1348),
            TransitionEdge::new(MainMenu, TimeAttack, 0xD68),
            TransitionEdge::new(MainMenu, Circuit, 0x788),
            // Build
            TransitionEdge::new(Build, MainMenu, 0x5848),
            TransitionEdge::new(Build, CreateDriver, 0x40C8),
            TransitionEdge::new(Build, DeleteRacer, 0x4999),
            TransitionEdge::new(Build, EditRacer, 0x43B8),
            TransitionEdge::new(Build, CopyRacer, 0x46A8),
            // Options; the game reports its sub-screens as Options too
            TransitionEdge::new(Options, MainMenu, 0x18D8),
            TransitionEdge::new(Options, ControlsP1, 0xA28),
            TransitionEdge::new(Options, ControlsP2, 0xD18),
            TransitionEdge::new(Options, GameOptions, 0x448),
            TransitionEdge::new(Options, PromptDisplayOptions, 0x51AC),
            TransitionEdge::new(Options, Options, 0x18D8),
            TransitionEdge::new(Controls, Options, 0x47C),
            // Race modes
            TransitionEdge::new(SingleRace, MainMenu, 0x1CCC),
            TransitionEdge::new(SingleRace, ChooseRacer, 0x19DC),
            TransitionEdge::new(TimeAttack, MainMenu, 0x1CC),
            TransitionEdge::new(Circuit, MainMenu, 0x1C34),
            TransitionEdge::new(Circuit, ChooseRacer, 0x1F24),
            // Driver creation
            TransitionEdge::new(CreateDriver, CancelDriver, 0x39F0),
            TransitionEdge::new(CreateDriver, CreateLicense, 0x3CE0),
            TransitionEdge::new(CreateLicense, CreateDriver, 0xA88),
            TransitionEdge::new(CreateLicense, BuildCar, 0xD78),
            TransitionEdge::new(BuildCar, Build, 0x11E4),
            TransitionEdge::new(BuildCar, CreateLicense, 0x14D4),
            // Racer selection; every "back" goes through the same button
            TransitionEdge::new(ChooseRacer, Circuit, 0x4998),
            TransitionEdge::new(ChooseRacer, SingleRace, 0x4998),
            TransitionEdge::new(ChooseRacer, TimeAttack, 0x4998),
            TransitionEdge::new(ChooseRacer, StartRace, 0x40C8),
        ];

        Self { edges }
    }
}

impl Default for MenuGraph {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<TransitionEdge>> for MenuGraph {
    type Error = Error;

    fn try_from(edges: Vec<TransitionEdge>) -> Result<Self> {
        Self::new(edges)
    }
}

impl From<MenuGraph> for Vec<TransitionEdge> {
    fn from(graph: MenuGraph) -> Self {
        graph.edges
    }
}
