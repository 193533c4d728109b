//! Memory layout of one build of the game.
//!
//! Every address, offset, pointer chain, patch pattern and menu edge the core
//! uses comes from a [`GameLayout`] loaded once when the session is created.
//! Nothing here is mutated afterwards.
//!
//! # Example
//!
//! ```ignore
//! let layout = racers::load_layout("layouts/retail.json")?;
//! layout.validate()?;
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::memory::PointerChain;
use crate::menu::{MenuGraph, MenuState};
use crate::patch::FeatureToggle;

/// Number of opponent slots in every race.
pub const OPPONENT_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameLayout {
    pub version: String,
    pub menu: MenuLayout,
    pub race: RaceLayout,
    pub drivers: DriverLayout,
    pub toggles: ToggleLayout,
    #[serde(default)]
    pub menu_graph: MenuGraph,
}

/// Front-end state and the UI engine's dispatch context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuLayout {
    /// Static pointer to the front-end object.
    pub base: u32,
    pub current_menu_offset: i32,
    /// Offset of the context the UI engine expects to be active.
    pub expected_context_offset: i32,
    /// Offset of the context that is active; differs while a prompt is open.
    pub active_context_offset: i32,
    /// Virtual slot of the "button pressed" handler.
    #[serde(default = "default_dispatch_slot")]
    pub dispatch_slot: i8,
    /// Raw menu byte to screen.
    pub codes: BTreeMap<u8, MenuState>,
    pub selected_race: PointerChain,
    pub selected_circuit: PointerChain,
    pub circuit_base: PointerChain,
}

fn default_dispatch_slot() -> i8 {
    0x38
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceLayout {
    /// Reads 1 while a race is running.
    pub race_running: u32,
    /// Reads 1 while a race is paused.
    pub paused: u32,
    /// Number of AI drivers used for the next race.
    pub ai_count: u32,
    /// Pointer to the structure holding the current race's driver count.
    ///
    /// Not derived from the menu base.
    pub driver_count_pointer: u32,
    pub driver_count_offset: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverLayout {
    pub base: u32,
    pub player: PointerChain,
    pub opponents: [PointerChain; OPPONENT_COUNT],
    pub fields: DriverFields,
}

/// Field offsets inside a driver structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverFields {
    pub position: [i32; 3],
    pub velocity: [i32; 3],
    pub vector1: [i32; 3],
    pub vector2: [i32; 3],
    /// Power-up brick currently carried.
    pub power_up: i32,
    pub white_bricks: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleLayout {
    pub run_in_background: FeatureToggle,
    pub ai_pathing: FeatureToggle,
    /// Entry of the routine where AI drivers decide to use their power-up.
    pub power_up_function: u32,
}

impl GameLayout {
    /// Translate a raw menu byte.
    pub fn menu_state(&self, code: u8) -> MenuState {
        self.menu
            .codes
            .get(&code)
            .copied()
            .unwrap_or(MenuState::Unknown)
    }

    /// Check that the layout is usable.
    ///
    /// Catches zeroed addresses, empty chains and malformed patterns, the
    /// typical results of a partially filled layout file.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidLayout(msg));

        for (name, address) in [
            ("menu.base", self.menu.base),
            ("race.race_running", self.race.race_running),
            ("race.ai_count", self.race.ai_count),
            ("race.driver_count_pointer", self.race.driver_count_pointer),
            ("drivers.base", self.drivers.base),
            ("toggles.power_up_function", self.toggles.power_up_function),
        ] {
            if address == 0 {
                return invalid(format!("{} is zero", name));
            }
        }

        if self.drivers.player.is_empty() {
            return invalid("drivers.player chain is empty".to_string());
        }
        if let Some(i) = self.drivers.opponents.iter().position(|c| c.is_empty()) {
            return invalid(format!("drivers.opponents[{}] chain is empty", i));
        }
        for (name, chain) in [
            ("menu.selected_race", &self.menu.selected_race),
            ("menu.selected_circuit", &self.menu.selected_circuit),
            ("menu.circuit_base", &self.menu.circuit_base),
        ] {
            if chain.is_empty() {
                return invalid(format!("{} chain is empty", name));
            }
        }

        for required in [MenuState::Loading, MenuState::Initializing] {
            if !self.menu.codes.values().any(|s| *s == required) {
                return invalid(format!("menu.codes has no code for {}", required));
            }
        }

        self.toggles.run_in_background.validate()?;
        self.toggles.ai_pathing.validate()?;

        Ok(())
    }
}

pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<GameLayout> {
    let content = fs::read_to_string(&path)?;
    let layout: GameLayout = serde_json::from_str(&content)?;
    layout.validate()?;
    Ok(layout)
}

pub fn save_layout<P: AsRef<Path>>(path: P, layout: &GameLayout) -> Result<()> {
    let content = serde_json::to_string_pretty(layout)?;
    fs::write(path, content)?;
    Ok(())
}

/// A complete layout over a synthetic address map, shared by unit tests.
#[cfg(test)]
pub(crate) mod fixture {
    use super::*;

    pub const MENU_BASE: u32 = 0x0040_0000;
    pub const MENU_OBJECT: u32 = 0x0050_0000;
    pub const CURRENT_MENU_OFFSET: i32 = 0x10;
    pub const EXPECTED_OFFSET: i32 = 0x20;
    pub const ACTIVE_OFFSET: i32 = 0x24;
    pub const DRIVER_BASE: u32 = 0x0041_0000;
    pub const RACE_RUNNING: u32 = 0x0042_0000;
    pub const PAUSED: u32 = 0x0042_0010;
    pub const AI_COUNT: u32 = 0x0042_0020;
    pub const DRIVER_COUNT_POINTER: u32 = 0x0042_0030;
    pub const RUN_IN_BACKGROUND: u32 = 0x0043_0000;
    pub const LOAD_RRB: u32 = 0x0043_1000;
    pub const POWER_UP_FUNCTION: u32 = 0x0043_9104;

    pub const CODE_LOADING: u8 = 0;
    pub const CODE_INITIALIZING: u8 = 1;
    pub const CODE_MAIN_MENU: u8 = 2;

    pub fn layout() -> GameLayout {
        let codes = [
            (CODE_LOADING, MenuState::Loading),
            (CODE_INITIALIZING, MenuState::Initializing),
            (CODE_MAIN_MENU, MenuState::MainMenu),
            (3, MenuState::Build),
            (4, MenuState::SingleRace),
            (5, MenuState::Options),
            (6, MenuState::TimeAttack),
            (7, MenuState::Circuit),
            (8, MenuState::ChooseRacer),
            (9, MenuState::CreateDriver),
        ]
        .into_iter()
        .collect();

        GameLayout {
            version: "test".to_string(),
            menu: MenuLayout {
                base: MENU_BASE,
                current_menu_offset: CURRENT_MENU_OFFSET,
                expected_context_offset: EXPECTED_OFFSET,
                active_context_offset: ACTIVE_OFFSET,
                dispatch_slot: 0x38,
                codes,
                selected_race: PointerChain::new(vec![0x100, 0x8]),
                selected_circuit: PointerChain::new(vec![0x100, 0x4]),
                circuit_base: PointerChain::new(vec![0x104, 0x0]),
            },
            race: RaceLayout {
                race_running: RACE_RUNNING,
                paused: PAUSED,
                ai_count: AI_COUNT,
                driver_count_pointer: DRIVER_COUNT_POINTER,
                driver_count_offset: 0x598,
            },
            drivers: DriverLayout {
                base: DRIVER_BASE,
                player: PointerChain::new(vec![0x10, 0x0]),
                opponents: [
                    PointerChain::new(vec![0x14, 0x0]),
                    PointerChain::new(vec![0x18, 0x0]),
                    PointerChain::new(vec![0x1C, 0x0]),
                    PointerChain::new(vec![0x20, 0x0]),
                    PointerChain::new(vec![0x24, 0x0]),
                ],
                fields: DriverFields {
                    position: [0x10, 0x14, 0x18],
                    velocity: [0x20, 0x24, 0x28],
                    vector1: [0x30, 0x34, 0x38],
                    vector2: [0x40, 0x44, 0x48],
                    power_up: 0xCCC,
                    white_bricks: 0xCD0,
                },
            },
            toggles: ToggleLayout {
                run_in_background: FeatureToggle::run_in_background(RUN_IN_BACKGROUND),
                ai_pathing: FeatureToggle::ai_pathing(LOAD_RRB),
                power_up_function: POWER_UP_FUNCTION,
            },
            menu_graph: MenuGraph::standard(),
        }
    }
}
