use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A screen of the game's front-end.
///
/// The raw byte the game stores for each screen differs per build and is
/// mapped through [`MenuLayout::codes`](crate::layout::MenuLayout::codes).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum MenuState {
    Loading,
    Initializing,
    MainMenu,
    Build,
    CreateDriver,
    CancelDriver,
    CreateLicense,
    BuildCar,
    EditRacer,
    CopyRacer,
    DeleteRacer,
    SingleRace,
    Circuit,
    TimeAttack,
    ChooseRacer,
    StartRace,
    Options,
    GameOptions,
    DisplayOptions,
    PromptDisplayOptions,
    Controls,
    ControlsP1,
    ControlsP2,
    PromptYes,
    PromptNo,
    /// A byte with no entry in the layout's code table.
    Unknown,
}

impl MenuState {
    /// The game is still loading and ignores front-end requests.
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Loading | Self::Initializing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(MenuState::from_str("mainmenu").unwrap(), MenuState::MainMenu);
        assert_eq!(MenuState::from_str("ChooseRacer").unwrap(), MenuState::ChooseRacer);
        assert!(MenuState::from_str("garage").is_err());
    }

    #[test]
    fn loading_states() {
        assert!(MenuState::Loading.is_loading());
        assert!(MenuState::Initializing.is_loading());
        assert!(!MenuState::MainMenu.is_loading());
        assert!(!MenuState::Unknown.is_loading());
    }
}
