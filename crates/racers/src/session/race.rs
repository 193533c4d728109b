//! Race state and race setup through the single race menu.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::layout::OPPONENT_COUNT;
use crate::menu::MenuState;
use crate::process::RemoteProcess;

use super::Session;
use super::supervisor::read_flag;

/// Largest number of AI drivers the game accepts.
pub const MAX_AI_DRIVERS: i32 = OPPONENT_COUNT as i32;

/// Size of one entry in the game's circuit table.
const CIRCUIT_STRIDE: i32 = 100;

/// A race track and the selection that picks it and its mirrored variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub block: i32,
    pub number: i32,
    pub mirror_block: i32,
    pub mirror_number: i32,
}

impl Circuit {
    /// `(circuit, race)` to pass to [`Session::select_race`].
    pub fn selection(&self, mirror: bool) -> (i32, i32) {
        if mirror {
            (self.mirror_block, self.mirror_number)
        } else {
            (self.block, self.number)
        }
    }
}

impl<P: RemoteProcess> Session<P> {
    pub fn is_race_running(&self) -> Result<bool> {
        if !self.ready("race state") {
            return Ok(false);
        }
        read_flag(&self.space, self.layout.race.race_running)
    }

    pub fn is_paused(&self) -> Result<bool> {
        if !self.ready("pause state") {
            return Ok(false);
        }
        Ok(self.space.read_u8(self.layout.race.paused)? == 1)
    }

    /// Number of AI drivers in the current race.
    ///
    /// Read through the race's own driver-count structure, which is not the
    /// value [`set_ai_driver_count`](Self::set_ai_driver_count) writes.
    pub fn ai_driver_count(&self) -> Result<i32> {
        if !self.ready("AI driver count") {
            return Ok(0);
        }
        let race = &self.layout.race;
        let holder = self.space.read_u32(race.driver_count_pointer)?;
        self.space
            .read_i32(holder.wrapping_add_signed(race.driver_count_offset))
    }

    /// Set the number of AI drivers for the next race.
    ///
    /// Counts outside `0..=MAX_AI_DRIVERS` are rejected without writing.
    pub fn set_ai_driver_count(&self, count: i32) -> Result<bool> {
        if !self.ready("AI driver count") {
            return Ok(false);
        }
        if !(0..=MAX_AI_DRIVERS).contains(&count) {
            warn!("AI driver count {} out of range 0..={}", count, MAX_AI_DRIVERS);
            return Ok(false);
        }
        self.space.write_i32(self.layout.race.ai_count, count)?;
        Ok(true)
    }

    /// Write the single race menu's selection.
    pub fn select_race(&self, circuit: i32, race: i32) -> Result<bool> {
        if !self.ready("race selection") {
            return Ok(false);
        }

        let menu = &self.layout.menu;
        let object = self.space.read_u32(menu.base)?;
        let first_circuit = self
            .space
            .read_i32(self.space.calculate_pointer(object, &menu.circuit_base)?)?;
        let circuit_slot = self.space.calculate_pointer(object, &menu.selected_circuit)?;
        let race_slot = self.space.calculate_pointer(object, &menu.selected_race)?;

        self.space.write_i32(
            circuit_slot,
            first_circuit.wrapping_add(CIRCUIT_STRIDE.wrapping_mul(circuit)),
        )?;
        self.space.write_i32(race_slot, race)?;
        debug!("Selected circuit {} race {}", circuit, race);
        Ok(true)
    }

    /// Walk to the single race menu, select a race and continue to racer
    /// selection.
    ///
    /// Only screens one hop away from the main menu are left. Returns true
    /// when the final step into racer selection was taken. A hop the game
    /// ignored leaves the walk on the wrong screen and that step finds no
    /// edge. Stops early, returning false, once the session shuts down.
    pub fn setup_race(&self, circuit: i32, race: i32) -> Result<bool> {
        if !self.ready("race setup") {
            return Ok(false);
        }

        let current = self.current_menu()?;
        if current != MenuState::SingleRace {
            if current != MenuState::MainMenu {
                if !matches!(
                    current,
                    MenuState::Build
                        | MenuState::Circuit
                        | MenuState::TimeAttack
                        | MenuState::Options
                ) {
                    debug!("Cannot set up a race from {}", current);
                    return Ok(false);
                }
                self.navigator.goto(MenuState::MainMenu)?;
                if !self.settle() {
                    return Ok(false);
                }
            }
            self.navigator.goto(MenuState::SingleRace)?;
            if !self.settle() {
                return Ok(false);
            }
        }

        self.select_race(circuit, race)?;
        if !self.settle() {
            return Ok(false);
        }
        Ok(self.navigator.goto(MenuState::ChooseRacer)?.is_some())
    }

    pub fn setup_circuit(&self, circuit: &Circuit, mirror: bool) -> Result<bool> {
        let (block, number) = circuit.selection(mirror);
        self.setup_race(block, number)
    }

    /// Give the UI engine time to switch screens. False if the session shut
    /// down meanwhile.
    fn settle(&self) -> bool {
        if self.shutdown.wait(self.config.hop_delay) {
            debug!("Race setup interrupted by shutdown");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::layout::fixture;
    use crate::process::MockProcess;
    use crate::session::SessionConfig;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    const MENU_TABLE: u32 = 0x0080_0000;
    const SELECTION: u32 = 0x0081_0000;
    const CIRCUITS: u32 = 0x0082_0000;
    const FIRST_CIRCUIT: i32 = 0x0090_0000;

    fn ready_session(code: u8) -> (Arc<MockProcess>, Session<MockProcess>) {
        ready_session_with(code, config())
    }

    fn ready_session_with(
        code: u8,
        config: SessionConfig,
    ) -> (Arc<MockProcess>, Session<MockProcess>) {
        let (mock, mut session) = session_with(code, config);
        ready(&mut session);

        // [object] -> table; [table + 0x100] -> selection; [table + 0x104] -> circuits
        mock.put_u32(fixture::MENU_OBJECT, MENU_TABLE);
        mock.put_u32(MENU_TABLE + 0x100, SELECTION);
        mock.put_u32(MENU_TABLE + 0x104, CIRCUITS);
        mock.put_i32(CIRCUITS, FIRST_CIRCUIT);
        mock.clear_log();
        (mock, session)
    }

    fn button(code: &[u8]) -> u32 {
        u32::from_le_bytes([code[7], code[8], code[9], code[10]])
    }

    #[test]
    fn race_flags() {
        let (mock, session) = ready_session(fixture::CODE_MAIN_MENU);
        assert!(!session.is_race_running().unwrap());
        assert!(!session.is_paused().unwrap());

        mock.put_i32(fixture::RACE_RUNNING, 1);
        mock.put_u8(fixture::PAUSED, 1);
        assert!(session.is_race_running().unwrap());
        assert!(session.is_paused().unwrap());

        mock.put_i32(fixture::RACE_RUNNING, 2);
        assert!(!session.is_race_running().unwrap());
    }

    #[test]
    fn ai_count_reads_through_driver_count_pointer() {
        let (mock, session) = ready_session(fixture::CODE_MAIN_MENU);
        mock.put_u32(fixture::DRIVER_COUNT_POINTER, 0x0083_0000);
        mock.put_i32(0x0083_0000 + 0x598, 4);
        mock.put_i32(fixture::AI_COUNT, 2);

        assert_eq!(session.ai_driver_count().unwrap(), 4);
    }

    #[test]
    fn ai_count_range_is_enforced() {
        let (mock, session) = ready_session(fixture::CODE_MAIN_MENU);

        assert!(session.set_ai_driver_count(5).unwrap());
        assert_eq!(mock.u32_at(fixture::AI_COUNT), 5);
        assert!(session.set_ai_driver_count(0).unwrap());
        assert_eq!(mock.u32_at(fixture::AI_COUNT), 0);

        mock.clear_log();
        assert!(!session.set_ai_driver_count(6).unwrap());
        assert!(!session.set_ai_driver_count(-1).unwrap());
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn select_race_writes_circuit_entry_and_race() {
        let (mock, session) = ready_session(fixture::CODE_MAIN_MENU);

        assert!(session.select_race(2, 3).unwrap());
        assert_eq!(mock.u32_at(SELECTION + 0x4), (FIRST_CIRCUIT + 200) as u32);
        assert_eq!(mock.u32_at(SELECTION + 0x8), 3);
        assert!(mock.executions().is_empty());
    }

    #[test]
    fn setup_from_single_race_selects_then_continues() {
        let (mock, session) = ready_session(4);

        assert!(session.setup_race(1, 0).unwrap());
        assert_eq!(mock.u32_at(SELECTION + 0x4), (FIRST_CIRCUIT + 100) as u32);

        let executions = mock.executions();
        assert_eq!(executions.len(), 1);
        assert_eq!(button(&executions[0].code), 0x19DC);
    }

    #[test]
    fn setup_from_main_menu_enters_single_race() {
        let (mock, session) = ready_session(fixture::CODE_MAIN_MENU);

        // the mock never changes screens, so only the first hop has an edge
        // and racer selection is never reached
        assert!(!session.setup_race(0, 2).unwrap());
        let executions = mock.executions();
        assert_eq!(executions.len(), 1);
        assert_eq!(button(&executions[0].code), 0x498);
        assert_eq!(mock.u32_at(SELECTION + 0x8), 2);
    }

    #[test]
    fn setup_from_build_returns_to_main_menu_first() {
        let (mock, session) = ready_session(3);

        assert!(!session.setup_race(0, 0).unwrap());
        assert_eq!(button(&mock.executions()[0].code), 0x5848);
    }

    #[test]
    fn shutdown_interrupts_setup_between_hops() {
        let config = SessionConfig::builder()
            .poll_interval(Duration::from_millis(1))
            .hop_delay(Duration::from_secs(10))
            .build();
        let (mock, session) = ready_session_with(fixture::CODE_MAIN_MENU, config);

        let signal = Arc::clone(&session.shutdown);
        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            signal.trigger();
        });

        let start = Instant::now();
        assert!(!session.setup_race(0, 2).unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
        trigger.join().unwrap();

        // entered single race, then stopped before selecting
        let writes = mock.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, session.scratch_region().address);
        assert_eq!(mock.executions().len(), 1);
    }

    #[test]
    fn setup_from_unrelated_screen_does_nothing() {
        let (mock, session) = ready_session(9);

        assert!(!session.setup_race(0, 0).unwrap());
        assert!(mock.writes().is_empty());
        assert!(mock.executions().is_empty());
    }

    #[test]
    fn circuit_selection_honours_mirror() {
        let circuit = Circuit {
            block: 1,
            number: 2,
            mirror_block: 5,
            mirror_number: 0,
        };
        assert_eq!(circuit.selection(false), (1, 2));
        assert_eq!(circuit.selection(true), (5, 0));

        let (mock, session) = ready_session(4);
        assert!(session.setup_circuit(&circuit, true).unwrap());
        assert_eq!(mock.u32_at(SELECTION + 0x4), (FIRST_CIRCUIT + 500) as u32);
        assert_eq!(mock.u32_at(SELECTION + 0x8), 0);
    }
}
