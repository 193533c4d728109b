//! Feature toggles implemented by patching the game's code.
//!
//! Two kinds exist:
//! - byte substitutions described entirely by a [`FeatureToggle`];
//! - the AI power-up detour, which reroutes the power-up routine through a
//!   block in the scratch region that lets only the local player's driver
//!   through.

mod toggle;

pub use toggle::{FeatureToggle, PatchSite};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::Result;
use crate::inject::{CodeInjector, Operand, Reg, StubBuilder};
use crate::layout::GameLayout;
use crate::memory::{AddressSpace, Patch};
use crate::process::RemoteProcess;

/// Length of the instruction the detour replaces: `mov eax,[esi+disp32]`.
const POWER_UP_ENTRY_LEN: u32 = 6;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Feature {
    /// Keep running while the game window is minimized.
    RunInBackground,
    /// Load AI path files.
    AiPathing,
    /// Let AI drivers use the power-ups they carry.
    AiPowerUps,
}

pub struct BehaviorPatcher<P: RemoteProcess> {
    space: AddressSpace<P>,
    injector: Arc<CodeInjector<P>>,
    layout: Arc<GameLayout>,
    detour_offset: usize,
}

impl<P: RemoteProcess> BehaviorPatcher<P> {
    pub fn new(
        space: AddressSpace<P>,
        injector: Arc<CodeInjector<P>>,
        layout: Arc<GameLayout>,
        detour_offset: usize,
    ) -> Self {
        Self {
            space,
            injector,
            layout,
            detour_offset,
        }
    }

    fn toggle(&self, feature: Feature) -> Option<&FeatureToggle> {
        match feature {
            Feature::RunInBackground => Some(&self.layout.toggles.run_in_background),
            Feature::AiPathing => Some(&self.layout.toggles.ai_pathing),
            Feature::AiPowerUps => None,
        }
    }

    /// Whether the feature's enabled code is currently in place.
    pub fn is_enabled(&self, feature: Feature) -> Result<bool> {
        if let Some(toggle) = self.toggle(feature) {
            let Some(site) = toggle.sites.first() else {
                return Ok(false);
            };
            let current = self.space.read_bytes(site.address, site.enabled.len())?;
            return Ok(current == site.enabled);
        }

        let entry = self.layout.toggles.power_up_function;
        let expected = self.power_up_read(entry)?;
        let current = self.space.read_bytes(entry, expected.len())?;
        Ok(current == expected)
    }

    /// Switch a feature. Returns true only if every write succeeded.
    pub fn set(&self, feature: Feature, enabled: bool) -> bool {
        debug!("Setting {} = {}", feature, enabled);

        if let Some(toggle) = self.toggle(feature) {
            return self.space.apply_patch(&toggle.patch(enabled));
        }

        let result = if enabled {
            self.restore_power_up_read()
        } else {
            self.install_power_up_detour()
        };
        result.unwrap_or_else(|e| {
            warn!("Failed to set {}: {}", feature, e);
            false
        })
    }

    /// `mov eax, [esi + power_up]`, the original first instruction of the
    /// power-up routine.
    fn power_up_read(&self, origin: u32) -> Result<Vec<u8>> {
        let mut b = StubBuilder::new(origin);
        b.mov_load(
            Reg::Eax,
            Operand::Disp32(Reg::Esi, self.layout.drivers.fields.power_up),
        );
        b.finish()
    }

    fn restore_power_up_read(&self) -> Result<bool> {
        let entry = self.layout.toggles.power_up_function;
        let code = self.power_up_read(entry)?;
        Ok(self.space.apply_patch(&Patch::new().write(entry, code)))
    }

    /// Route the power-up routine through a player-only filter.
    ///
    /// The routine is entered with the acting driver in `esi`. The filter
    /// walks the player's pointer chain into `ecx`; when it matches, the
    /// original read runs and control returns to the routine. Otherwise the
    /// routine's epilogue is replayed so AI drivers never use a power-up.
    fn install_power_up_detour(&self) -> Result<bool> {
        let entry = self.layout.toggles.power_up_function;
        let drivers = &self.layout.drivers;
        let power_up = drivers.fields.power_up;

        let detour = self.injector.install(self.detour_offset, |b| {
            let player = b.label();

            b.mov_load(Reg::Ecx, Operand::Absolute(drivers.base));
            for &offset in drivers.player.intermediate() {
                b.mov_load(Reg::Ecx, Operand::Disp32(Reg::Ecx, offset));
            }
            b.cmp(Reg::Ecx, Reg::Esi).je(player);

            b.mov_reg(Reg::Ecx, Reg::Esi)
                .pop(Reg::Edi)
                .pop(Reg::Esi)
                .ret();

            b.bind(player)
                .mov_load(Reg::Eax, Operand::Disp32(Reg::Esi, power_up))
                .jmp(entry + POWER_UP_ENTRY_LEN);
            Ok(())
        })?;

        // The body is in place before the entry starts jumping to it.
        let mut b = StubBuilder::new(entry);
        b.jmp(detour).nop();
        let hook = b.finish()?;

        Ok(self.space.apply_patch(&Patch::new().write(entry, hook)))
    }
}
