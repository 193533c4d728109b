use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::memory::Patch;

/// One patched location with its two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSite {
    pub address: u32,
    pub enabled: Vec<u8>,
    pub disabled: Vec<u8>,
}

impl PatchSite {
    pub fn new(address: u32, enabled: impl Into<Vec<u8>>, disabled: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            enabled: enabled.into(),
            disabled: disabled.into(),
        }
    }
}

/// A behavior switched by substituting instruction bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggle {
    pub name: String,
    pub sites: Vec<PatchSite>,
}

impl FeatureToggle {
    /// Keep the game loop running while the window is in the background.
    ///
    /// Turns the conditional `jne` that pauses the loop into an
    /// unconditional `jmp`.
    pub fn run_in_background(address: u32) -> Self {
        Self {
            name: "run_in_background".to_string(),
            sites: vec![PatchSite::new(address, [0xEB], [0x75])],
        }
    }

    /// Load the AI path (`.rrb`) files when a race starts.
    ///
    /// Disabled, the two `jne` checks become `nop`s and the final `je`
    /// always jumps past the loader.
    pub fn ai_pathing(base: u32) -> Self {
        Self {
            name: "ai_pathing".to_string(),
            sites: vec![
                PatchSite::new(base, [0x75, 0x0C], [0x90, 0x90]),
                PatchSite::new(base + 4, [0x75, 0x08], [0x90, 0x90]),
                PatchSite::new(base + 0xC, [0x74], [0xEB]),
            ],
        }
    }

    /// The writes that put every site in the requested state.
    pub fn patch(&self, enabled: bool) -> Patch {
        let mut patch = Patch::new();
        for site in &self.sites {
            let bytes = if enabled { &site.enabled } else { &site.disabled };
            patch.push(site.address, bytes.clone());
        }
        patch
    }

    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(Error::InvalidLayout(format!("toggle {} has no sites", self.name)));
        }
        for site in &self.sites {
            if site.enabled.is_empty() || site.enabled.len() != site.disabled.len() {
                return Err(Error::InvalidLayout(format!(
                    "toggle {} at {:#x}: patterns must be non-empty and of equal length",
                    self.name, site.address
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_pathing_sites() {
        let toggle = FeatureToggle::ai_pathing(0x1000);
        let on = toggle.patch(true);
        let off = toggle.patch(false);

        assert_eq!(
            on.steps(),
            &[
                (0x1000, vec![0x75, 0x0C]),
                (0x1004, vec![0x75, 0x08]),
                (0x100C, vec![0x74]),
            ]
        );
        assert_eq!(off.steps()[2], (0x100C, vec![0xEB]));
        toggle.validate().unwrap();
    }

    #[test]
    fn validate_rejects_mismatched_patterns() {
        let toggle = FeatureToggle {
            name: "broken".to_string(),
            sites: vec![PatchSite::new(0x1000, [0x75, 0x0C], [0x90])],
        };
        assert!(toggle.validate().is_err());

        let empty = FeatureToggle {
            name: "empty".to_string(),
            sites: Vec::new(),
        };
        assert!(empty.validate().is_err());
    }
}
