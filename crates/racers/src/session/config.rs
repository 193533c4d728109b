use std::time::Duration;

use crate::error::{Error, Result};
use crate::inject::MENU_STUB_SLOT;

/// Runtime tuning for a [`Session`](super::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between supervisor polls
    pub poll_interval: Duration,
    /// Settle time between hops of a multi-hop navigation
    pub hop_delay: Duration,
    /// Size of the scratch region allocated in the game
    pub scratch_size: usize,
    /// Offset of the power-up detour body inside the scratch region
    pub detour_offset: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            hop_delay: Duration::from_millis(30),
            scratch_size: 0x400,
            detour_offset: 0x300,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration builder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Check that the detour body lies inside the scratch region and clear of
    /// the menu stub slot at its start.
    pub fn validate(&self) -> Result<()> {
        if self.detour_offset < MENU_STUB_SLOT {
            return Err(Error::InvalidConfig(format!(
                "detour offset {:#x} overlaps the {:#x} byte menu stub slot",
                self.detour_offset, MENU_STUB_SLOT
            )));
        }
        if self.detour_offset >= self.scratch_size {
            return Err(Error::InvalidConfig(format!(
                "detour offset {:#x} is outside the {:#x} byte scratch region",
                self.detour_offset, self.scratch_size
            )));
        }
        Ok(())
    }
}

/// Builder for SessionConfig
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    poll_interval: Option<Duration>,
    hop_delay: Option<Duration>,
    scratch_size: Option<usize>,
    detour_offset: Option<usize>,
}

impl SessionConfigBuilder {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn hop_delay(mut self, delay: Duration) -> Self {
        self.hop_delay = Some(delay);
        self
    }

    pub fn scratch_size(mut self, size: usize) -> Self {
        self.scratch_size = Some(size);
        self
    }

    pub fn detour_offset(mut self, offset: usize) -> Self {
        self.detour_offset = Some(offset);
        self
    }

    /// Build the configuration
    pub fn build(self) -> SessionConfig {
        let default = SessionConfig::default();
        SessionConfig {
            poll_interval: self.poll_interval.unwrap_or(default.poll_interval),
            hop_delay: self.hop_delay.unwrap_or(default.hop_delay),
            scratch_size: self.scratch_size.unwrap_or(default.scratch_size),
            detour_offset: self.detour_offset.unwrap_or(default.detour_offset),
        }
    }
}
