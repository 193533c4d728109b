//! Typed access to the target's address space.
//!
//! All values are little-endian and all addresses are 32-bit: the game is an
//! x86 executable. Reads and writes return [`Result`] so that every remote
//! fault stays recoverable by the caller.

mod chain;
mod patch;

pub use chain::PointerChain;
pub use patch::Patch;

use std::sync::Arc;

use tracing::warn;

use crate::error::{Error, Result};
use crate::process::RemoteProcess;

/// Typed reader/writer over a [`RemoteProcess`].
///
/// Cheap to clone; clones share the same process.
pub struct AddressSpace<P: RemoteProcess> {
    process: Arc<P>,
}

impl<P: RemoteProcess> Clone for AddressSpace<P> {
    fn clone(&self) -> Self {
        Self {
            process: Arc::clone(&self.process),
        }
    }
}

impl<P: RemoteProcess> AddressSpace<P> {
    pub fn new(process: Arc<P>) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &Arc<P> {
        &self.process
    }

    pub fn read_bytes(&self, address: u32, size: usize) -> Result<Vec<u8>> {
        self.process.read_bytes(address, size)
    }

    fn read_array<const N: usize>(&self, address: u32) -> Result<[u8; N]> {
        let bytes = self.process.read_bytes(address, N)?;
        bytes.try_into().map_err(|b: Vec<u8>| Error::MemoryReadFailed {
            address,
            message: format!("expected {} bytes, got {}", N, b.len()),
        })
    }

    pub fn read_u8(&self, address: u32) -> Result<u8> {
        Ok(self.read_array::<1>(address)?[0])
    }

    pub fn read_i16(&self, address: u32) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array(address)?))
    }

    pub fn read_i32(&self, address: u32) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(address)?))
    }

    pub fn read_u32(&self, address: u32) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array(address)?))
    }

    pub fn read_f32(&self, address: u32) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array(address)?))
    }

    pub fn write_bytes(&self, address: u32, bytes: &[u8]) -> Result<()> {
        self.process.write_bytes(address, bytes)
    }

    pub fn write_u8(&self, address: u32, value: u8) -> Result<()> {
        self.write_bytes(address, &[value])
    }

    pub fn write_i32(&self, address: u32, value: i32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Resolve a pointer chain starting at `base`.
    ///
    /// Every offset but the last is applied as `address = [address] + offset`.
    /// The last step is `[address] + last`, and that sum is returned without
    /// being dereferenced again. An empty chain resolves to `base`.
    pub fn calculate_pointer(&self, base: u32, chain: &PointerChain) -> Result<u32> {
        let mut address = base;
        for &offset in chain.offsets() {
            address = self.read_u32(address)?.wrapping_add_signed(offset);
        }
        Ok(address)
    }

    /// Apply every step of `patch` in order.
    ///
    /// A failed step does not stop the remaining steps and nothing is rolled
    /// back; the result is true only if every step succeeded.
    pub fn apply_patch(&self, patch: &Patch) -> bool {
        let mut result = true;
        for (address, bytes) in patch.steps() {
            if let Err(e) = self.write_bytes(*address, bytes) {
                warn!("Patch step at {:#x} failed: {}", address, e);
                result = false;
            }
        }
        result
    }
}
