//! Hosting and running synthesized code inside the target.
//!
//! One executable scratch region is allocated per session and reused by every
//! stub. Menu transitions run in the first [`MENU_STUB_SLOT`] bytes of the
//! region; detour bodies are installed at a fixed offset past that slot.

pub mod stub;

pub use stub::{Label, Operand, Reg, StubBuilder};

use std::sync::Mutex;

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::AddressSpace;
use crate::process::RemoteProcess;

/// Bytes at the start of the scratch region reserved for menu stubs.
pub const MENU_STUB_SLOT: usize = 0x40;

/// Executable memory owned by the session inside the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchRegion {
    pub address: u32,
    pub size: usize,
}

impl ScratchRegion {
    /// Address `offset` bytes into the region.
    pub fn at(&self, offset: usize) -> u32 {
        self.address.wrapping_add(offset as u32)
    }
}

/// Writes stubs into the scratch region and runs them.
///
/// Writing and executing happen under one lock, so a stub is never
/// overwritten by another caller between being written and being run.
pub struct CodeInjector<P: RemoteProcess> {
    space: AddressSpace<P>,
    region: ScratchRegion,
    lock: Mutex<()>,
}

impl<P: RemoteProcess> CodeInjector<P> {
    /// Allocate the session's scratch region.
    pub fn allocate(space: AddressSpace<P>, size: usize) -> Result<Self> {
        let address = space.process().allocate(size)?;
        debug!("Scratch region: {:#x} ({} bytes)", address, size);
        Ok(Self {
            space,
            region: ScratchRegion { address, size },
            lock: Mutex::new(()),
        })
    }

    pub fn region(&self) -> ScratchRegion {
        self.region
    }

    fn assemble(
        &self,
        offset: usize,
        build: impl FnOnce(&mut StubBuilder) -> Result<()>,
    ) -> Result<(u32, Vec<u8>)> {
        let origin = self.region.at(offset);
        let mut builder = StubBuilder::new(origin);
        build(&mut builder)?;
        let code = builder.finish()?;

        let end = offset.checked_add(code.len());
        if end.is_none_or(|end| end > self.region.size) {
            return Err(Error::StubAssembly(format!(
                "{} byte stub at offset {:#x} overflows the {} byte scratch region",
                code.len(),
                offset,
                self.region.size
            )));
        }
        Ok((origin, code))
    }

    /// Assemble a stub at `offset` and write it without running it.
    ///
    /// Used for detour bodies that the game itself jumps into.
    pub fn install(
        &self,
        offset: usize,
        build: impl FnOnce(&mut StubBuilder) -> Result<()>,
    ) -> Result<u32> {
        let (origin, code) = self.assemble(offset, build)?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.space.write_bytes(origin, &code)?;
        Ok(origin)
    }

    /// Assemble a stub at `offset`, write it and run it to completion.
    ///
    /// The stub must end in `ret` and leave callee-saved registers intact;
    /// anything else corrupts the target.
    pub fn run(
        &self,
        offset: usize,
        build: impl FnOnce(&mut StubBuilder) -> Result<()>,
    ) -> Result<()> {
        let (origin, code) = self.assemble(offset, build)?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.space.write_bytes(origin, &code)?;
        debug!("Executing {} byte stub at {:#x}", code.len(), origin);
        self.space.process().execute(origin)
    }
}
