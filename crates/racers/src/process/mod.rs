//! Access to the target process.
//!
//! Locating and attaching to the game is the caller's business; this module
//! only defines the operations the instrumentation core needs from an
//! attached process, plus the Windows implementation of them.

mod handle;

#[cfg(test)]
pub mod mock;

pub use handle::ProcessHandle;

#[cfg(test)]
pub use mock::MockProcess;

use crate::error::Result;

/// Raw operations on an attached 32-bit target process.
///
/// Every call is blocking. Implementations must not panic on remote faults;
/// they report them as errors.
pub trait RemoteProcess: Send + Sync {
    /// Copy `size` bytes out of the target.
    fn read_bytes(&self, address: u32, size: usize) -> Result<Vec<u8>>;

    /// Copy `bytes` into the target.
    fn write_bytes(&self, address: u32, bytes: &[u8]) -> Result<()>;

    /// Reserve a readable, writable and executable block in the target.
    fn allocate(&self, size: usize) -> Result<u32>;

    /// Run the code at `address` on a new remote thread and wait until it
    /// returns. There is no timeout.
    fn execute(&self, address: u32) -> Result<()>;
}
