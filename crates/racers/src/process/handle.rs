//! Windows process handle backing [`RemoteProcess`].

#[cfg(target_os = "windows")]
use tracing::debug;

use crate::error::{Error, Result};

use super::RemoteProcess;

/// An open handle to the game process.
///
/// The handle is closed when dropped. Memory allocated through it is left
/// resident in the target because installed detours keep pointing into it.
pub struct ProcessHandle {
    pub pid: u32,
    #[cfg(target_os = "windows")]
    handle: windows::Win32::Foundation::HANDLE,
}

// SAFETY: a process HANDLE is a kernel object reference; the Win32 memory and
// thread functions used here may be called on it from any thread.
#[cfg(target_os = "windows")]
unsafe impl Send for ProcessHandle {}
#[cfg(target_os = "windows")]
unsafe impl Sync for ProcessHandle {}

#[cfg(target_os = "windows")]
impl ProcessHandle {
    /// Open the process with the given ID for reading, writing and remote
    /// thread creation.
    pub fn open(pid: u32) -> Result<Self> {
        use windows::Win32::System::Threading::{OpenProcess, PROCESS_ALL_ACCESS};

        // SAFETY: OpenProcess has no memory-safety preconditions.
        let handle = unsafe { OpenProcess(PROCESS_ALL_ACCESS, false, pid) }
            .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;

        if handle.is_invalid() {
            return Err(Error::ProcessOpenFailed(format!(
                "pid {}: invalid handle",
                pid
            )));
        }

        debug!("Opened process {}", pid);
        Ok(Self { pid, handle })
    }
}

#[cfg(target_os = "windows")]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        use windows::Win32::Foundation::CloseHandle;

        // SAFETY: the handle was returned by OpenProcess and is closed once.
        let _ = unsafe { CloseHandle(self.handle) };
    }
}

#[cfg(target_os = "windows")]
impl RemoteProcess for ProcessHandle {
    fn read_bytes(&self, address: u32, size: usize) -> Result<Vec<u8>> {
        use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;

        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0usize;

        // SAFETY: the buffer is valid for `size` bytes; the remote address is
        // validated by the kernel, which reports failure instead of faulting.
        unsafe {
            ReadProcessMemory(
                self.handle,
                address as usize as *const std::ffi::c_void,
                buffer.as_mut_ptr().cast(),
                size,
                Some(&mut bytes_read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;

        if bytes_read != size {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("read {} of {} bytes", bytes_read, size),
            });
        }

        Ok(buffer)
    }

    fn write_bytes(&self, address: u32, bytes: &[u8]) -> Result<()> {
        use windows::Win32::System::Diagnostics::Debug::{
            FlushInstructionCache, WriteProcessMemory,
        };

        let mut bytes_written = 0usize;

        // SAFETY: the source slice is valid for its length; the kernel
        // validates the remote range.
        unsafe {
            WriteProcessMemory(
                self.handle,
                address as usize as *const std::ffi::c_void,
                bytes.as_ptr().cast(),
                bytes.len(),
                Some(&mut bytes_written),
            )
        }
        .map_err(|e| Error::MemoryWriteFailed {
            address,
            message: e.to_string(),
        })?;

        if bytes_written != bytes.len() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: format!("wrote {} of {} bytes", bytes_written, bytes.len()),
            });
        }

        // Patched code must be visible to the target's instruction fetch.
        // SAFETY: flushing an arbitrary range of another process is harmless.
        let _ = unsafe {
            FlushInstructionCache(
                self.handle,
                Some(address as usize as *const std::ffi::c_void),
                bytes.len(),
            )
        };

        Ok(())
    }

    fn allocate(&self, size: usize) -> Result<u32> {
        use windows::Win32::System::Memory::{
            MEM_COMMIT, MEM_RESERVE, PAGE_EXECUTE_READWRITE, VirtualAllocEx,
        };

        // SAFETY: VirtualAllocEx only reserves memory in the target process.
        let allocated = unsafe {
            VirtualAllocEx(
                self.handle,
                None,
                size,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_EXECUTE_READWRITE,
            )
        };

        if allocated.is_null() {
            return Err(Error::AllocationFailed {
                size,
                message: windows::core::Error::from_win32().to_string(),
            });
        }

        let address = u32::try_from(allocated as usize).map_err(|_| Error::AllocationFailed {
            size,
            message: format!("address {:p} is outside the 32-bit range", allocated),
        })?;

        debug!("Allocated {} bytes at {:#x} in process {}", size, address, self.pid);
        Ok(address)
    }

    fn execute(&self, address: u32) -> Result<()> {
        use windows::Win32::Foundation::{CloseHandle, WAIT_OBJECT_0};
        use windows::Win32::System::Threading::{
            CreateRemoteThread, INFINITE, WaitForSingleObject,
        };

        type ThreadStart = unsafe extern "system" fn(*mut std::ffi::c_void) -> u32;

        // SAFETY: the start address is only ever called inside the target
        // process; we never call it locally.
        let start = unsafe { std::mem::transmute::<usize, ThreadStart>(address as usize) };

        // SAFETY: the code at `address` was written by the caller and ends
        // with a return instruction.
        let thread = unsafe {
            CreateRemoteThread(self.handle, None, 0, Some(start), None, 0, None)
        }
        .map_err(|e| Error::ExecutionFailed {
            address,
            message: e.to_string(),
        })?;

        // SAFETY: `thread` is a valid handle owned by this function.
        let wait = unsafe { WaitForSingleObject(thread, INFINITE) };
        let _ = unsafe { CloseHandle(thread) };

        if wait != WAIT_OBJECT_0 {
            return Err(Error::ExecutionFailed {
                address,
                message: format!("wait returned {:?}", wait),
            });
        }

        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
impl ProcessHandle {
    pub fn open(pid: u32) -> Result<Self> {
        Err(Error::ProcessOpenFailed(format!(
            "pid {}: process access is only supported on Windows",
            pid
        )))
    }
}

#[cfg(not(target_os = "windows"))]
impl RemoteProcess for ProcessHandle {
    fn read_bytes(&self, address: u32, _size: usize) -> Result<Vec<u8>> {
        Err(Error::MemoryReadFailed {
            address,
            message: "unsupported platform".to_string(),
        })
    }

    fn write_bytes(&self, address: u32, _bytes: &[u8]) -> Result<()> {
        Err(Error::MemoryWriteFailed {
            address,
            message: "unsupported platform".to_string(),
        })
    }

    fn allocate(&self, size: usize) -> Result<u32> {
        Err(Error::AllocationFailed {
            size,
            message: "unsupported platform".to_string(),
        })
    }

    fn execute(&self, address: u32) -> Result<()> {
        Err(Error::ExecutionFailed {
            address,
            message: "unsupported platform".to_string(),
        })
    }
}
