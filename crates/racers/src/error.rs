use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u32, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u32, message: String },

    #[error("Failed to allocate {size} bytes in the target process: {message}")]
    AllocationFailed { size: usize, message: String },

    #[error("Failed to execute code at address {address:#x}: {message}")]
    ExecutionFailed { address: u32, message: String },

    #[error("Failed to assemble stub: {0}")]
    StubAssembly(String),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a remote memory access failure
    ///
    /// These are the transient faults the supervisor swallows while polling.
    pub fn is_access_failure(&self) -> bool {
        matches!(
            self,
            Error::MemoryReadFailed { .. } | Error::MemoryWriteFailed { .. }
        )
    }

    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
