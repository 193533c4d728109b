//! In-memory stand-in for the game process, used by unit tests.
//!
//! Memory is a sparse byte map where unset bytes read as zero. All methods
//! take `&self` so a test can keep mutating the image while a session thread
//! polls it.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Mutex;

use crate::error::{Error, Result};

use super::RemoteProcess;

/// Number of bytes captured from the entry point of each execution.
const CAPTURE_LEN: usize = 64;

const ALLOCATION_BASE: u32 = 0x0100_0000;

/// A recorded remote execution.
#[derive(Debug, Clone)]
pub struct Execution {
    pub address: u32,
    /// Bytes present at `address` when the execution started.
    pub code: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    memory: HashMap<u32, u8>,
    unreadable: Vec<Range<u32>>,
    unwritable: Vec<Range<u32>>,
    next_allocation: u32,
    allocations: Vec<(u32, usize)>,
    writes: Vec<(u32, Vec<u8>)>,
    executions: Vec<Execution>,
}

impl MockState {
    fn byte(&self, address: u32) -> u8 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    fn store(&mut self, address: u32, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.memory.insert(address.wrapping_add(i as u32), *b);
        }
    }

    fn overlaps(ranges: &[Range<u32>], address: u32, len: usize) -> bool {
        let end = address.wrapping_add(len as u32);
        ranges.iter().any(|r| address < r.end && r.start < end)
    }
}

pub struct MockProcess {
    state: Mutex<MockState>,
}

impl MockProcess {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_allocation: ALLOCATION_BASE,
                ..Default::default()
            }),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn put_bytes(&self, address: u32, bytes: &[u8]) {
        self.with(|s| s.store(address, bytes));
    }

    pub fn put_u8(&self, address: u32, value: u8) {
        self.put_bytes(address, &[value]);
    }

    pub fn put_i16(&self, address: u32, value: i16) {
        self.put_bytes(address, &value.to_le_bytes());
    }

    pub fn put_i32(&self, address: u32, value: i32) {
        self.put_bytes(address, &value.to_le_bytes());
    }

    pub fn put_u32(&self, address: u32, value: u32) {
        self.put_bytes(address, &value.to_le_bytes());
    }

    pub fn put_f32(&self, address: u32, value: f32) {
        self.put_bytes(address, &value.to_le_bytes());
    }

    pub fn bytes(&self, address: u32, len: usize) -> Vec<u8> {
        self.with(|s| {
            (0..len)
                .map(|i| s.byte(address.wrapping_add(i as u32)))
                .collect()
        })
    }

    pub fn u32_at(&self, address: u32) -> u32 {
        let b = self.bytes(address, 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    pub fn fail_reads(&self, range: Range<u32>) {
        self.with(|s| s.unreadable.push(range));
    }

    pub fn fail_writes(&self, range: Range<u32>) {
        self.with(|s| s.unwritable.push(range));
    }

    pub fn clear_failures(&self) {
        self.with(|s| {
            s.unreadable.clear();
            s.unwritable.clear();
        });
    }

    pub fn writes(&self) -> Vec<(u32, Vec<u8>)> {
        self.with(|s| s.writes.clone())
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.with(|s| s.executions.clone())
    }

    pub fn allocations(&self) -> Vec<(u32, usize)> {
        self.with(|s| s.allocations.clone())
    }

    /// Forget recorded writes and executions, keeping the memory image.
    pub fn clear_log(&self) {
        self.with(|s| {
            s.writes.clear();
            s.executions.clear();
        });
    }
}

impl Default for MockProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteProcess for MockProcess {
    fn read_bytes(&self, address: u32, size: usize) -> Result<Vec<u8>> {
        self.with(|s| {
            if MockState::overlaps(&s.unreadable, address, size) {
                return Err(Error::MemoryReadFailed {
                    address,
                    message: "mock: unreadable".to_string(),
                });
            }
            Ok((0..size)
                .map(|i| s.byte(address.wrapping_add(i as u32)))
                .collect())
        })
    }

    fn write_bytes(&self, address: u32, bytes: &[u8]) -> Result<()> {
        self.with(|s| {
            if MockState::overlaps(&s.unwritable, address, bytes.len()) {
                return Err(Error::MemoryWriteFailed {
                    address,
                    message: "mock: unwritable".to_string(),
                });
            }
            s.store(address, bytes);
            s.writes.push((address, bytes.to_vec()));
            Ok(())
        })
    }

    fn allocate(&self, size: usize) -> Result<u32> {
        self.with(|s| {
            let address = s.next_allocation;
            s.next_allocation = address + ((size as u32 + 0xFFF) & !0xFFF);
            s.allocations.push((address, size));
            Ok(address)
        })
    }

    fn execute(&self, address: u32) -> Result<()> {
        self.with(|s| {
            let code = (0..CAPTURE_LEN)
                .map(|i| s.byte(address.wrapping_add(i as u32)))
                .collect();
            s.executions.push(Execution { address, code });
            Ok(())
        })
    }
}
