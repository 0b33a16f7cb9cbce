//! Machine state and its binary snapshot format.
//!
//! # Snapshot Layout
//!
//! Fixed 132 bytes, host byte order, no header:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0 | 128 | 32 × `i32` registers, index order |
//! | 128 | 4 | `u32` program counter |
//!
//! The stored program counter is the index of the next instruction to run.
//! Files are not portable between hosts of different endianness.
//!
//! Any file whose size is not exactly [`SNAPSHOT_SIZE`] is rejected.

use std::io::{self, Cursor};
use std::path::Path;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use super::registers::{RegisterFile, NUM_REGISTERS};

/// Size of an encoded snapshot in bytes.
pub const SNAPSHOT_SIZE: usize = NUM_REGISTERS * 4 + 4;

/// Snapshot load/save error.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot file does not exist.
    #[error("snapshot file not found: {0}")]
    NotFound(String),

    /// File exists but has the wrong size.
    #[error("corrupt snapshot: expected {expected} bytes, found {found}")]
    WrongSize { expected: usize, found: usize },

    /// Any other I/O failure.
    #[error("snapshot I/O error on {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Complete resumable machine state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmState {
    /// General purpose registers.
    pub registers: RegisterFile,
    /// Index of the next instruction to execute.
    pub pc: u32,
}

impl VmState {
    /// Create a zeroed state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode into the fixed snapshot layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SNAPSHOT_SIZE);
        for value in self.registers.as_slice() {
            // Writes into a Vec cannot fail
            let _ = buf.write_i32::<NativeEndian>(*value);
        }
        let _ = buf.write_u32::<NativeEndian>(self.pc);
        buf
    }

    /// Decode from the fixed snapshot layout.
    pub fn decode(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() != SNAPSHOT_SIZE {
            return Err(SnapshotError::WrongSize {
                expected: SNAPSHOT_SIZE,
                found: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let mut regs = [0i32; NUM_REGISTERS];
        cursor
            .read_i32_into::<NativeEndian>(&mut regs)
            .map_err(|source| SnapshotError::Io { path: String::new(), source })?;
        let pc = cursor
            .read_u32::<NativeEndian>()
            .map_err(|source| SnapshotError::Io { path: String::new(), source })?;

        Ok(Self {
            registers: RegisterFile::from_array(regs),
            pc,
        })
    }

    /// Write the snapshot to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        std::fs::write(path, self.encode()).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SnapshotError::NotFound(path.display().to_string())
            } else {
                SnapshotError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;

        Self::decode(&data)
    }
}
