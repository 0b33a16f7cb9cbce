//! Instruction execution engine.
//!
//! This module provides the virtual CPU that runs loaded programs:
//!
//! - [`registers`]: 32 × `i32` register file, `$zero` hard-wired to 0
//! - [`operand`]: register name and literal resolution
//! - [`instruction`]: instruction records and typed decoding
//! - [`execute`]: per-opcode state transitions
//! - [`snapshot`]: resumable state and its 132-byte file format
//! - [`machine`]: the fetch-decode-execute loop under a quota
//!
//! # Example
//!
//! ```
//! use myvmm::cpu::{Instruction, Machine};
//!
//! let program = vec![
//!     Instruction::new("li", ["$v0", "10"]),
//!     Instruction::new("addi", ["$v0", "$v0", "5"]),
//! ];
//! let mut machine = Machine::new(program, 100);
//! machine.run(&mut std::io::sink());
//! assert_eq!(machine.registers().read(2), 15);
//! ```

pub mod registers;
pub mod operand;
pub mod instruction;
pub mod execute;
pub mod snapshot;
pub mod machine;

pub use registers::{RegisterFile, NUM_REGISTERS, REGISTER_NAMES};
pub use operand::{resolve_immediate, resolve_register, OperandError, RegOrImm};
pub use instruction::{ArithOp, DecodeError, Instruction, Opcode, Operation, ShiftOp};
pub use execute::{execute, Effect};
pub use snapshot::{SnapshotError, VmState, SNAPSHOT_SIZE};
pub use machine::{HaltReason, Machine, MachineStatus, RunSummary, StepOutcome};
