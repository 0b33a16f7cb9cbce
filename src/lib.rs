//! myvmm library
//!
//! Small multi-instance register VM: a 32-register CPU that executes
//! textual MIPS-style programs under an instruction quota, and can
//! checkpoint and resume through fixed-size binary snapshots.

pub mod cpu;
pub mod loader;
pub mod config;
pub mod session;
