//! Register file for the virtual CPU.
//!
//! 32 × signed 32-bit general purpose registers, MIPS-style naming:
//!
//! | index | names |
//! |-------|-------|
//! | 0 | `$zero` (hard-wired to zero) |
//! | 1 | `$at` |
//! | 2-3 | `$v0`-`$v1` |
//! | 4-7 | `$a0`-`$a3` |
//! | 8-15 | `$t0`-`$t7` |
//! | 16-23 | `$s0`-`$s7` |
//! | 24-25 | `$t8`-`$t9` |
//! | 26-27 | `$k0`-`$k1` |
//! | 28-31 | `$gp`, `$sp`, `$fp`, `$ra` |

use std::fmt;

/// Number of general purpose registers.
pub const NUM_REGISTERS: usize = 32;

/// Symbolic register names, indexed by register number.
pub const REGISTER_NAMES: [&str; NUM_REGISTERS] = [
    "$zero", "$at", "$v0", "$v1", "$a0", "$a1", "$a2", "$a3",
    "$t0", "$t1", "$t2", "$t3", "$t4", "$t5", "$t6", "$t7",
    "$s0", "$s1", "$s2", "$s3", "$s4", "$s5", "$s6", "$s7",
    "$t8", "$t9", "$k0", "$k1", "$gp", "$sp", "$fp", "$ra",
];

/// Prefix used when registers are printed by number (`$r0`..`$r31`).
pub const DUMP_PREFIX: &str = "$r";

/// General purpose register file.
///
/// Register 0 always reads as zero. Writes to it are dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [i32; NUM_REGISTERS],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Create a new zeroed register file.
    pub const fn new() -> Self {
        Self {
            regs: [0; NUM_REGISTERS],
        }
    }

    /// Build a register file from raw values.
    ///
    /// Slot 0 is forced back to zero.
    pub fn from_array(mut regs: [i32; NUM_REGISTERS]) -> Self {
        regs[0] = 0;
        Self { regs }
    }

    /// Read a register (0-31).
    #[inline]
    pub fn read(&self, reg: u8) -> i32 {
        self.regs[(reg & 0x1F) as usize]
    }

    /// Write a register (1-31). Writes to register 0 are no-ops.
    #[inline]
    pub fn write(&mut self, reg: u8, value: i32) {
        let idx = (reg & 0x1F) as usize;
        if idx > 0 {
            self.regs[idx] = value;
        }
    }

    /// Get a slice of all registers (for dumping/serialization).
    pub fn as_slice(&self) -> &[i32; NUM_REGISTERS] {
        &self.regs
    }

    /// Iterate `(index, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.regs.iter().copied().enumerate()
    }

    /// Write every register as a `$r<index>=<value>` line.
    pub fn dump<W: std::io::Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        for (idx, value) in self.iter() {
            writeln!(out, "{}{}={}", DUMP_PREFIX, idx, value)?;
        }
        Ok(())
    }
}

/// Symbolic name for a register index, if in range.
pub fn register_name(reg: u8) -> Option<&'static str> {
    REGISTER_NAMES.get(reg as usize).copied()
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only show non-zero registers
        let non_zero: Vec<_> = self
            .regs
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .collect();

        if non_zero.is_empty() {
            write!(f, "RegisterFile {{ all zero }}")
        } else {
            write!(f, "RegisterFile {{ ")?;
            for (i, (reg, val)) in non_zero.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", REGISTER_NAMES[*reg], val)?;
            }
            write!(f, " }}")
        }
    }
}
