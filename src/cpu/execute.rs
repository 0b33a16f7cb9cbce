//! Opcode executor.
//!
//! Applies one decoded [`Operation`] to a register file. Register updates
//! happen here; anything that reaches outside the register file (printing,
//! writing a snapshot) is handed back to the caller as an [`Effect`].
//!
//! All arithmetic is 32-bit two's complement with wraparound. Shift amounts
//! use only their low five bits, so `sll $t0, $t1, 33` shifts by 1 and a
//! negative amount like `-1` shifts by 31.

use super::instruction::{ArithOp, Operation, ShiftOp};
use super::operand::RegOrImm;
use super::registers::RegisterFile;

/// Side effect requested by an executed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Registers only (or nothing at all).
    None,
    /// Emit the register file to the observation channel.
    Dump,
    /// Persist the machine state to `path`.
    Snapshot { path: String },
}

/// Execute a single operation against `regs`.
pub fn execute(op: &Operation, regs: &mut RegisterFile) -> Effect {
    match op {
        Operation::LoadImm { rd, imm } => {
            regs.write(*rd, *imm);
            Effect::None
        }

        Operation::Arith { op, rd, rs, rhs } => {
            let a = regs.read(*rs);
            let b = match rhs {
                RegOrImm::Reg(rt) => regs.read(*rt),
                RegOrImm::Imm(imm) => *imm,
            };
            regs.write(*rd, arith(*op, a, b));
            Effect::None
        }

        Operation::Shift { op, rd, rs, shamt } => {
            let value = regs.read(*rs);
            regs.write(*rd, shift(*op, value, *shamt));
            Effect::None
        }

        Operation::DumpState => Effect::Dump,

        Operation::Snapshot { path } => Effect::Snapshot { path: path.clone() },
    }
}

/// Evaluate a binary ALU operation.
#[inline]
pub fn arith(op: ArithOp, a: i32, b: i32) -> i32 {
    match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::And => a & b,
        ArithOp::Or => a | b,
        ArithOp::Xor => a ^ b,
    }
}

/// Evaluate a logical shift. The amount is taken modulo 32.
#[inline]
pub fn shift(op: ShiftOp, value: i32, shamt: i32) -> i32 {
    let amount = (shamt as u32) & 31;
    match op {
        ShiftOp::Sll => ((value as u32) << amount) as i32,
        ShiftOp::Srl => ((value as u32) >> amount) as i32,
    }
}
