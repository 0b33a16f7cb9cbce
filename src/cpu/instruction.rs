//! Instruction records and decoding.
//!
//! An [`Instruction`] is what the loader produces: a mnemonic plus its
//! trimmed operand tokens. Decoding turns it into a typed [`Operation`]
//! with every operand already resolved, or a [`DecodeError`] explaining
//! why the instruction will be skipped.
//!
//! # Instruction Set
//!
//! | mnemonic | operands | operation |
//! |----------|----------|-----------|
//! | `li` | rd, imm | `rd = imm` |
//! | `add` | rd, rs, rt | `rd = rs + rt` |
//! | `sub` | rd, rs, rt | `rd = rs - rt` |
//! | `addi` | rd, rs, imm | `rd = rs + imm` |
//! | `mul` | rd, rs, rt | `rd = rs * rt` |
//! | `and` | rd, rs, rt | `rd = rs & rt` |
//! | `or` | rd, rs, rt/imm | `rd = rs \| rt` |
//! | `ori` | rd, rs, imm | `rd = rs \| imm` |
//! | `xor` | rd, rs, rt | `rd = rs ^ rt` |
//! | `sll` | rd, rs, shamt | `rd = rs << shamt` |
//! | `srl` | rd, rs, shamt | `rd = (rs as u32) >> shamt` |
//! | `DUMP_PROCESSOR_STATE` | - | print all registers |
//! | `SNAPSHOT` | file | save registers and next PC |

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

use super::operand::{
    resolve_immediate, resolve_reg_or_imm, resolve_register, OperandError, RegOrImm,
};

/// Operand token list. Nearly every instruction has three or fewer.
pub type Operands = SmallVec<[String; 3]>;

/// Instruction decode error.
///
/// None of these are fatal: the machine skips the instruction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Mnemonic is not part of the instruction set.
    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),

    /// Operand count does not match the opcode.
    #[error("{mnemonic} takes {expected} operand(s), got {found}")]
    WrongArity {
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },

    /// An operand failed to resolve.
    #[error("operand {index}: {source}")]
    Operand {
        index: usize,
        #[source]
        source: OperandError,
    },
}

/// Opcodes known to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Li,
    Add,
    Sub,
    Addi,
    Mul,
    And,
    Or,
    Ori,
    Xor,
    Sll,
    Srl,
    DumpProcessorState,
    Snapshot,
}

impl Opcode {
    /// All opcodes, in table order.
    pub const ALL: [Opcode; 13] = [
        Opcode::Li,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Addi,
        Opcode::Mul,
        Opcode::And,
        Opcode::Or,
        Opcode::Ori,
        Opcode::Xor,
        Opcode::Sll,
        Opcode::Srl,
        Opcode::DumpProcessorState,
        Opcode::Snapshot,
    ];

    /// Look up an opcode by mnemonic (case-sensitive).
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic)
    }

    /// Source mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Li => "li",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Addi => "addi",
            Opcode::Mul => "mul",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Ori => "ori",
            Opcode::Xor => "xor",
            Opcode::Sll => "sll",
            Opcode::Srl => "srl",
            Opcode::DumpProcessorState => "DUMP_PROCESSOR_STATE",
            Opcode::Snapshot => "SNAPSHOT",
        }
    }

    /// Required operand count.
    pub fn arity(self) -> usize {
        match self {
            Opcode::DumpProcessorState => 0,
            Opcode::Snapshot => 1,
            Opcode::Li => 2,
            _ => 3,
        }
    }
}

/// Binary ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
}

/// Logical shift direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    /// Shift left logical.
    Sll,
    /// Shift right logical (zero fill).
    Srl,
}

/// A decoded operation with resolved operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Load immediate.
    LoadImm { rd: u8, imm: i32 },

    /// Register/immediate ALU operation.
    Arith { op: ArithOp, rd: u8, rs: u8, rhs: RegOrImm },

    /// Logical shift by a literal amount.
    Shift { op: ShiftOp, rd: u8, rs: u8, shamt: i32 },

    /// Print the register file.
    DumpState,

    /// Save the machine state to a file.
    Snapshot { path: String },
}

/// A loaded instruction: mnemonic and operand tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Opcode name as written.
    pub mnemonic: String,
    /// Trimmed, non-empty operand tokens.
    pub operands: Operands,
    /// 1-based line in the source file (0 if unknown).
    pub line: usize,
}

impl Instruction {
    /// Create an instruction from a mnemonic and operand tokens.
    pub fn new<I, S>(mnemonic: impl Into<String>, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mnemonic: mnemonic.into(),
            operands: operands.into_iter().map(Into::into).collect(),
            line: 0,
        }
    }

    /// Attach a source line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Decode into a typed operation.
    pub fn decode(&self) -> Result<Operation, DecodeError> {
        let opcode = Opcode::from_mnemonic(&self.mnemonic)
            .ok_or_else(|| DecodeError::UnknownMnemonic(self.mnemonic.clone()))?;

        if self.operands.len() != opcode.arity() {
            return Err(DecodeError::WrongArity {
                mnemonic: opcode.mnemonic(),
                expected: opcode.arity(),
                found: self.operands.len(),
            });
        }

        let op = match opcode {
            Opcode::Li => Operation::LoadImm {
                rd: self.reg(0)?,
                imm: self.imm(1)?,
            },
            Opcode::Add => self.arith_rrr(ArithOp::Add)?,
            Opcode::Sub => self.arith_rrr(ArithOp::Sub)?,
            Opcode::Mul => self.arith_rrr(ArithOp::Mul)?,
            Opcode::And => self.arith_rrr(ArithOp::And)?,
            Opcode::Xor => self.arith_rrr(ArithOp::Xor)?,
            Opcode::Addi => self.arith_rri(ArithOp::Add)?,
            Opcode::Ori => self.arith_rri(ArithOp::Or)?,
            Opcode::Or => Operation::Arith {
                op: ArithOp::Or,
                rd: self.reg(0)?,
                rs: self.reg(1)?,
                rhs: resolve_reg_or_imm(&self.operands[2])
                    .map_err(|source| DecodeError::Operand { index: 2, source })?,
            },
            Opcode::Sll => self.shift(ShiftOp::Sll)?,
            Opcode::Srl => self.shift(ShiftOp::Srl)?,
            Opcode::DumpProcessorState => Operation::DumpState,
            Opcode::Snapshot => Operation::Snapshot {
                path: unquote(&self.operands[0]).to_string(),
            },
        };

        Ok(op)
    }

    fn reg(&self, index: usize) -> Result<u8, DecodeError> {
        resolve_register(&self.operands[index])
            .map_err(|source| DecodeError::Operand { index, source })
    }

    fn imm(&self, index: usize) -> Result<i32, DecodeError> {
        resolve_immediate(&self.operands[index])
            .map_err(|source| DecodeError::Operand { index, source })
    }

    fn arith_rrr(&self, op: ArithOp) -> Result<Operation, DecodeError> {
        Ok(Operation::Arith {
            op,
            rd: self.reg(0)?,
            rs: self.reg(1)?,
            rhs: RegOrImm::Reg(self.reg(2)?),
        })
    }

    fn arith_rri(&self, op: ArithOp) -> Result<Operation, DecodeError> {
        Ok(Operation::Arith {
            op,
            rd: self.reg(0)?,
            rs: self.reg(1)?,
            rhs: RegOrImm::Imm(self.imm(2)?),
        })
    }

    fn shift(&self, op: ShiftOp) -> Result<Operation, DecodeError> {
        Ok(Operation::Shift {
            op,
            rd: self.reg(0)?,
            rs: self.reg(1)?,
            shamt: self.imm(2)?,
        })
    }
}

/// Strip one pair of surrounding double quotes.
fn unquote(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}
