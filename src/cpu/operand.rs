//! Operand resolution.
//!
//! Turns textual operand tokens into register indices or literal values.
//! Register tokens come in two forms:
//!
//! - Numeric: `$0`..`$31`
//! - Symbolic: `$zero`, `$at`, `$v0`, ... (see [`REGISTER_NAMES`])
//!
//! The numeric form is tried first, so `$5` is always register 5.
//! Literals are plain base-10 integers with an optional sign.

use thiserror::Error;

use super::registers::{NUM_REGISTERS, REGISTER_NAMES};

/// Operand resolution error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperandError {
    /// Token does not name a register.
    #[error("not a register: {0:?}")]
    NotARegister(String),

    /// Token is not a decimal 32-bit integer.
    #[error("invalid immediate: {0:?}")]
    InvalidImmediate(String),
}

/// Resolve a register token to its index (0-31).
pub fn resolve_register(token: &str) -> Result<u8, OperandError> {
    if let Some(index) = numeric_register(token) {
        return Ok(index);
    }

    REGISTER_NAMES
        .iter()
        .position(|name| *name == token)
        .map(|idx| idx as u8)
        .ok_or_else(|| OperandError::NotARegister(token.to_string()))
}

/// `$<digits>` form. Returns None unless the whole remainder is a decimal
/// number in register range.
fn numeric_register(token: &str) -> Option<u8> {
    let digits = token.strip_prefix('$')?;
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let value: u32 = digits.parse().ok()?;
    if (value as usize) < NUM_REGISTERS {
        Some(value as u8)
    } else {
        None
    }
}

/// Resolve a literal token as a signed 32-bit decimal integer.
///
/// Hex, octal and floating point forms are rejected.
pub fn resolve_immediate(token: &str) -> Result<i32, OperandError> {
    token
        .parse::<i32>()
        .map_err(|_| OperandError::InvalidImmediate(token.to_string()))
}

/// A source operand that may be either a register or a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegOrImm {
    /// Register index.
    Reg(u8),
    /// Literal value.
    Imm(i32),
}

/// Resolve a token as a register if it names one, else as a literal.
pub fn resolve_reg_or_imm(token: &str) -> Result<RegOrImm, OperandError> {
    match resolve_register(token) {
        Ok(reg) => Ok(RegOrImm::Reg(reg)),
        Err(_) => resolve_immediate(token).map(RegOrImm::Imm),
    }
}
