//! The decoded operand: a register reference or an inline literal.

use crate::error::EmulatorError;
use crate::register::RegisterFile;

/// A single decoded operand. Non-last operands in an instruction are always
/// [`Operand::Register`]; the last operand's shape follows the instruction's
/// `last_operand_type_code` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    Value(u16),
}

impl Operand {
    /// Resolves the operand to its numeric value against the current
    /// register file. Values resolve to themselves; registers are read via
    /// [`crate::register::Register::get`].
    pub fn resolve(&self, registers: &RegisterFile) -> Result<u32, EmulatorError> {
        match *self {
            Operand::Register(code) => Ok(registers.get(code)?.get()),
            Operand::Value(value) => Ok(u32::from(value)),
        }
    }

    /// Panics if called on a non-register operand. Non-last operands are
    /// guaranteed by the decoder (see [`crate::control_unit`]) to always be
    /// [`Operand::Register`]; this exists to make that invariant explicit at
    /// call sites instead of repeating a match everywhere.
    pub fn expect_register(&self) -> u8 {
        match self {
            Operand::Register(code) => *code,
            Operand::Value(_) => unreachable!("non-last operand decoded as a value"),
        }
    }
}
