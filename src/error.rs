//! Errors the machine can raise while executing a program.

use thiserror::Error;

/// Everything that can go wrong once a program is running.
///
/// Decode and arithmetic errors are recoverable at the activation level that
/// raised them (see [`crate::cpu::Cpu::run`]): they terminate the current
/// `run` activation exactly as `HLT` would, they do not unwind the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmulatorError {
    #[error("address {address:#06x} with width {width} exceeds memory size {size}")]
    OutOfBounds {
        address: usize,
        width: usize,
        size: usize,
    },

    #[error("unknown opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },

    #[error("unknown register code {code:#04x}")]
    UnknownRegister { code: u8 },

    #[error("unknown operand type code {code:#04x}")]
    UnknownOperandType { code: u8 },

    #[error("arithmetic error: division or modulus by zero")]
    ArithmeticError,
}
