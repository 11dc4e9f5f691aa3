//! The instruction set: one variant per mnemonic, plus the operand-count
//! table the decoder needs to know how many bytes to pull off the stream.

use strum::{Display, EnumIter};

use crate::error::EmulatorError;

/// A decoded opcode byte.
///
/// Doc comments below follow the external instruction-set table: mnemonic,
/// opcode byte, operand count.
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// 0x00, 0 operands. Does nothing.
    Nop,
    /// 0x01, 0 operands. Raises [`crate::state::ExecuteState::Halt`].
    Hlt,
    /// 0x02, 2 operands: `MOV(dest, source)`.
    Mov,
    /// 0x03, 1 operand: `BEQ(address)`.
    Beq,
    /// 0x04, 1 operand: `BNE(address)`.
    Bne,
    /// 0x05, 1 operand: `B(address)`.
    B,
    /// 0x06, 1 operand: `BL(address)`.
    Bl,
    /// 0x07, 0 operands. Return-from-subroutine.
    Bx,
    /// 0x08, 3 operands: `ADD(dest, a, b)`.
    Add,
    /// 0x09, 3 operands: `SUB(dest, a, b)`.
    Sub,
    /// 0x0A, 3 operands: `MUL(dest, a, b)`.
    Mul,
    /// 0x0B, 3 operands: `DIV(dest, a, b)`.
    Div,
    /// 0x0C, 3 operands: `MOD(dest, a, b)`.
    Mod,
    /// 0x0D, 3 operands: `AND(dest, a, b)`.
    And,
    /// 0x0E, 3 operands: `ORR(dest, a, b)`.
    Orr,
    /// 0x0F, 3 operands: `XOR(dest, a, b)`.
    Xor,
    /// 0x10, 2 operands: `NOT(dest, a)`.
    Not,
    /// 0x11, 3 operands: `LSL(dest, a, b)`.
    Lsl,
    /// 0x12, 3 operands: `LSR(dest, a, b)`.
    Lsr,
    /// 0x13, 2 operands: `CMP(a, b)`.
    Cmp,
    /// 0x14, 2 operands: `LDR(dest, address)`.
    Ldr,
    /// 0x15, 2 operands: `STR(src, address)`.
    Str,
    /// 0x16, 1 operand: `INP(dest)`.
    Inp,
    /// 0x17, 1 operand: `OUT(src)`.
    Out,
    /// 0x18, 1 operand: `OUTC(src)`.
    Outc,
    /// 0xFF, 0 operands. Return-from-interrupt.
    Iret,
}

impl Opcode {
    /// How many operands follow the opcode byte (and, if nonzero, the
    /// `last_operand_type_code` byte).
    pub fn operand_count(self) -> usize {
        match self {
            Opcode::Nop | Opcode::Hlt | Opcode::Bx | Opcode::Iret => 0,
            Opcode::Beq
            | Opcode::Bne
            | Opcode::B
            | Opcode::Bl
            | Opcode::Inp
            | Opcode::Out
            | Opcode::Outc => 1,
            Opcode::Mov | Opcode::Not | Opcode::Cmp | Opcode::Ldr | Opcode::Str => 2,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::And
            | Opcode::Orr
            | Opcode::Xor
            | Opcode::Lsl
            | Opcode::Lsr => 3,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = EmulatorError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x00 => Ok(Opcode::Nop),
            0x01 => Ok(Opcode::Hlt),
            0x02 => Ok(Opcode::Mov),
            0x03 => Ok(Opcode::Beq),
            0x04 => Ok(Opcode::Bne),
            0x05 => Ok(Opcode::B),
            0x06 => Ok(Opcode::Bl),
            0x07 => Ok(Opcode::Bx),
            0x08 => Ok(Opcode::Add),
            0x09 => Ok(Opcode::Sub),
            0x0A => Ok(Opcode::Mul),
            0x0B => Ok(Opcode::Div),
            0x0C => Ok(Opcode::Mod),
            0x0D => Ok(Opcode::And),
            0x0E => Ok(Opcode::Orr),
            0x0F => Ok(Opcode::Xor),
            0x10 => Ok(Opcode::Not),
            0x11 => Ok(Opcode::Lsl),
            0x12 => Ok(Opcode::Lsr),
            0x13 => Ok(Opcode::Cmp),
            0x14 => Ok(Opcode::Ldr),
            0x15 => Ok(Opcode::Str),
            0x16 => Ok(Opcode::Inp),
            0x17 => Ok(Opcode::Out),
            0x18 => Ok(Opcode::Outc),
            0xFF => Ok(Opcode::Iret),
            opcode => Err(EmulatorError::UnknownOpcode { opcode }),
        }
    }
}
