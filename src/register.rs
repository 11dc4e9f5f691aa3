//! Fixed-width registers and the register file that owns all seven of them.

use crate::consts::{self, REGISTER_COUNT};
use crate::error::EmulatorError;

/// A byte-addressable, fixed-width, little-endian integer register.
///
/// `get`/`set` always operate on the whole register: there is no sub-byte
/// addressing, matching the original's `bytearray`-backed implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    bytes: Vec<u8>,
}

impl Register {
    pub fn new(width: usize) -> Self {
        Self {
            bytes: vec![0; width],
        }
    }

    pub fn width(&self) -> usize {
        self.bytes.len()
    }

    /// Reassembles the register's bytes into a little-endian unsigned value.
    pub fn get(&self) -> u32 {
        self.bytes
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, byte)| acc | (u32::from(*byte) << (8 * i)))
    }

    /// Writes `value`, keeping only as many low-order bytes as the register
    /// is wide. Values that do not fit are truncated, not rejected: this is
    /// how arithmetic overflow and two's-complement-style wraparound (e.g. an
    /// unsigned `SUB` underflow) resolve into a stored value.
    pub fn set(&mut self, value: u64) {
        for (i, byte) in self.bytes.iter_mut().enumerate() {
            *byte = ((value >> (8 * i)) & 0xFF) as u8;
        }
    }
}

/// Owns the seven architectural registers (`R0`..`R6`) and the widths they
/// were constructed with.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    registers: [Register; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new(widths: [usize; REGISTER_COUNT]) -> Self {
        Self {
            registers: widths.map(Register::new),
        }
    }

    pub fn get(&self, code: u8) -> Result<&Register, EmulatorError> {
        self.registers
            .get(code as usize)
            .ok_or(EmulatorError::UnknownRegister { code })
    }

    pub fn get_mut(&mut self, code: u8) -> Result<&mut Register, EmulatorError> {
        self.registers
            .get_mut(code as usize)
            .ok_or(EmulatorError::UnknownRegister { code })
    }

    pub fn validate(&self, code: u8) -> Result<(), EmulatorError> {
        self.get(code).map(|_| ())
    }

    pub fn pc(&self) -> &Register {
        &self.registers[consts::R5 as usize]
    }

    pub fn pc_mut(&mut self) -> &mut Register {
        &mut self.registers[consts::R5 as usize]
    }

    pub fn base(&self) -> &Register {
        &self.registers[consts::R6 as usize]
    }

    pub fn base_mut(&mut self) -> &mut Register {
        &mut self.registers[consts::R6 as usize]
    }

    pub fn mbr(&self) -> &Register {
        &self.registers[consts::R4 as usize]
    }

    pub fn mbr_mut(&mut self) -> &mut Register {
        &mut self.registers[consts::R4 as usize]
    }

    pub fn link(&self) -> &Register {
        &self.registers[consts::R3 as usize]
    }

    pub fn link_mut(&mut self) -> &mut Register {
        &mut self.registers[consts::R3 as usize]
    }

    /// Captures every register's current value, for an interrupt's saved
    /// context. The MBR is included for symmetry even though it is purely
    /// decoder scratch; restoring it is harmless.
    pub fn snapshot(&self) -> [u32; REGISTER_COUNT] {
        let mut values = [0u32; REGISTER_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            *value = self.registers[i].get();
        }
        values
    }

    pub fn restore(&mut self, values: &[u32; REGISTER_COUNT]) {
        for (register, value) in self.registers.iter_mut().zip(values.iter()) {
            register.set(u64::from(*value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn set_then_get_is_value_modulo_width(value: u64) -> bool {
        let mut register = Register::new(2);
        register.set(value);
        register.get() as u64 == value % (1u64 << 16)
    }

    #[test]
    fn narrow_register_truncates_to_one_byte() {
        let mut register = Register::new(1);
        register.set(0x1FF);
        assert_eq!(register.get(), 0xFF);
    }

    #[test]
    fn unknown_register_code_is_rejected_by_both_accessors() {
        let file = RegisterFile::new([2; REGISTER_COUNT]);
        assert!(matches!(
            file.get(0x07),
            Err(EmulatorError::UnknownRegister { code: 0x07 })
        ));
    }

    #[test]
    fn snapshot_then_restore_round_trips_every_register() {
        let mut file = RegisterFile::new([2; REGISTER_COUNT]);
        for code in 0..REGISTER_COUNT as u8 {
            file.get_mut(code).unwrap().set(u64::from(code) * 11);
        }
        let snapshot = file.snapshot();

        for code in 0..REGISTER_COUNT as u8 {
            file.get_mut(code).unwrap().set(0);
        }
        file.restore(&snapshot);

        for code in 0..REGISTER_COUNT as u8 {
            assert_eq!(file.get(code).unwrap().get(), u32::from(code) * 11);
        }
    }
}
