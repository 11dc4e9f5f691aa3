//! ADD/SUB/MUL/DIV/MOD/AND/ORR/XOR/NOT/LSL/LSR/CMP.
//!
//! Every binary op follows the same shape: read both sources as unsigned
//! values, compute the op on a wide signed accumulator (so a `SUB`
//! underflow is visible as a genuinely negative number rather than wrapping
//! silently), assign `Z` from that untruncated result, then truncate into
//! the destination register's width.

use crate::cpu::Cpu;
use crate::error::EmulatorError;
use crate::operand::Operand;

impl Cpu {
    fn apply_binary<F>(
        &mut self,
        dest: u8,
        a: u8,
        b: Operand,
        op: F,
    ) -> Result<(), EmulatorError>
    where
        F: FnOnce(i64, i64) -> Result<i64, EmulatorError>,
    {
        let lhs = i64::from(self.registers.get(a)?.get());
        let rhs = i64::from(b.resolve(&self.registers)?);
        let result = op(lhs, rhs)?;
        self.flag.set_is_zero(result);
        self.registers.get_mut(dest)?.set(result as u64);
        Ok(())
    }

    pub fn add(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| Ok(x + y))
    }

    pub fn sub(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| Ok(x - y))
    }

    pub fn mul(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| Ok(x * y))
    }

    pub fn div(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| {
            if y == 0 {
                Err(EmulatorError::ArithmeticError)
            } else {
                Ok(x / y)
            }
        })
    }

    pub fn modulo(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| {
            if y == 0 {
                Err(EmulatorError::ArithmeticError)
            } else {
                Ok(x % y)
            }
        })
    }

    pub fn and(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| Ok(x & y))
    }

    pub fn orr(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| Ok(x | y))
    }

    pub fn xor(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| Ok(x ^ y))
    }

    /// Shift amounts of 64 or more are valid encoded input (the shift source
    /// is a 16-bit value or a register) but overflow a native `i64` shift, so
    /// this truncates to 0 the same way the arbitrary-precision original
    /// does, rather than panicking in debug or masking the shift amount in
    /// release.
    pub fn lsl(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| {
            Ok(u32::try_from(y)
                .ok()
                .and_then(|y| x.checked_shl(y))
                .unwrap_or(0))
        })
    }

    pub fn lsr(&mut self, dest: u8, a: u8, b: Operand) -> Result<(), EmulatorError> {
        self.apply_binary(dest, a, b, |x, y| {
            Ok(u32::try_from(y)
                .ok()
                .and_then(|y| x.checked_shr(y))
                .unwrap_or(0))
        })
    }

    pub fn not(&mut self, dest: u8, operand: Operand) -> Result<(), EmulatorError> {
        let value = i64::from(operand.resolve(&self.registers)?);
        let result = !value;
        self.flag.set_is_zero(result);
        self.registers.get_mut(dest)?.set(result as u64);
        Ok(())
    }

    pub fn cmp(&mut self, a: u8, b: Operand) -> Result<(), EmulatorError> {
        let lhs = i64::from(self.registers.get(a)?.get());
        let rhs = i64::from(b.resolve(&self.registers)?);
        self.flag.set_is_zero(lhs - rhs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{Cpu, CpuConfig};
    use crate::consts::{R0, R1, R2};

    fn cpu() -> Cpu {
        Cpu::new(CpuConfig::default())
    }

    #[test]
    fn add_sets_destination_and_clears_zero() {
        let mut cpu = cpu();
        cpu.registers.get_mut(R0).unwrap().set(2);
        cpu.registers.get_mut(R1).unwrap().set(3);
        cpu.add(R2, R0, Operand::Register(R1)).unwrap();
        assert_eq!(cpu.registers.get(R2).unwrap().get(), 5);
        assert!(!cpu.flag.is_set());
    }

    #[test]
    fn sub_underflow_wraps_but_zero_flag_reflects_true_result() {
        let mut cpu = cpu();
        cpu.registers.get_mut(R0).unwrap().set(3);
        cpu.sub(R2, R0, Operand::Value(7)).unwrap();
        assert!(!cpu.flag.is_set());
        assert_eq!(cpu.registers.get(R2).unwrap().get(), 0x10000 - 4);
    }

    #[test]
    fn div_by_zero_is_arithmetic_error_and_does_not_mutate_state() {
        let mut cpu = cpu();
        cpu.registers.get_mut(R0).unwrap().set(10);
        cpu.registers.get_mut(R2).unwrap().set(0);
        let before_flag = cpu.flag.is_set();
        let before_dest = cpu.registers.get(R1).unwrap().get();
        let err = cpu.div(R1, R0, Operand::Register(R2)).unwrap_err();
        assert_eq!(err, EmulatorError::ArithmeticError);
        assert_eq!(cpu.flag.is_set(), before_flag);
        assert_eq!(cpu.registers.get(R1).unwrap().get(), before_dest);
    }

    #[test]
    fn cmp_sets_zero_without_writing_a_destination() {
        let mut cpu = cpu();
        cpu.registers.get_mut(R0).unwrap().set(9);
        cpu.registers.get_mut(R1).unwrap().set(9);
        cpu.cmp(R0, Operand::Register(R1)).unwrap();
        assert!(cpu.flag.is_set());
    }

    #[test]
    fn lsl_by_64_or_more_truncates_to_zero_instead_of_panicking() {
        let mut cpu = cpu();
        cpu.registers.get_mut(R0).unwrap().set(0xFFFF);
        cpu.lsl(R2, R0, Operand::Value(64)).unwrap();
        assert_eq!(cpu.registers.get(R2).unwrap().get(), 0);
        assert!(cpu.flag.is_set());
    }

    #[test]
    fn lsr_by_64_or_more_truncates_to_zero_instead_of_panicking() {
        let mut cpu = cpu();
        cpu.registers.get_mut(R0).unwrap().set(0xFFFF);
        cpu.lsr(R2, R0, Operand::Value(9000)).unwrap();
        assert_eq!(cpu.registers.get(R2).unwrap().get(), 0);
        assert!(cpu.flag.is_set());
    }
}
