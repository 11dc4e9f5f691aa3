//! NOP/HLT/MOV/B/BL/BEQ/BNE/BX.

use crate::cpu::Cpu;
use crate::error::EmulatorError;
use crate::operand::Operand;

impl Cpu {
    pub fn nop(&self) {}

    pub fn mov(&mut self, dest: u8, source: Operand) -> Result<(), EmulatorError> {
        let value = source.resolve(&self.registers)?;
        self.registers.get_mut(dest)?.set(u64::from(value));
        Ok(())
    }

    /// Writes `address + R6` into R5. Branch targets are always
    /// program-relative so a loaded image still jumps correctly regardless
    /// of where it was placed in RAM.
    pub fn b(&mut self, address: Operand) -> Result<(), EmulatorError> {
        let target = address.resolve(&self.registers)?;
        let base = self.registers.base().get();
        self.registers.pc_mut().set(u64::from(target + base));
        Ok(())
    }

    /// Captures the return address (R5, already advanced past this
    /// instruction by the decoder) into R3, then performs the same jump as
    /// [`Cpu::b`].
    pub fn bl(&mut self, address: Operand) -> Result<(), EmulatorError> {
        let return_address = self.registers.pc().get();
        self.registers.link_mut().set(u64::from(return_address));
        self.b(address)
    }

    pub fn beq(&mut self, address: Operand) -> Result<(), EmulatorError> {
        if self.flag.is_set() {
            self.b(address)?;
        }
        Ok(())
    }

    pub fn bne(&mut self, address: Operand) -> Result<(), EmulatorError> {
        if !self.flag.is_set() {
            self.b(address)?;
        }
        Ok(())
    }

    /// Returns from a subroutine: R5 <- R3, with no base addition (R3 holds
    /// an absolute address already).
    pub fn bx(&mut self) {
        let return_address = self.registers.link().get();
        self.registers.pc_mut().set(u64::from(return_address));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::R0;
    use crate::cpu::{Cpu, CpuConfig};

    fn cpu() -> Cpu {
        Cpu::new(CpuConfig::default())
    }

    #[test]
    fn bl_captures_return_address_then_jumps_with_base() {
        let mut cpu = cpu();
        cpu.registers.base_mut().set(0x100);
        cpu.registers.pc_mut().set(0x105);
        cpu.bl(Operand::Value(0x10)).unwrap();
        assert_eq!(cpu.registers.link().get(), 0x105);
        assert_eq!(cpu.registers.pc().get(), 0x110);
    }

    #[test]
    fn bx_returns_without_adding_base() {
        let mut cpu = cpu();
        cpu.registers.base_mut().set(0x100);
        cpu.registers.link_mut().set(0x42);
        cpu.bx();
        assert_eq!(cpu.registers.pc().get(), 0x42);
    }

    #[test]
    fn beq_falls_through_when_flag_clear() {
        let mut cpu = cpu();
        cpu.registers.pc_mut().set(0x10);
        cpu.flag.set_is_zero(1);
        cpu.beq(Operand::Value(0x50)).unwrap();
        assert_eq!(cpu.registers.pc().get(), 0x10);
    }

    #[test]
    fn mov_writes_resolved_source() {
        let mut cpu = cpu();
        cpu.mov(R0, Operand::Value(0x2A)).unwrap();
        assert_eq!(cpu.registers.get(R0).unwrap().get(), 0x2A);
    }
}
