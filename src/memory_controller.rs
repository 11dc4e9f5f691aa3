//! LDR/STR.

use crate::cpu::Cpu;
use crate::error::EmulatorError;
use crate::operand::Operand;

impl Cpu {
    /// Reads `width(dest)` bytes from Ram at the resolved address into `dest`.
    pub fn ldr(&mut self, dest: u8, address: Operand) -> Result<(), EmulatorError> {
        let address = address.resolve(&self.registers)? as usize;
        let width = self.registers.get(dest)?.width();
        let value = self.ram.get(address, width)?;
        self.registers.get_mut(dest)?.set(value);
        Ok(())
    }

    /// Writes `src.get()` at the resolved address using Ram's variable-width
    /// integer serialization.
    pub fn str(&mut self, src: u8, address: Operand) -> Result<(), EmulatorError> {
        let address = address.resolve(&self.registers)? as usize;
        let value = u64::from(self.registers.get(src)?.get());
        self.ram.set_value(address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{R0, R1};
    use crate::cpu::{Cpu, CpuConfig};

    fn cpu() -> Cpu {
        Cpu::new(CpuConfig::default())
    }

    #[test]
    fn str_then_ldr_round_trips_a_value() {
        let mut cpu = cpu();
        cpu.registers.get_mut(R0).unwrap().set(0x1234);
        cpu.str(R0, Operand::Value(0x40)).unwrap();
        cpu.ldr(R1, Operand::Value(0x40)).unwrap();
        assert_eq!(cpu.registers.get(R1).unwrap().get(), 0x1234);
    }

    #[test]
    fn ldr_out_of_bounds_address_fails() {
        let mut cpu = cpu();
        let err = cpu.ldr(R0, Operand::Value(0xFFFF)).unwrap_err();
        assert!(matches!(err, EmulatorError::OutOfBounds { .. }));
    }
}
