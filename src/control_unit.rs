//! The fetch/decode/execute loop and its variable-length operand decoder.
//!
//! Encoding (see spec): `[opcode][last_operand_type?][register operands...]
//! [last operand: register or 2-byte value]`. Every operand but the last is
//! always a register code; the last operand's shape is carried by
//! `last_operand_type_code`.

use crate::consts::{
    OPERAND_SIZE_REGISTER, OPERAND_SIZE_VALUE, OPERAND_TYPE_REGISTER, OPERAND_TYPE_VALUE,
};
use crate::cpu::Cpu;
use crate::error::EmulatorError;
use crate::opcode::Opcode;
use crate::operand::Operand;
use crate::state::ExecuteState;

impl Cpu {
    pub fn set_program_counter(&mut self, address: u32) {
        self.registers.pc_mut().set(u64::from(address));
    }

    /// Advances the program counter by one, fetches the byte it now points
    /// at into the memory byte register, and returns that byte.
    fn fetch_byte(&mut self) -> Result<u8, EmulatorError> {
        let address = self.registers.pc().get() as usize;
        let byte = self.ram.get(address, 1)? as u8;
        self.registers.mbr_mut().set(u64::from(byte));
        Ok(byte)
    }

    /// Advances the program counter by one register-operand width, fetches a
    /// byte, and validates it as a register code, returning the code itself
    /// (not a reference: the decoder runs under `&mut self` and handlers
    /// borrow registers fresh).
    fn decode_register_operand(&mut self) -> Result<u8, EmulatorError> {
        self.registers
            .pc_mut()
            .set(self.registers.pc().get() + OPERAND_SIZE_REGISTER as u64);
        let code = self.fetch_byte()?;
        self.registers.validate(code)?;
        Ok(code)
    }

    /// Advances the program counter by one and reads a `OPERAND_SIZE_VALUE`-
    /// byte little-endian value from the byte it now points at, without
    /// touching the memory byte register (values are wider than one byte and
    /// don't fit the MBR's role). The caller still owes a further
    /// `OPERAND_SIZE_VALUE`-byte advance to land on the following
    /// instruction.
    fn decode_value_operand(&mut self) -> Result<u16, EmulatorError> {
        self.registers.pc_mut().set(self.registers.pc().get() + 1);
        let address = self.registers.pc().get() as usize;
        let value = self.ram.get(address, OPERAND_SIZE_VALUE)?;
        Ok(value as u16)
    }

    /// Runs exactly one instruction: fetch the opcode, decode its operands
    /// per §4.9, dispatch to the owning handler, and return the signal it
    /// produced.
    pub fn clock(&mut self) -> Result<ExecuteState, EmulatorError> {
        let opcode_byte = self.fetch_byte()?;
        let opcode = Opcode::try_from(opcode_byte)?;
        let operand_count = opcode.operand_count();

        if operand_count == 0 {
            return self.dispatch(opcode, &[]);
        }

        self.registers.pc_mut().set(self.registers.pc().get() + 1);
        let type_code = self.fetch_byte()?;
        if type_code != OPERAND_TYPE_REGISTER && type_code != OPERAND_TYPE_VALUE {
            return Err(EmulatorError::UnknownOperandType { code: type_code });
        }

        let mut operands = Vec::with_capacity(operand_count);
        for _ in 0..operand_count - 1 {
            let code = self.decode_register_operand()?;
            operands.push(Operand::Register(code));
        }

        match type_code {
            OPERAND_TYPE_REGISTER => {
                let code = self.decode_register_operand()?;
                operands.push(Operand::Register(code));
                self.registers
                    .pc_mut()
                    .set(self.registers.pc().get() + OPERAND_SIZE_REGISTER as u64);
            }
            _ => {
                let value = self.decode_value_operand()?;
                operands.push(Operand::Value(value));
                self.registers
                    .pc_mut()
                    .set(self.registers.pc().get() + OPERAND_SIZE_VALUE as u64);
            }
        }

        self.dispatch(opcode, &operands)
    }

    fn dispatch(&mut self, opcode: Opcode, operands: &[Operand]) -> Result<ExecuteState, EmulatorError> {
        tracing::trace!(?opcode, ?operands, "dispatching instruction");
        match opcode {
            Opcode::Nop => {
                self.nop();
                Ok(ExecuteState::Proceed)
            }
            Opcode::Hlt => Ok(ExecuteState::Halt),
            Opcode::Mov => {
                self.mov(operands[0].expect_register(), operands[1])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Beq => {
                self.beq(operands[0])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Bne => {
                self.bne(operands[0])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::B => {
                self.b(operands[0])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Bl => {
                self.bl(operands[0])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Bx => {
                self.bx();
                Ok(ExecuteState::Proceed)
            }
            Opcode::Add => {
                self.add(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Sub => {
                self.sub(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Mul => {
                self.mul(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Div => {
                self.div(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Mod => {
                self.modulo(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::And => {
                self.and(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Orr => {
                self.orr(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Xor => {
                self.xor(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Not => {
                self.not(operands[0].expect_register(), operands[1])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Lsl => {
                self.lsl(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Lsr => {
                self.lsr(
                    operands[0].expect_register(),
                    operands[1].expect_register(),
                    operands[2],
                )?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Cmp => {
                self.cmp(operands[0].expect_register(), operands[1])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Ldr => {
                self.ldr(operands[0].expect_register(), operands[1])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Str => {
                self.str(operands[0].expect_register(), operands[1])?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Inp => {
                self.inp(operands[0].expect_register())?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Out => {
                self.out(operands[0].expect_register())?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Outc => {
                self.outc(operands[0].expect_register())?;
                Ok(ExecuteState::Proceed)
            }
            Opcode::Iret => self.iret(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{R0, R2};
    use crate::cpu::{Cpu, CpuConfig};

    fn cpu() -> Cpu {
        Cpu::new(CpuConfig::default())
    }

    #[test]
    fn zero_operand_instruction_leaves_pc_for_the_handler_to_move() {
        // Per spec.md §4.9 step 3, a zero-operand opcode is dispatched
        // immediately after the fetch with no decoder-driven PC advance;
        // branchy zero-operand instructions (BX, IRET) move PC themselves,
        // and HLT halts, so NOP is the only one that leaves PC untouched.
        let mut cpu = cpu();
        cpu.ram.set(0, &[0x00]).unwrap(); // NOP
        cpu.set_program_counter(0);
        let state = cpu.clock().unwrap();
        assert_eq!(state, ExecuteState::Proceed);
        assert_eq!(cpu.registers.pc().get(), 0);
    }

    #[test]
    fn mov_register_to_register_decodes_three_bytes() {
        let mut cpu = cpu();
        // MOV R2, R0  -> opcode, last_operand_type=register, op1=R2, op2=R0
        cpu.ram.set(0, &[0x02, 0x00, R2, R0]).unwrap();
        cpu.registers.get_mut(R0).unwrap().set(77);
        cpu.set_program_counter(0);
        cpu.clock().unwrap();
        assert_eq!(cpu.registers.get(R2).unwrap().get(), 77);
        assert_eq!(cpu.registers.pc().get(), 4);
    }

    #[test]
    fn mov_register_to_value_decodes_four_bytes() {
        let mut cpu = cpu();
        // MOV R0, 0x0102  -> opcode, last_operand_type=value, op1=R0, value LE
        cpu.ram.set(0, &[0x02, 0x01, R0, 0x02, 0x01]).unwrap();
        cpu.set_program_counter(0);
        cpu.clock().unwrap();
        assert_eq!(cpu.registers.get(R0).unwrap().get(), 0x0102);
        assert_eq!(cpu.registers.pc().get(), 5);
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let mut cpu = cpu();
        cpu.ram.set(0, &[0x19]).unwrap();
        cpu.set_program_counter(0);
        let err = cpu.clock().unwrap_err();
        assert_eq!(err, EmulatorError::UnknownOpcode { opcode: 0x19 });
    }

    #[test]
    fn unknown_register_code_is_rejected() {
        let mut cpu = cpu();
        cpu.ram.set(0, &[0x02, 0x00, 0x09, R0]).unwrap();
        cpu.set_program_counter(0);
        let err = cpu.clock().unwrap_err();
        assert_eq!(err, EmulatorError::UnknownRegister { code: 0x09 });
    }

    #[test]
    fn unknown_operand_type_is_rejected() {
        let mut cpu = cpu();
        cpu.ram.set(0, &[0x02, 0x02, R0, R0]).unwrap();
        cpu.set_program_counter(0);
        let err = cpu.clock().unwrap_err();
        assert_eq!(err, EmulatorError::UnknownOperandType { code: 0x02 });
    }
}
