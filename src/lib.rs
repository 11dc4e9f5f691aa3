//! A small 16-bit-style register machine emulator: a register file and zero
//! flag, a variable-length instruction decoder, an ALU, branch-with-link
//! control flow, blocking memory-mapped I/O, and an asynchronous interrupt
//! controller that accepts externally-delivered `LOAD`/`RUN` commands over a
//! TCP socket and re-enters the processor with a saved register context.

pub mod alu;
pub mod consts;
pub mod control_unit;
pub mod cpu;
pub mod error;
pub mod flag;
pub mod instruction_unit;
pub mod interrupt;
pub mod io_controller;
pub mod memory;
pub mod memory_controller;
pub mod opcode;
pub mod operand;
pub mod register;
pub mod state;

pub mod prelude {
    pub use crate::consts::{R0, R1, R2, R3, R4, R5, R6};
    pub use crate::cpu::{Cpu, CpuConfig};
    pub use crate::error::EmulatorError;
    pub use crate::flag::Flag;
    pub use crate::interrupt::{CpuContext, Interrupt, COMMAND_LOAD, COMMAND_RUN};
    pub use crate::memory::Ram;
    pub use crate::opcode::Opcode;
    pub use crate::operand::Operand;
    pub use crate::register::{Register, RegisterFile};
    pub use crate::state::ExecuteState;
}
