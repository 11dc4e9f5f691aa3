//! The `Cpu`: owns the Flag, Ram, and RegisterFile, wires up the five
//! dispatch components (implemented as `impl Cpu` blocks elsewhere in this
//! crate), and runs the outer boot/restart loop.

use std::sync::Arc;

use crate::consts::{
    DEFAULT_LISTENER_ADDR, DEFAULT_MEMORY_SIZE, DEFAULT_REGISTER_WIDTH, MBR_WIDTH, R4, R5, R6,
};
use crate::error::EmulatorError;
use crate::flag::Flag;
use crate::interrupt::{self, InterruptState};
use crate::memory::Ram;
use crate::register::RegisterFile;
use crate::state::ExecuteState;

/// Construction-time knobs, replacing the Python reference's long default
/// keyword-argument list (`memory_size_byte=1024`, ...) with a single
/// configuration value.
#[derive(Debug, Clone)]
pub struct CpuConfig {
    /// Size of `Ram`, in bytes.
    pub memory_size: usize,
    /// Widths, in bytes, of `R0`..`R6` in register-code order. The memory
    /// byte register's width (index `R4`) is architecturally fixed at 1;
    /// overriding it here is accepted but not a configuration this crate's
    /// own constructors ever exercise.
    pub register_widths: [usize; crate::consts::REGISTER_COUNT],
    /// Address the interrupt listener binds to.
    pub listener_addr: String,
}

impl Default for CpuConfig {
    fn default() -> Self {
        let mut widths = [DEFAULT_REGISTER_WIDTH; crate::consts::REGISTER_COUNT];
        widths[R4 as usize] = MBR_WIDTH;
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            register_widths: widths,
            listener_addr: DEFAULT_LISTENER_ADDR.to_string(),
        }
    }
}

/// The whole machine. Every component in spec.md §4 is a method on `Cpu`
/// (see `alu.rs`, `instruction_unit.rs`, `memory_controller.rs`,
/// `io_controller.rs`, `interrupt.rs`, `control_unit.rs`): one owner for
/// shared mutable state instead of aliased `&mut` handles passed between
/// separate component structs.
#[derive(Debug)]
pub struct Cpu {
    pub(crate) ram: Ram,
    pub(crate) registers: RegisterFile,
    pub(crate) flag: Flag,
    pub(crate) interrupts: Arc<InterruptState>,
    listener_addr: String,
}

impl Cpu {
    pub fn new(config: CpuConfig) -> Self {
        Self {
            ram: Ram::new(config.memory_size),
            registers: RegisterFile::new(config.register_widths),
            flag: Flag::new(),
            interrupts: InterruptState::new(),
            listener_addr: config.listener_addr,
        }
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Writes `bytes` verbatim into Ram at `address`. Used both for the
    /// initial boot image and, indirectly, for `LOAD` interrupts (see
    /// `interrupt.rs::dispatch_next_interrupt`).
    pub fn load_program(&mut self, address: usize, bytes: &[u8]) -> Result<(), EmulatorError> {
        self.ram.set(address, bytes)
    }

    /// Starts the background interrupt listener and enters the run loop at
    /// `address`. The listener address is validated eagerly so a bad
    /// configuration string fails here rather than deep inside a spawned
    /// task; binding itself happens asynchronously in the spawned task.
    pub async fn start(&mut self, address: u32) -> std::io::Result<()> {
        self.spawn_interrupt_listener()?;
        self.run(address);
        Ok(())
    }

    /// Spawns the background TCP listener without entering the run loop.
    ///
    /// `start` calls this itself; it is exposed separately so a caller can
    /// pre-load a boot image or drive the interrupt queue by hand (useful in
    /// tests that want the real socket path without the run loop's eternal
    /// spin between interrupts).
    pub fn spawn_interrupt_listener(&self) -> std::io::Result<()> {
        interrupt::validate_listener_addr(&self.listener_addr)?;
        let state = Arc::clone(&self.interrupts);
        let addr = self.listener_addr.clone();
        tokio::spawn(async move {
            if let Err(error) = interrupt::listen(state, addr).await {
                tracing::error!(%error, "interrupt listener terminated");
            }
        });
        Ok(())
    }

    /// The outer tail loop: runs `run_program_from(address)`, and whenever
    /// that activation reports `Halt`, restarts at address 0 (spec.md §4.10
    /// step 3). This is just `run_until_return` entered at the top level;
    /// see that method for why a nested `RUN`-dispatched activation shares
    /// the same restart behavior.
    pub fn run(&mut self, address: u32) {
        self.run_until_return(address);
    }

    /// Restarts at address 0 every time `run_program_from` reports `Halt`,
    /// until an activation reports `Return` (`IRET`). This replaces the
    /// original's unbounded recursive `run_CPU(0x00)` re-entry (spec.md §9
    /// REDESIGN FLAG) with a loop that never grows the native call stack
    /// across HLTs.
    ///
    /// `dispatch_next_interrupt` also enters here (not `run_program_from`
    /// directly) for a `RUN` interrupt: the original recurses into
    /// `__run_CPU(0x00)` on `HLT` regardless of nesting depth, so a program
    /// entered via `RUN` that halts instead of reaching `IRET` restarts at 0
    /// in place rather than unwinding back to the interrupted program. Its
    /// saved context is not popped — only `IRET` pops a context — matching
    /// the original, where a `HLT` inside a nested `__run_CPU` call never
    /// returns to the frame that called it either. This is the policy
    /// decision spec.md §4.10 leaves unspecified for the non-`IRET` exit of
    /// a `RUN` activation.
    pub(crate) fn run_until_return(&mut self, address: u32) {
        let mut entry = address;
        loop {
            match self.run_program_from(entry) {
                ExecuteState::Halt => {
                    tracing::info!("HLT: restarting at address 0x00");
                    entry = 0x00;
                }
                ExecuteState::Return => return,
                ExecuteState::Proceed => unreachable!("run_program_from never returns Proceed"),
            }
        }
    }

    /// One activation of the run loop: sets R5 and R6 to `address`, then
    /// ticks the control unit until it produces `Halt` or `Return`, draining
    /// one pending interrupt between ticks whenever one is queued.
    ///
    /// A decode or handler error terminates this activation exactly like
    /// `Halt` (spec.md §7): the error is logged and treated as the signal to
    /// restart at address 0, keeping the machine available for subsequent
    /// `LOAD`/`RUN` requests instead of propagating out to the caller.
    pub fn run_program_from(&mut self, address: u32) -> ExecuteState {
        self.registers.get_mut(R5).expect("R5 exists").set(u64::from(address));
        self.registers.get_mut(R6).expect("R6 exists").set(u64::from(address));
        loop {
            if self.has_pending_interrupt() {
                self.dispatch_next_interrupt();
                continue;
            }
            match self.clock() {
                Ok(ExecuteState::Proceed) => continue,
                Ok(signal) => return signal,
                Err(error) => {
                    tracing::error!(%error, "instruction failed, halting current activation");
                    return ExecuteState::Halt;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{R0, R2};

    fn cpu() -> Cpu {
        Cpu::new(CpuConfig::default())
    }

    #[test]
    fn load_program_writes_bytes_verbatim() {
        let mut cpu = cpu();
        cpu.load_program(0x10, &[0xAA, 0xBB]).unwrap();
        assert_eq!(cpu.ram.get(0x10, 2).unwrap(), 0xBBAA);
    }

    #[test]
    fn run_halts_and_restarts_at_zero() {
        // Program at 0x10: MOV R0, 42; HLT
        // Program at 0x00: MOV R2, 7; HLT (the "restart" program)
        let mut cpu = cpu();
        cpu.load_program(0x00, &[0x02, 0x01, R2, 0x07, 0x00, 0x01])
            .unwrap();
        // running from 0x10 with no program there would hit an unknown
        // opcode (ram is zero-initialized -> NOP, 0x00); use an explicit
        // HLT instead to keep this test about restart-at-0 semantics.
        cpu.load_program(0x10, &[0x01]).unwrap();

        // A direct call to run_program_from(0x10) returns Halt; run()
        // itself loops forever on Halt, so drive one activation manually
        // to observe the restart address chosen afterward.
        let signal = cpu.run_program_from(0x10);
        assert_eq!(signal, ExecuteState::Halt);

        let signal = cpu.run_program_from(0x00);
        assert_eq!(signal, ExecuteState::Halt);
        assert_eq!(cpu.registers.get(R2).unwrap().get(), 7);
    }
}
