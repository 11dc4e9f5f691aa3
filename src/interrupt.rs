//! The asynchronous half of the machine: a TCP listener that turns wire
//! messages into [`Interrupt`] records, a synchronized queue the processor
//! drains between instructions, and the context stack `RUN`/`IRET` use to
//! nest one program inside another.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::consts::{MIN_LOAD_ADDRESS, REGISTER_COUNT};
use crate::cpu::Cpu;
use crate::error::EmulatorError;
use crate::state::ExecuteState;

/// Up to 1024 bytes of UTF-8 text, per connection, per the wire protocol.
const MAX_MESSAGE_BYTES: usize = 1024;

/// One decoded interrupt: a command, a target address, and trailing
/// argument bytes (only meaningful for `LOAD`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupt {
    pub command: u8,
    pub address: u8,
    pub arguments: Vec<u8>,
}

pub const COMMAND_LOAD: u8 = 0x00;
pub const COMMAND_RUN: u8 = 0x01;

/// A full register snapshot, saved on `RUN` and restored on `IRET`.
pub type CpuContext = [u32; REGISTER_COUNT];

/// Shared state between the listener task (producer) and the processor task
/// (consumer): the pending-interrupt queue, the `has_interrupt` hint, and
/// the context stack. The context stack is only ever touched by the
/// processor task in practice, but it lives behind the same synchronization
/// boundary as the queue since both are logically part of "what the
/// processor and the listener coordinate over."
#[derive(Debug, Default)]
pub struct InterruptState {
    queue: Mutex<std::collections::VecDeque<Interrupt>>,
    has_interrupt: AtomicBool,
    contexts: Mutex<Vec<CpuContext>>,
}

impl InterruptState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn has_pending(&self) -> bool {
        self.has_interrupt.load(Ordering::Acquire)
    }

    pub fn enqueue(&self, interrupt: Interrupt) {
        let mut queue = self.queue.lock().expect("interrupt queue poisoned");
        queue.push_back(interrupt);
        self.has_interrupt.store(true, Ordering::Release);
    }

    /// Pops the head of the queue. Only ever called right after
    /// [`InterruptState::has_pending`] returned true from the single
    /// consumer task, so an empty queue here is a logic error, not a
    /// recoverable condition (mirrors the original's unguarded
    /// `list.pop(0)`).
    pub fn dequeue(&self) -> Interrupt {
        let mut queue = self.queue.lock().expect("interrupt queue poisoned");
        let interrupt = queue
            .pop_front()
            .expect("dequeue called with no pending interrupt");
        if queue.is_empty() {
            self.has_interrupt.store(false, Ordering::Release);
        }
        interrupt
    }

    pub fn push_context(&self, context: CpuContext) {
        self.contexts
            .lock()
            .expect("context stack poisoned")
            .push(context);
    }

    pub fn pop_context(&self) -> CpuContext {
        self.contexts
            .lock()
            .expect("context stack poisoned")
            .pop()
            .expect("IRET executed with no saved context")
    }
}

/// Parses one wire message into an [`Interrupt`], or logs and returns `None`
/// if any token is unparseable or missing. Tokens are whitespace-separated
/// and parsed with automatic base detection (`0x`, `0o`, `0b`, decimal).
pub fn parse_message(text: &str) -> Option<Interrupt> {
    let mut tokens = text.split_ascii_whitespace();

    let command = match tokens.next() {
        Some(token) => parse_token(token)
            .inspect_err(|error| tracing::error!(token, %error, "malformed interrupt command"))
            .ok()?,
        None => {
            tracing::error!("empty interrupt message");
            return None;
        }
    };
    let address = match tokens.next() {
        Some(token) => parse_token(token)
            .inspect_err(|error| tracing::error!(token, %error, "malformed interrupt address"))
            .ok()?,
        None => {
            tracing::error!("interrupt message missing an address");
            return None;
        }
    };

    if command == u64::from(COMMAND_LOAD) && address < u64::from(MIN_LOAD_ADDRESS) {
        tracing::warn!(address, "LOAD address below {MIN_LOAD_ADDRESS:#04x}, enqueuing anyway");
    }

    let mut arguments = Vec::new();
    for token in tokens {
        match parse_token(token) {
            Ok(value) => arguments.push(value as u8),
            Err(error) => {
                tracing::error!(token, %error, "malformed interrupt argument");
                return None;
            }
        }
    }

    Some(Interrupt {
        command: command as u8,
        address: address as u8,
        arguments,
    })
}

fn parse_token(token: &str) -> Result<u64, std::num::ParseIntError> {
    if let Some(digits) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u64::from_str_radix(digits, 16)
    } else if let Some(digits) = token.strip_prefix("0o").or_else(|| token.strip_prefix("0O")) {
        u64::from_str_radix(digits, 8)
    } else if let Some(digits) = token.strip_prefix("0b").or_else(|| token.strip_prefix("0B")) {
        u64::from_str_radix(digits, 2)
    } else {
        token.parse::<u64>()
    }
}

/// Binds a TCP listener and, for each connection, reads up to
/// [`MAX_MESSAGE_BYTES`], parses it, and enqueues the result. Runs until the
/// listener fails to bind or accept; the caller treats that as fatal to the
/// listener task only, not to the processor.
pub(crate) async fn listen(
    state: Arc<InterruptState>,
    addr: impl ToSocketAddrs,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("interrupt listener bound, waiting for instructions");
    loop {
        let (mut socket, _) = listener.accept().await?;
        let mut buf = [0u8; MAX_MESSAGE_BYTES];
        let read = match socket.read(&mut buf).await {
            Ok(read) => read,
            Err(error) => {
                tracing::error!(%error, "interrupt connection read failed");
                continue;
            }
        };
        let text = match std::str::from_utf8(&buf[..read]) {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(%error, "interrupt message was not valid utf-8");
                continue;
            }
        };
        if let Some(interrupt) = parse_message(text) {
            state.enqueue(interrupt);
        }
    }
}

/// Resolves the default listener address into anything
/// [`tokio::net::TcpListener::bind`] accepts, validating it eagerly so a
/// bad config string fails at construction rather than deep inside a
/// spawned task. `tokio::net::ToSocketAddrs` is sealed and has no callable
/// method outside tokio's own bind/connect paths, so this goes through the
/// blocking std trait instead; resolving a hostname like "localhost" does a
/// real (synchronous) DNS lookup either way.
pub(crate) fn validate_listener_addr(addr: &str) -> std::io::Result<()> {
    std::net::ToSocketAddrs::to_socket_addrs(addr).map(|_| ())
}

impl Cpu {
    pub fn has_pending_interrupt(&self) -> bool {
        self.interrupts.has_pending()
    }

    /// Executes exactly one pending interrupt: `LOAD` copies bytes into Ram
    /// directly, `RUN` saves the current context and recurses into a nested
    /// `run_until_return` activation (so a `HLT` inside it restarts at 0
    /// in place instead of leaking back out, see that method's doc),
    /// anything else is logged and ignored.
    pub fn dispatch_next_interrupt(&mut self) {
        let interrupt = self.interrupts.dequeue();
        match interrupt.command {
            COMMAND_LOAD => {
                if let Err(error) = self
                    .ram
                    .set(interrupt.address as usize, &interrupt.arguments)
                {
                    tracing::error!(%error, "LOAD interrupt failed");
                }
            }
            COMMAND_RUN => {
                self.save_context();
                self.run_until_return(u32::from(interrupt.address));
            }
            other => tracing::warn!(command = other, "unknown interrupt command, ignoring"),
        }
    }

    fn save_context(&mut self) {
        self.interrupts.push_context(self.registers.snapshot());
    }

    /// `IRET`: restores the most recently saved context and signals the
    /// control loop to unwind one level.
    pub fn iret(&mut self) -> Result<ExecuteState, EmulatorError> {
        let context = self.interrupts.pop_context();
        self.registers.restore(&context);
        Ok(ExecuteState::Return)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_octal_binary_and_decimal_tokens() {
        let interrupt = parse_message("0x00 0x20 0o17 0b101 42").unwrap();
        assert_eq!(interrupt.command, 0x00);
        assert_eq!(interrupt.address, 0x20);
        assert_eq!(interrupt.arguments, vec![0o17, 0b101, 42]);
    }

    #[test]
    fn rejects_message_missing_address() {
        assert!(parse_message("0x01").is_none());
    }

    #[test]
    fn rejects_unparseable_token() {
        assert!(parse_message("0x01 not-a-number").is_none());
    }

    #[test]
    fn load_below_minimum_address_still_enqueues() {
        let interrupt = parse_message("0x00 0x01").unwrap();
        assert_eq!(interrupt.address, 0x01);
    }

    #[test]
    fn queue_flips_has_interrupt_on_drain() {
        let state = InterruptState::new();
        assert!(!state.has_pending());
        state.enqueue(Interrupt {
            command: COMMAND_RUN,
            address: 0x20,
            arguments: Vec::new(),
        });
        assert!(state.has_pending());
        let _ = state.dequeue();
        assert!(!state.has_pending());
    }

    #[test]
    fn context_stack_is_stack_balanced() {
        let state = InterruptState::new();
        state.push_context([1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(state.pop_context(), [1, 2, 3, 4, 5, 6, 7]);
    }
}
