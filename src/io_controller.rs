//! INP/OUT/OUTC. The only components that touch the outside world directly.

use std::io::{self, Write};

use crate::consts::R2;
use crate::cpu::Cpu;
use crate::error::EmulatorError;

impl Cpu {
    /// Blocks on a line of standard input. A line that parses as a decimal
    /// integer is used as-is; otherwise the raw bytes (the trimmed line,
    /// ASCII-encoded) are reassembled as a big-endian integer, so a single
    /// character lands as its ordinal.
    pub fn inp(&mut self, dest: u8) -> Result<(), EmulatorError> {
        let mut line = String::new();
        io::stdin()
            .read_line(&mut line)
            .expect("reading a line from standard input");
        let text = line.trim_end_matches(['\n', '\r']);
        let value: u64 = match text.parse::<i64>() {
            Ok(parsed) => parsed as u64,
            Err(_) => text
                .bytes()
                .fold(0u64, |acc, byte| (acc << 8) | u64::from(byte)),
        };
        self.registers.get_mut(dest)?.set(value);
        Ok(())
    }

    pub fn out(&mut self, src: u8) -> Result<(), EmulatorError> {
        let value = self.registers.get(src)?.get();
        self.registers.get_mut(R2)?.set(u64::from(value));
        println!("{value}");
        Ok(())
    }

    /// Writes the low byte of `src` as a character, without a trailing
    /// newline, and flushes immediately since the next write may not come
    /// for a while.
    pub fn outc(&mut self, src: u8) -> Result<(), EmulatorError> {
        let value = self.registers.get(src)?.get();
        self.registers.get_mut(R2)?.set(u64::from(value));
        print!("{}", (value as u8) as char);
        io::stdout().flush().expect("flushing standard output");
        Ok(())
    }
}
