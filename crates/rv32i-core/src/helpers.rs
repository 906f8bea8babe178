//! Helpers for running small programs in tests.
//!
//! Programs are built from the encode functions in `rv32i_asm` and loaded
//! at address 0; failures panic with the disassembly and the last
//! execution logs so a broken test reads like a crash report.

extern crate alloc;

use alloc::{format, string::String, vec::Vec};

use rv32i_asm::Gpr;

use crate::{
    cpu::Cpu, error::EmulatorError, logging::LogLevel, memory::Memory, registers::Registers,
};

/// Memory given to test CPUs unless a test asks for less.
pub const DEFAULT_MEMORY_SIZE: usize = 64 * 1024;

/// Assemble encoded instruction words into a little-endian image.
pub fn program_image(words: &[u32]) -> Vec<u8> {
    let mut image = Vec::with_capacity(words.len() * 4);
    for word in words {
        image.extend_from_slice(&word.to_le_bytes());
    }
    image
}

/// Build a CPU with the program loaded at address 0.
pub fn cpu_with_program(words: &[u32]) -> Cpu {
    cpu_with_program_and_memory(words, DEFAULT_MEMORY_SIZE)
}

/// Build a CPU with the program loaded at address 0 and the given memory size.
pub fn cpu_with_program_and_memory(words: &[u32], memory_size: usize) -> Cpu {
    let mut cpu =
        Cpu::new(Memory::new(memory_size), Registers::new()).with_log_level(LogLevel::Instructions);
    cpu.load_program(&program_image(words))
        .expect("program image does not fit in memory");
    cpu
}

/// Format a fault with disassembly and recent logs.
fn format_error(cpu: &Cpu, error: &EmulatorError) -> String {
    let mut result = String::new();
    result.push_str("=== Execution Error ===\n\n");
    result.push_str(&format!("Error: {}\n", error));
    result.push_str(&format!("PC: 0x{:08x}\n\n", error.pc()));
    result.push_str(&cpu.format_debug_info(Some(error.pc()), 10));
    result
}

/// Expect the program to run to EBREAK, returning the CPU for inspection.
pub fn expect_break(words: &[u32]) -> Cpu {
    let mut cpu = cpu_with_program(words);
    match cpu.run_until_breakpoint() {
        Ok(_) => cpu,
        Err(e) => panic!("{}", format_error(&cpu, &e)),
    }
}

/// Expect the program to run to EBREAK with `expected` in `reg`.
pub fn expect_register(words: &[u32], reg: Gpr, expected: i32) {
    let mut cpu = cpu_with_program(words);
    match cpu.run_until_breakpoint() {
        Ok(_) => {
            let actual = cpu.registers().gpr(reg);
            if actual != expected {
                panic!(
                    "Register {} mismatch: expected {}, got {}\n\n{}",
                    reg.name(),
                    expected,
                    actual,
                    cpu.format_debug_info(None, 10)
                );
            }
        }
        Err(e) => panic!("{}", format_error(&cpu, &e)),
    }
}

/// Expect the program to run to EBREAK with `expected` in a0.
pub fn expect_a0(words: &[u32], expected: i32) {
    expect_register(words, Gpr::A0, expected);
}

/// Expect the program to fault, with `check` accepting the error.
pub fn expect_error<F>(words: &[u32], check: F)
where
    F: FnOnce(&EmulatorError) -> bool,
{
    expect_error_with_memory(words, DEFAULT_MEMORY_SIZE, check)
}

/// Expect the program to fault, with a custom memory size.
pub fn expect_error_with_memory<F>(words: &[u32], memory_size: usize, check: F)
where
    F: FnOnce(&EmulatorError) -> bool,
{
    let mut cpu = cpu_with_program_and_memory(words, memory_size);
    match cpu.run_until_breakpoint() {
        Ok(_) => panic!(
            "Expected a fault but execution succeeded\n\n{}",
            cpu.format_debug_info(None, 10)
        ),
        Err(e) => {
            if !check(&e) {
                panic!("Fault check failed\n{}", format_error(&cpu, &e));
            }
        }
    }
}

/// Expect the program to fault with an InvalidMemoryAccess error.
pub fn expect_memory_error(words: &[u32]) {
    expect_memory_error_with_memory(words, 1024)
}

/// Expect the program to fault with an InvalidMemoryAccess error, with a
/// custom memory size.
pub fn expect_memory_error_with_memory(words: &[u32], memory_size: usize) {
    expect_error_with_memory(words, memory_size, |e| {
        matches!(e, EmulatorError::InvalidMemoryAccess { .. })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv32i_asm as asm;

    #[test]
    fn test_expect_a0_simple() {
        expect_a0(&[asm::addi(Gpr::A0, Gpr::ZERO, 42), asm::ebreak()], 42);
    }

    #[test]
    fn test_expect_a0_arithmetic() {
        expect_a0(
            &[
                asm::addi(Gpr::A0, Gpr::ZERO, 5),
                asm::addi(Gpr::A1, Gpr::ZERO, 10),
                asm::add(Gpr::A0, Gpr::A0, Gpr::A1),
                asm::ebreak(),
            ],
            15,
        );
    }

    #[test]
    fn test_expect_a0_memory() {
        expect_a0(
            &[
                asm::addi(Gpr::SP, Gpr::ZERO, 0x100),
                asm::addi(Gpr::A0, Gpr::ZERO, 42),
                asm::sw(Gpr::A0, Gpr::SP, 0),
                asm::lw(Gpr::A0, Gpr::SP, 0),
                asm::ebreak(),
            ],
            42,
        );
    }

    #[test]
    fn test_expect_register() {
        expect_register(
            &[asm::addi(Gpr::A1, Gpr::ZERO, 100), asm::ebreak()],
            Gpr::A1,
            100,
        );
    }

    #[test]
    fn test_expect_memory_error() {
        // 0x400 is past the end of a 1 KiB memory.
        expect_memory_error_with_memory(
            &[asm::lw(Gpr::A0, Gpr::ZERO, 0x400), asm::ebreak()],
            1024,
        );
    }

    #[test]
    fn test_expect_break() {
        let cpu = expect_break(&[asm::addi(Gpr::A0, Gpr::ZERO, 42), asm::ebreak()]);
        assert_eq!(cpu.registers().gpr(Gpr::A0), 42);
    }
}
