//! RV32I/Zicsr functional emulator.
//!
//! A single-hart fetch-decode-execute interpreter over a flat
//! little-endian memory. The decoder is a pure function, instruction
//! semantics live in one match, and the CPU driver reports halts
//! (environment call, breakpoint) as step results and faults (illegal
//! instruction, out-of-range access) as errors.

#![no_std]

extern crate alloc;

mod cpu;
mod decoder;
mod error;
mod executor;
mod logging;
mod memory;
mod registers;

pub mod helpers;

pub use cpu::{Cpu, EnvironmentCallInfo, StepResult};
pub use decoder::{decode_instruction, Instruction};
pub use error::{EmulatorError, MemoryAccessKind};
pub use executor::{execute_instruction, ExecutionResult, Halt};
pub use logging::{InstructionLog, LogLevel};
pub use memory::Memory;
pub use registers::Registers;
