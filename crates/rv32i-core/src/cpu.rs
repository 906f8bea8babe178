//! The fetch-decode-execute driver.

extern crate alloc;

use alloc::{format, string::String, vec::Vec};

use rv32i_asm::{disassemble_instruction, Gpr};

use crate::{
    decoder::decode_instruction,
    error::EmulatorError,
    executor::{execute_instruction, Halt},
    logging::{InstructionLog, LogLevel},
    memory::Memory,
    registers::Registers,
};

/// Default ceiling on executed instructions before `run()` gives up.
const DEFAULT_MAX_INSTRUCTIONS: u64 = 100_000;

/// Entries kept in the rolling execution log.
const LOG_BUFFER_LIMIT: usize = 100;

/// Result of a single step.
#[derive(Debug, Clone)]
pub enum StepResult {
    /// Normal step completed, continue execution.
    Continue,
    /// ECALL encountered; call information captured from a7/a0-a6.
    EnvironmentCall(EnvironmentCallInfo),
    /// EBREAK encountered, execution halted.
    Breakpoint,
}

/// Information captured when the program executes ECALL.
#[derive(Debug, Clone)]
pub struct EnvironmentCallInfo {
    /// Call number (from the a7 register).
    pub number: i32,
    /// Call arguments (from a0-a6).
    pub args: [i32; 7],
}

/// A single-hart RV32I/Zicsr interpreter.
///
/// Owns its memory and register file for its whole lifetime; decoding is
/// the pure function [`decode_instruction`](crate::decode_instruction).
pub struct Cpu {
    registers: Registers,
    memory: Memory,
    program_len: usize,
    instruction_count: u64,
    max_instructions: u64,
    log_level: LogLevel,
    log_buffer: Vec<InstructionLog>,
}

impl Cpu {
    /// Create a CPU over the given memory and register file.
    pub fn new(memory: Memory, registers: Registers) -> Self {
        Self {
            registers,
            memory,
            program_len: 0,
            instruction_count: 0,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
            log_level: LogLevel::None,
            log_buffer: Vec::new(),
        }
    }

    /// Set the maximum number of instructions to execute.
    pub fn with_max_instructions(mut self, limit: u64) -> Self {
        self.max_instructions = limit;
        self
    }

    /// Set the logging level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Place a program image at address 0.
    pub fn load_program(&mut self, image: &[u8]) -> Result<(), EmulatorError> {
        self.memory.write_bytes(0, image)?;
        self.program_len = image.len();
        Ok(())
    }

    /// Zero the register file and the execution counters and logs.
    ///
    /// Memory contents are host policy; call [`Memory::reset`] through
    /// [`Cpu::memory_mut`] to clear them too.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.instruction_count = 0;
        self.log_buffer.clear();
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> Result<StepResult, EmulatorError> {
        if self.instruction_count >= self.max_instructions {
            return Err(EmulatorError::InstructionLimitExceeded {
                limit: self.max_instructions,
                executed: self.instruction_count,
                pc: self.registers.pc(),
                regs: self.registers.snapshot(),
            });
        }

        let pc = self.registers.pc();

        // Fetch
        let inst_word = self
            .memory
            .fetch_instruction(pc)
            .map_err(|e| e.with_cpu_context(pc, self.registers.snapshot()))?;

        // Decode
        let decoded =
            decode_instruction(inst_word).map_err(|reason| EmulatorError::InvalidInstruction {
                pc,
                instruction: inst_word,
                reason,
                regs: self.registers.snapshot(),
            })?;

        self.instruction_count += 1;

        // Execute
        let result = execute_instruction(decoded, &mut self.registers, &mut self.memory)?;

        // The driver owns the +4; control transfers own the PC.
        match result.new_pc {
            Some(target) => self.registers.set_pc(target),
            None => self.registers.increment_pc(),
        }

        self.record_log(result.log, inst_word);

        match result.halt {
            Some(Halt::EnvironmentCall) => {
                Ok(StepResult::EnvironmentCall(self.environment_call_info()))
            }
            Some(Halt::Breakpoint) => Ok(StepResult::Breakpoint),
            None => Ok(StepResult::Continue),
        }
    }

    /// Run until EBREAK is encountered, returning the value in a0.
    pub fn run_until_breakpoint(&mut self) -> Result<i32, EmulatorError> {
        loop {
            match self.step()? {
                StepResult::Breakpoint => {
                    return Ok(self.registers.gpr(Gpr::A0));
                }
                StepResult::Continue => {}
                StepResult::EnvironmentCall(_) => {
                    return Err(EmulatorError::InvalidInstruction {
                        pc: self.registers.pc(),
                        instruction: 0,
                        reason: String::from("Unexpected ECALL in run_until_breakpoint"),
                        regs: self.registers.snapshot(),
                    });
                }
            }
        }
    }

    /// Run until ECALL is encountered, returning the call information.
    pub fn run_until_environment_call(&mut self) -> Result<EnvironmentCallInfo, EmulatorError> {
        loop {
            match self.step()? {
                StepResult::EnvironmentCall(info) => {
                    return Ok(info);
                }
                StepResult::Continue => {}
                StepResult::Breakpoint => {
                    return Err(EmulatorError::InvalidInstruction {
                        pc: self.registers.pc(),
                        instruction: 0,
                        reason: String::from("Unexpected EBREAK in run_until_environment_call"),
                        regs: self.registers.snapshot(),
                    });
                }
            }
        }
    }

    /// Run until any halt condition, returning it.
    pub fn run(&mut self) -> Result<StepResult, EmulatorError> {
        loop {
            match self.step()? {
                StepResult::Continue => {}
                halt => return Ok(halt),
            }
        }
    }

    fn environment_call_info(&self) -> EnvironmentCallInfo {
        EnvironmentCallInfo {
            number: self.registers.gpr(Gpr::A7),
            args: [
                self.registers.gpr(Gpr::A0),
                self.registers.gpr(Gpr::A1),
                self.registers.gpr(Gpr::A2),
                self.registers.gpr(Gpr::A3),
                self.registers.gpr(Gpr::A4),
                self.registers.gpr(Gpr::A5),
                self.registers.gpr(Gpr::A6),
            ],
        }
    }

    /// Get a reference to the register file.
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Get a mutable reference to the register file (for initialization).
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// Get a reference to the memory (for inspection).
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Get a mutable reference to the memory (for initialization).
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Get the number of instructions executed so far.
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    /// Get captured log entries.
    pub fn logs(&self) -> &[InstructionLog] {
        &self.log_buffer
    }

    /// Clear captured log entries.
    pub fn clear_logs(&mut self) {
        self.log_buffer.clear();
    }

    /// Format all captured logs as a string.
    pub fn format_logs(&self) -> String {
        let verbose = self.log_level == LogLevel::Verbose;
        let mut result = String::new();
        for log in &self.log_buffer {
            result.push_str(&log.format(verbose));
            result.push('\n');
        }
        result
    }

    /// Stamp and buffer a log entry according to the current log level.
    fn record_log(&mut self, mut log: InstructionLog, inst_word: u32) {
        match self.log_level {
            LogLevel::None | LogLevel::Errors => {}
            LogLevel::Instructions | LogLevel::Verbose => {
                log.cycle = self.instruction_count;
                log.instruction = inst_word;
                log.disassembly = disassemble_instruction(inst_word);
                // Rolling buffer: drop the oldest entry once full.
                if self.log_buffer.len() >= LOG_BUFFER_LIMIT {
                    self.log_buffer.remove(0);
                }
                self.log_buffer.push(log);
            }
        }
    }

    /// Dump the current emulator state as a human-readable string.
    pub fn dump_state(&self) -> String {
        let mut result = String::new();
        result.push_str(&format!("PC: 0x{:08x}\n", self.registers.pc()));
        result.push_str(&format!(
            "Instructions executed: {}\n",
            self.instruction_count
        ));

        result.push_str("\nRegisters:\n");
        for num in 0..32 {
            let reg = Gpr::new(num);
            let value = self.registers.gpr(reg);
            if value != 0 || num == 0 {
                result.push_str(&format!(
                    "  {} (x{}) = 0x{:08x} ({})\n",
                    reg.name(),
                    num,
                    value as u32,
                    value
                ));
            }
        }

        let mut csr_header = false;
        for address in 0..rv32i_asm::CSR_COUNT as u16 {
            let value = self.registers.csr(address);
            if value != 0 {
                if !csr_header {
                    result.push_str("\nCSRs:\n");
                    csr_header = true;
                }
                result.push_str(&format!(
                    "  0x{:03x} = 0x{:08x} ({})\n",
                    address, value as u32, value
                ));
            }
        }

        result
    }

    /// Format debug information: program disassembly plus recent logs.
    ///
    /// # Arguments
    ///
    /// * `highlight_pc` - Optional PC to highlight in the disassembly
    /// * `log_count` - Number of recent log entries to include
    pub fn format_debug_info(&self, highlight_pc: Option<u32>, log_count: usize) -> String {
        let mut result = String::new();
        let code = &self.memory.data()[..self.program_len];

        // Disassemble the loaded program image.
        let mut instructions = Vec::new();
        for offset in (0..code.len()).step_by(4) {
            if offset + 4 <= code.len() {
                let inst_word = u32::from_le_bytes([
                    code[offset],
                    code[offset + 1],
                    code[offset + 2],
                    code[offset + 3],
                ]);
                instructions.push((offset as u32, disassemble_instruction(inst_word)));
            }
        }

        if !instructions.is_empty() {
            result.push_str("Disassembly:\n");

            // Long programs get a window around the interesting PC.
            let (start, end) = if instructions.len() > 50 {
                let focus_pc = highlight_pc.unwrap_or(self.registers.pc());
                let focus_idx = instructions
                    .iter()
                    .position(|(pc, _)| *pc == focus_pc)
                    .unwrap_or(instructions.len() - 1);
                (
                    focus_idx.saturating_sub(10),
                    (focus_idx + 11).min(instructions.len()),
                )
            } else {
                (0, instructions.len())
            };

            if start > 0 {
                result.push_str("  ...\n");
            }
            for (pc, disasm) in &instructions[start..end] {
                let marker = if highlight_pc == Some(*pc) {
                    ">>> "
                } else {
                    "    "
                };
                result.push_str(&format!("{}0x{:08x}: {}\n", marker, pc, disasm));
            }
            if end < instructions.len() {
                result.push_str("  ...\n");
            }
        }

        if !self.log_buffer.is_empty() {
            result.push_str("\nLast execution logs:\n");
            let start = self.log_buffer.len().saturating_sub(log_count);
            for log in &self.log_buffer[start..] {
                result.push_str(&log.format(false));
                result.push('\n');
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use rv32i_asm as asm;

    fn cpu_with_words(words: &[u32]) -> Cpu {
        let mut image = Vec::new();
        for word in words {
            image.extend_from_slice(&word.to_le_bytes());
        }
        let mut cpu = Cpu::new(Memory::new(1024), Registers::new());
        cpu.load_program(&image).unwrap();
        cpu
    }

    #[test]
    fn test_step_advances_pc() {
        let mut cpu = cpu_with_words(&[asm::addi(Gpr::A0, Gpr::ZERO, 1)]);
        assert!(matches!(cpu.step(), Ok(StepResult::Continue)));
        assert_eq!(cpu.registers().pc(), 4);
        assert_eq!(cpu.registers().gpr(Gpr::A0), 1);
        assert_eq!(cpu.instruction_count(), 1);
    }

    #[test]
    fn test_control_transfer_owns_pc() {
        let mut cpu = cpu_with_words(&[asm::jal(Gpr::RA, 16)]);
        cpu.step().unwrap();
        assert_eq!(cpu.registers().pc(), 16);
        assert_eq!(cpu.registers().gpr(Gpr::RA), 4);
    }

    #[test]
    fn test_illegal_instruction_fault() {
        let mut cpu = cpu_with_words(&[0xffff_ffff]);
        let err = cpu.step().unwrap_err();
        match err {
            EmulatorError::InvalidInstruction {
                pc, instruction, ..
            } => {
                assert_eq!(pc, 0);
                assert_eq!(instruction, 0xffff_ffff);
            }
            other => panic!("Expected InvalidInstruction, got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_past_end_fault() {
        // An empty program leaves memory zeroed; jump past the end first.
        let mut cpu = Cpu::new(Memory::new(8), Registers::new());
        cpu.registers_mut().set_pc(8);
        let err = cpu.step().unwrap_err();
        match err {
            EmulatorError::InvalidMemoryAccess { address, pc, .. } => {
                assert_eq!(address, 8);
                assert_eq!(pc, 8);
            }
            other => panic!("Expected InvalidMemoryAccess, got {:?}", other),
        }
    }

    #[test]
    fn test_instruction_limit() {
        // An infinite loop: jal zero, 0.
        let mut cpu = cpu_with_words(&[asm::jal(Gpr::ZERO, 0)]).with_max_instructions(10);
        let err = cpu.run().unwrap_err();
        assert!(matches!(
            err,
            EmulatorError::InstructionLimitExceeded {
                limit: 10,
                executed: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut cpu = cpu_with_words(&[asm::addi(Gpr::A0, Gpr::ZERO, 5)]);
        cpu.step().unwrap();
        cpu.reset();
        assert_eq!(cpu.registers().pc(), 0);
        assert_eq!(cpu.registers().gpr(Gpr::A0), 0);
        assert_eq!(cpu.instruction_count(), 0);
        // Reset is idempotent.
        cpu.reset();
        assert_eq!(cpu.registers().pc(), 0);
    }

    #[test]
    fn test_environment_call_info() {
        let mut cpu = cpu_with_words(&[
            asm::addi(Gpr::A7, Gpr::ZERO, 93),
            asm::addi(Gpr::A0, Gpr::ZERO, 7),
            asm::ecall(),
        ]);
        let info = cpu.run_until_environment_call().unwrap();
        assert_eq!(info.number, 93);
        assert_eq!(info.args[0], 7);
        // ECALL is not a control transfer; the driver advanced past it.
        assert_eq!(cpu.registers().pc(), 12);
    }

    #[test]
    fn test_log_buffer_rolls_over() {
        let words = vec![asm::jal(Gpr::ZERO, 0)];
        let mut cpu = cpu_with_words(&words)
            .with_max_instructions(LOG_BUFFER_LIMIT as u64 + 50)
            .with_log_level(LogLevel::Instructions);
        let _ = cpu.run();
        assert_eq!(cpu.logs().len(), LOG_BUFFER_LIMIT);
        assert!(cpu.format_logs().contains("jal zero, 0"));
    }

    #[test]
    fn test_dump_state_mentions_nonzero_registers() {
        let mut cpu = cpu_with_words(&[asm::addi(Gpr::T0, Gpr::ZERO, 99)]);
        cpu.step().unwrap();
        let dump = cpu.dump_state();
        assert!(dump.contains("t0"));
        assert!(dump.contains("99"));
    }
}
