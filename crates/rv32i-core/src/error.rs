//! Error types for the emulator.

extern crate alloc;

use alloc::string::String;

/// Kind of memory access that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccessKind {
    Read,
    Write,
    InstructionFetch,
}

impl core::fmt::Display for MemoryAccessKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            MemoryAccessKind::Read => "load",
            MemoryAccessKind::Write => "store",
            MemoryAccessKind::InstructionFetch => "fetch",
        })
    }
}

/// Faults that terminate a step.
///
/// Architectural halts (environment call, breakpoint) are not errors; they
/// are reported through `StepResult`. Every fault carries the PC it was
/// raised at and a snapshot of the register file for diagnostics.
#[derive(Debug, Clone)]
pub enum EmulatorError {
    /// Instruction ceiling reached before the program halted.
    InstructionLimitExceeded {
        limit: u64,
        executed: u64,
        pc: u32,
        regs: [i32; 32],
    },
    /// Load, store or fetch outside the memory bounds.
    InvalidMemoryAccess {
        address: u32,
        size: usize,
        kind: MemoryAccessKind,
        pc: u32,
        regs: [i32; 32],
    },
    /// The instruction word does not decode to a supported operation.
    InvalidInstruction {
        pc: u32,
        instruction: u32,
        reason: String,
        regs: [i32; 32],
    },
}

impl EmulatorError {
    /// Get the PC where the fault was raised.
    pub fn pc(&self) -> u32 {
        match self {
            EmulatorError::InstructionLimitExceeded { pc, .. } => *pc,
            EmulatorError::InvalidMemoryAccess { pc, .. } => *pc,
            EmulatorError::InvalidInstruction { pc, .. } => *pc,
        }
    }

    /// Get the register snapshot taken when the fault was raised.
    pub fn regs(&self) -> &[i32; 32] {
        match self {
            EmulatorError::InstructionLimitExceeded { regs, .. } => regs,
            EmulatorError::InvalidMemoryAccess { regs, .. } => regs,
            EmulatorError::InvalidInstruction { regs, .. } => regs,
        }
    }

    /// Patch in the faulting PC and register snapshot.
    ///
    /// Memory constructs its errors with placeholder context; the layer
    /// that knows the CPU state fills it in before propagating.
    pub(crate) fn with_cpu_context(mut self, pc: u32, regs: [i32; 32]) -> Self {
        if let EmulatorError::InvalidMemoryAccess {
            pc: err_pc,
            regs: err_regs,
            ..
        } = &mut self
        {
            *err_pc = pc;
            *err_regs = regs;
        }
        self
    }
}

impl core::fmt::Display for EmulatorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Per-variant description, then the faulting PC once for all of
        // them.
        match self {
            EmulatorError::InstructionLimitExceeded {
                limit, executed, ..
            } => {
                write!(f, "no halt after {} instructions (ceiling {})", executed, limit)?;
            }
            EmulatorError::InvalidMemoryAccess {
                address,
                size,
                kind,
                ..
            } => {
                write!(
                    f,
                    "{} of {} byte(s) outside memory at {:#010x}",
                    kind, size, address
                )?;
            }
            EmulatorError::InvalidInstruction {
                instruction,
                reason,
                ..
            } => {
                write!(f, "illegal instruction {:#010x}: {}", instruction, reason)?;
            }
        }
        write!(f, " [pc {:#010x}]", self.pc())
    }
}
