//! Per-instruction execution logging.

extern crate alloc;

use alloc::{format, string::String, vec::Vec};

use rv32i_asm::Gpr;

/// Logging verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// No logging.
    None,
    /// Only log errors.
    Errors,
    /// Log each instruction execution.
    Instructions,
    /// Full verbose logging with register and memory state.
    Verbose,
}

/// Log entry for a single instruction execution.
#[derive(Debug, Clone)]
pub struct InstructionLog {
    pub cycle: u64,
    pub pc: u32,
    pub instruction: u32,
    pub disassembly: String,
    pub regs_read: Vec<(Gpr, i32)>,
    /// (reg, old_value, new_value)
    pub regs_written: Vec<(Gpr, i32, i32)>,
    /// (address, value)
    pub memory_reads: Vec<(u32, i32)>,
    /// (address, value)
    pub memory_writes: Vec<(u32, i32)>,
    /// (csr, old_value, new_value)
    pub csr_writes: Vec<(u16, i32, i32)>,
    /// (old_pc, new_pc)
    pub pc_change: Option<(u32, u32)>,
}

impl InstructionLog {
    /// Create a new empty log entry for the instruction at `pc`.
    pub fn new(pc: u32) -> Self {
        Self {
            cycle: 0,
            pc,
            instruction: 0,
            disassembly: String::new(),
            regs_read: Vec::new(),
            regs_written: Vec::new(),
            memory_reads: Vec::new(),
            memory_writes: Vec::new(),
            csr_writes: Vec::new(),
            pc_change: None,
        }
    }

    /// Format the log entry as a string.
    ///
    /// The non-verbose form is a single disassembly line; the verbose form
    /// appends one indented section per kind of recorded traffic.
    pub fn format(&self, verbose: bool) -> String {
        let mut out = format!("{:6} 0x{:08x}: {}", self.cycle, self.pc, self.disassembly);
        if !verbose {
            return out;
        }
        out.push('\n');

        section(
            &mut out,
            "reg in",
            self.regs_read
                .iter()
                .map(|(reg, value)| format!("{}={}", reg.name(), value)),
        );
        section(
            &mut out,
            "reg out",
            self.regs_written
                .iter()
                .map(|(reg, old, new)| format!("{}: {} -> {}", reg.name(), old, new)),
        );
        section(
            &mut out,
            "mem in",
            self.memory_reads
                .iter()
                .map(|(address, value)| format!("[{:#010x}]={}", address, value)),
        );
        section(
            &mut out,
            "mem out",
            self.memory_writes
                .iter()
                .map(|(address, value)| format!("[{:#010x}]={}", address, value)),
        );
        section(
            &mut out,
            "csr out",
            self.csr_writes
                .iter()
                .map(|(csr, old, new)| format!("{:#05x}: {} -> {}", csr, old, new)),
        );
        section(
            &mut out,
            "pc",
            self.pc_change
                .iter()
                .map(|(from, to)| format!("{:#010x} -> {:#010x}", from, to)),
        );

        out
    }
}

/// Append one labelled, comma-separated section; empty sections are
/// omitted entirely.
fn section(out: &mut String, label: &str, entries: impl Iterator<Item = String>) {
    let mut first = true;
    for entry in entries {
        if first {
            out.push_str("    ");
            out.push_str(label);
            out.push_str(": ");
            first = false;
        } else {
            out.push_str(", ");
        }
        out.push_str(&entry);
    }
    if !first {
        out.push('\n');
    }
}

impl core::fmt::Display for InstructionLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_verbose_is_one_line() {
        let mut log = InstructionLog::new(0x10);
        log.disassembly = String::from("addi a0, zero, 1");
        log.regs_written.push((Gpr::A0, 0, 1));
        let text = log.format(false);
        assert!(text.contains("0x00000010: addi a0, zero, 1"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_verbose_sections_appear_only_when_populated() {
        let mut log = InstructionLog::new(0);
        log.regs_read.push((Gpr::A1, 7));
        log.regs_read.push((Gpr::A2, 8));
        log.csr_writes.push((0x305, 0, 0x55));
        let text = log.format(true);
        assert!(text.contains("reg in: a1=7, a2=8"));
        assert!(text.contains("csr out: 0x305: 0 -> 85"));
        assert!(!text.contains("mem in"));
        assert!(!text.contains("pc:"));
    }

    #[test]
    fn test_verbose_pc_change() {
        let mut log = InstructionLog::new(8);
        log.pc_change = Some((8, 0x40));
        let text = log.format(true);
        assert!(text.contains("pc: 0x00000008 -> 0x00000040"));
    }
}
