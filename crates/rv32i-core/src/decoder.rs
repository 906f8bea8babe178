//! Instruction decoder.
//!
//! A pure function from a 32-bit instruction word to a typed operation.
//! It never touches registers or memory; the CPU maps a decode failure to
//! the illegal-instruction fault.

extern crate alloc;

use alloc::{format, string::String};

use rv32i_asm::Gpr;

/// Decoded instruction with pre-extracted operands.
///
/// Immediates are sign-extended to 32 bits; the upper-immediate forms
/// carry the value already placed in bits 31:12. Branch and jump offsets
/// include their implicit low zero bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // Upper-immediate
    Lui { rd: Gpr, imm: i32 },
    Auipc { rd: Gpr, imm: i32 },

    // Register-immediate
    Addi { rd: Gpr, rs1: Gpr, imm: i32 },
    Slti { rd: Gpr, rs1: Gpr, imm: i32 },
    Sltiu { rd: Gpr, rs1: Gpr, imm: i32 },
    Xori { rd: Gpr, rs1: Gpr, imm: i32 },
    Ori { rd: Gpr, rs1: Gpr, imm: i32 },
    Andi { rd: Gpr, rs1: Gpr, imm: i32 },
    Slli { rd: Gpr, rs1: Gpr, shamt: u8 },
    Srli { rd: Gpr, rs1: Gpr, shamt: u8 },
    Srai { rd: Gpr, rs1: Gpr, shamt: u8 },

    // Register-register
    Add { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Sub { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Sll { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Slt { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Sltu { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Xor { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Srl { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Sra { rd: Gpr, rs1: Gpr, rs2: Gpr },
    Or { rd: Gpr, rs1: Gpr, rs2: Gpr },
    And { rd: Gpr, rs1: Gpr, rs2: Gpr },

    // Loads
    Lb { rd: Gpr, rs1: Gpr, imm: i32 },
    Lh { rd: Gpr, rs1: Gpr, imm: i32 },
    Lw { rd: Gpr, rs1: Gpr, imm: i32 },
    Lbu { rd: Gpr, rs1: Gpr, imm: i32 },
    Lhu { rd: Gpr, rs1: Gpr, imm: i32 },

    // Stores
    Sb { rs1: Gpr, rs2: Gpr, imm: i32 },
    Sh { rs1: Gpr, rs2: Gpr, imm: i32 },
    Sw { rs1: Gpr, rs2: Gpr, imm: i32 },

    // Control transfer
    Beq { rs1: Gpr, rs2: Gpr, imm: i32 },
    Bne { rs1: Gpr, rs2: Gpr, imm: i32 },
    Blt { rs1: Gpr, rs2: Gpr, imm: i32 },
    Bge { rs1: Gpr, rs2: Gpr, imm: i32 },
    Bltu { rs1: Gpr, rs2: Gpr, imm: i32 },
    Bgeu { rs1: Gpr, rs2: Gpr, imm: i32 },
    Jal { rd: Gpr, imm: i32 },
    Jalr { rd: Gpr, rs1: Gpr, imm: i32 },

    // System and synchronization
    Fence,
    Ecall,
    Ebreak,

    // Zicsr
    Csrrw { rd: Gpr, csr: u16, rs1: Gpr },
    Csrrs { rd: Gpr, csr: u16, rs1: Gpr },
    Csrrc { rd: Gpr, csr: u16, rs1: Gpr },
    Csrrwi { rd: Gpr, csr: u16, zimm: u8 },
    Csrrsi { rd: Gpr, csr: u16, zimm: u8 },
    Csrrci { rd: Gpr, csr: u16, zimm: u8 },

    // RV64 add-immediate-word, recognized as a stub with no RV32 effect
    Addiw { rd: Gpr, rs1: Gpr, imm: i32 },
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Decode a 32-bit instruction word into a structured representation.
pub fn decode_instruction(inst: u32) -> Result<Instruction, String> {
    use Instruction::*;

    let opcode = inst & 0x7f;
    let rd = Gpr::new(((inst >> 7) & 0x1f) as u8);
    let funct3 = (inst >> 12) & 0x7;
    let rs1 = Gpr::new(((inst >> 15) & 0x1f) as u8);
    let rs2 = Gpr::new(((inst >> 20) & 0x1f) as u8);
    let funct7 = (inst >> 25) & 0x7f;

    // Immediates per encoding format. B and J reassemble their scattered
    // fields with the implicit low zero.
    let imm_i = sign_extend(inst >> 20, 12);
    let imm_s = sign_extend(((inst >> 25) << 5) | ((inst >> 7) & 0x1f), 12);
    let imm_b = sign_extend(
        (((inst >> 31) & 0x1) << 12)
            | (((inst >> 7) & 0x1) << 11)
            | (((inst >> 25) & 0x3f) << 5)
            | (((inst >> 8) & 0xf) << 1),
        13,
    );
    let imm_j = sign_extend(
        (((inst >> 31) & 0x1) << 20)
            | (((inst >> 12) & 0xff) << 12)
            | (((inst >> 20) & 0x1) << 11)
            | (((inst >> 21) & 0x3ff) << 1),
        21,
    );
    let imm_u = (inst & 0xffff_f000) as i32;

    match opcode {
        0x37 => Ok(Lui { rd, imm: imm_u }),
        0x17 => Ok(Auipc { rd, imm: imm_u }),
        0x6f => Ok(Jal { rd, imm: imm_j }),
        0x67 => match funct3 {
            0b000 => Ok(Jalr { rd, rs1, imm: imm_i }),
            _ => Err(format!("Unknown jalr instruction: funct3=0x{:x}", funct3)),
        },
        0x63 => match funct3 {
            0b000 => Ok(Beq { rs1, rs2, imm: imm_b }),
            0b001 => Ok(Bne { rs1, rs2, imm: imm_b }),
            0b100 => Ok(Blt { rs1, rs2, imm: imm_b }),
            0b101 => Ok(Bge { rs1, rs2, imm: imm_b }),
            0b110 => Ok(Bltu { rs1, rs2, imm: imm_b }),
            0b111 => Ok(Bgeu { rs1, rs2, imm: imm_b }),
            _ => Err(format!("Unknown branch instruction: funct3=0x{:x}", funct3)),
        },
        0x03 => match funct3 {
            0b000 => Ok(Lb { rd, rs1, imm: imm_i }),
            0b001 => Ok(Lh { rd, rs1, imm: imm_i }),
            0b010 => Ok(Lw { rd, rs1, imm: imm_i }),
            0b100 => Ok(Lbu { rd, rs1, imm: imm_i }),
            0b101 => Ok(Lhu { rd, rs1, imm: imm_i }),
            _ => Err(format!("Unknown load instruction: funct3=0x{:x}", funct3)),
        },
        0x23 => match funct3 {
            0b000 => Ok(Sb { rs1, rs2, imm: imm_s }),
            0b001 => Ok(Sh { rs1, rs2, imm: imm_s }),
            0b010 => Ok(Sw { rs1, rs2, imm: imm_s }),
            _ => Err(format!("Unknown store instruction: funct3=0x{:x}", funct3)),
        },
        0x13 => {
            // Shift amount lives in the low five immediate bits; immediate
            // bit 10 (instruction bit 30) picks SRAI over SRLI.
            let shamt = ((inst >> 20) & 0x1f) as u8;
            match funct3 {
                0b000 => Ok(Addi { rd, rs1, imm: imm_i }),
                0b001 => Ok(Slli { rd, rs1, shamt }),
                0b010 => Ok(Slti { rd, rs1, imm: imm_i }),
                0b011 => Ok(Sltiu { rd, rs1, imm: imm_i }),
                0b100 => Ok(Xori { rd, rs1, imm: imm_i }),
                0b101 => {
                    if (inst >> 30) & 0x1 == 1 {
                        Ok(Srai { rd, rs1, shamt })
                    } else {
                        Ok(Srli { rd, rs1, shamt })
                    }
                }
                0b110 => Ok(Ori { rd, rs1, imm: imm_i }),
                0b111 => Ok(Andi { rd, rs1, imm: imm_i }),
                _ => Err(format!(
                    "Unknown I-type arithmetic instruction: funct3=0x{:x}",
                    funct3
                )),
            }
        }
        0x33 => match (funct3, funct7) {
            (0b000, 0b0000000) => Ok(Add { rd, rs1, rs2 }),
            (0b000, 0b0100000) => Ok(Sub { rd, rs1, rs2 }),
            (0b001, 0b0000000) => Ok(Sll { rd, rs1, rs2 }),
            (0b010, 0b0000000) => Ok(Slt { rd, rs1, rs2 }),
            (0b011, 0b0000000) => Ok(Sltu { rd, rs1, rs2 }),
            (0b100, 0b0000000) => Ok(Xor { rd, rs1, rs2 }),
            (0b101, 0b0000000) => Ok(Srl { rd, rs1, rs2 }),
            (0b101, 0b0100000) => Ok(Sra { rd, rs1, rs2 }),
            (0b110, 0b0000000) => Ok(Or { rd, rs1, rs2 }),
            (0b111, 0b0000000) => Ok(And { rd, rs1, rs2 }),
            _ => Err(format!(
                "Unknown R-type instruction: funct3=0x{:x}, funct7=0x{:x}",
                funct3, funct7
            )),
        },
        0x73 => {
            let csr = ((inst >> 20) & 0xfff) as u16;
            let zimm = ((inst >> 15) & 0x1f) as u8;
            match funct3 {
                0b000 => match inst >> 20 {
                    0 => Ok(Ecall),
                    1 => Ok(Ebreak),
                    _ => Err(format!("Unknown system instruction: 0x{:08x}", inst)),
                },
                0b001 => Ok(Csrrw { rd, csr, rs1 }),
                0b010 => Ok(Csrrs { rd, csr, rs1 }),
                0b011 => Ok(Csrrc { rd, csr, rs1 }),
                0b101 => Ok(Csrrwi { rd, csr, zimm }),
                0b110 => Ok(Csrrsi { rd, csr, zimm }),
                0b111 => Ok(Csrrci { rd, csr, zimm }),
                _ => Err(format!("Unknown system instruction: funct3=0x{:x}", funct3)),
            }
        }
        0x0f => Ok(Fence),
        0x1b => match funct3 {
            0b000 => Ok(Addiw { rd, rs1, imm: imm_i }),
            _ => Err(format!(
                "Unknown OP-IMM-32 instruction: funct3=0x{:x}",
                funct3
            )),
        },
        _ => Err(format!("Unknown opcode: 0x{:02x}", opcode)),
    }
}
