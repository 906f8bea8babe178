//! RV32I/Zicsr instruction disassembly.

use alloc::{format, string::String};

use crate::regs::Gpr;

/// Disassemble a single 32-bit instruction word.
///
/// Returns a human-readable string like "add a0, a1, a2" or "jal ra, 16".
/// Words that do not decode produce an "unknown ..." placeholder rather
/// than an error, so callers can dump arbitrary memory.
pub fn disassemble_instruction(inst: u32) -> String {
    let opcode = inst & 0x7f;
    let rd = ((inst >> 7) & 0x1f) as u8;
    let funct3 = (inst >> 12) & 0x7;
    let rs1 = ((inst >> 15) & 0x1f) as u8;
    let rs2 = ((inst >> 20) & 0x1f) as u8;
    let funct7 = (inst >> 25) & 0x7f;

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
    // Upper immediate, unshifted 20-bit field for display.
    let imm_u = inst >> 12;
    let shamt = rs2;
    let csr = (inst >> 20) & 0xfff;

    match opcode {
        0x37 => format!("lui {}, 0x{:05x}", gpr_name(rd), imm_u),
        0x17 => format!("auipc {}, 0x{:05x}", gpr_name(rd), imm_u),
        0x6f => format!("jal {}, {}", gpr_name(rd), imm_j),
        0x67 => match funct3 {
            0b000 => format!("jalr {}, {}({})", gpr_name(rd), imm_i, gpr_name(rs1)),
            _ => format!("unknown_jalr 0x{:08x}", inst),
        },
        0x63 => {
            let mnemonic = match funct3 {
                0b000 => "beq",
                0b001 => "bne",
                0b100 => "blt",
                0b101 => "bge",
                0b110 => "bltu",
                0b111 => "bgeu",
                _ => return format!("unknown_branch 0x{:08x}", inst),
            };
            format!("{} {}, {}, {}", mnemonic, gpr_name(rs1), gpr_name(rs2), imm_b)
        }
        0x03 => {
            let mnemonic = match funct3 {
                0b000 => "lb",
                0b001 => "lh",
                0b010 => "lw",
                0b100 => "lbu",
                0b101 => "lhu",
                _ => return format!("unknown_load 0x{:08x}", inst),
            };
            format!("{} {}, {}({})", mnemonic, gpr_name(rd), imm_i, gpr_name(rs1))
        }
        0x23 => {
            let mnemonic = match funct3 {
                0b000 => "sb",
                0b001 => "sh",
                0b010 => "sw",
                _ => return format!("unknown_store 0x{:08x}", inst),
            };
            format!("{} {}, {}({})", mnemonic, gpr_name(rs2), imm_s, gpr_name(rs1))
        }
        0x13 => match funct3 {
            0b000 => format!("addi {}, {}, {}", gpr_name(rd), gpr_name(rs1), imm_i),
            0b001 => format!("slli {}, {}, {}", gpr_name(rd), gpr_name(rs1), shamt),
            0b010 => format!("slti {}, {}, {}", gpr_name(rd), gpr_name(rs1), imm_i),
            0b011 => format!("sltiu {}, {}, {}", gpr_name(rd), gpr_name(rs1), imm_i),
            0b100 => format!("xori {}, {}, {}", gpr_name(rd), gpr_name(rs1), imm_i),
            0b101 => {
                let mnemonic = if (inst >> 30) & 0x1 == 1 { "srai" } else { "srli" };
                format!("{} {}, {}, {}", mnemonic, gpr_name(rd), gpr_name(rs1), shamt)
            }
            0b110 => format!("ori {}, {}, {}", gpr_name(rd), gpr_name(rs1), imm_i),
            0b111 => format!("andi {}, {}, {}", gpr_name(rd), gpr_name(rs1), imm_i),
            _ => format!("unknown_op_imm 0x{:08x}", inst),
        },
        0x33 => {
            let mnemonic = match (funct3, funct7) {
                (0b000, 0b0000000) => "add",
                (0b000, 0b0100000) => "sub",
                (0b001, 0b0000000) => "sll",
                (0b010, 0b0000000) => "slt",
                (0b011, 0b0000000) => "sltu",
                (0b100, 0b0000000) => "xor",
                (0b101, 0b0000000) => "srl",
                (0b101, 0b0100000) => "sra",
                (0b110, 0b0000000) => "or",
                (0b111, 0b0000000) => "and",
                _ => return format!("unknown_op 0x{:08x}", inst),
            };
            format!("{} {}, {}, {}", mnemonic, gpr_name(rd), gpr_name(rs1), gpr_name(rs2))
        }
        0x73 => match funct3 {
            0b000 => match inst >> 20 {
                0 => String::from("ecall"),
                1 => String::from("ebreak"),
                _ => format!("unknown_system 0x{:08x}", inst),
            },
            0b001 => format!("csrrw {}, 0x{:03x}, {}", gpr_name(rd), csr, gpr_name(rs1)),
            0b010 => format!("csrrs {}, 0x{:03x}, {}", gpr_name(rd), csr, gpr_name(rs1)),
            0b011 => format!("csrrc {}, 0x{:03x}, {}", gpr_name(rd), csr, gpr_name(rs1)),
            0b101 => format!("csrrwi {}, 0x{:03x}, {}", gpr_name(rd), csr, rs1),
            0b110 => format!("csrrsi {}, 0x{:03x}, {}", gpr_name(rd), csr, rs1),
            0b111 => format!("csrrci {}, 0x{:03x}, {}", gpr_name(rd), csr, rs1),
            _ => format!("unknown_system 0x{:08x}", inst),
        },
        0x0f => String::from("fence"),
        0x1b => match funct3 {
            0b000 => format!("addiw {}, {}, {}", gpr_name(rd), gpr_name(rs1), imm_i),
            _ => format!("unknown_op_imm_32 0x{:08x}", inst),
        },
        _ => format!("unknown 0x{:08x} (opcode=0x{:02x})", inst, opcode),
    }
}

/// Disassemble a code buffer containing RV32I instructions.
///
/// Returns a formatted string with one instruction per line, showing the
/// byte offset and the disassembled instruction.
pub fn disassemble_code(code: &[u8]) -> String {
    let mut result = String::new();
    let mut offset = 0;

    while offset + 4 <= code.len() {
        let inst = u32::from_le_bytes([
            code[offset],
            code[offset + 1],
            code[offset + 2],
            code[offset + 3],
        ]);
        result.push_str(&format!("0x{:04x}: {}\n", offset, disassemble_instruction(inst)));
        offset += 4;
    }

    if offset < code.len() {
        result.push_str(&format!("0x{:04x}: <incomplete instruction>\n", offset));
    }

    result
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

fn gpr_name(num: u8) -> &'static str {
    Gpr::new(num).name()
}
