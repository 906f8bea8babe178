//! Flat little-endian memory.

extern crate alloc;

use alloc::{vec, vec::Vec};

use crate::error::{EmulatorError, MemoryAccessKind};

/// Byte-addressable memory of fixed size.
///
/// Every multi-byte access is assembled bytewise in little-endian order;
/// accesses need not be naturally aligned. The only failure is an access
/// that does not fit wholly within the buffer.
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a zeroed memory of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Size of the memory in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Zero the entire buffer.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    fn offset(
        &self,
        address: u32,
        size: usize,
        kind: MemoryAccessKind,
    ) -> Result<usize, EmulatorError> {
        // u64 arithmetic so address + size cannot wrap.
        if (address as u64) + (size as u64) > self.data.len() as u64 {
            return Err(EmulatorError::InvalidMemoryAccess {
                address,
                size,
                kind,
                // Placeholder context, filled in by the CPU layer.
                pc: 0,
                regs: [0; 32],
            });
        }
        Ok(address as usize)
    }

    /// Read the 32-bit instruction word at `address`.
    pub fn fetch_instruction(&self, address: u32) -> Result<u32, EmulatorError> {
        let o = self.offset(address, 4, MemoryAccessKind::InstructionFetch)?;
        Ok(u32::from_le_bytes([
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ]))
    }

    /// Load a 32-bit word.
    pub fn load_word(&self, address: u32) -> Result<i32, EmulatorError> {
        let o = self.offset(address, 4, MemoryAccessKind::Read)?;
        Ok(i32::from_le_bytes([
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ]))
    }

    /// Store a 32-bit word.
    pub fn store_word(&mut self, address: u32, value: i32) -> Result<(), EmulatorError> {
        let o = self.offset(address, 4, MemoryAccessKind::Write)?;
        self.data[o..o + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Load a halfword, sign-extended to 32 bits.
    pub fn load_half(&self, address: u32) -> Result<i32, EmulatorError> {
        let o = self.offset(address, 2, MemoryAccessKind::Read)?;
        Ok(i16::from_le_bytes([self.data[o], self.data[o + 1]]) as i32)
    }

    /// Load a halfword, zero-extended to 32 bits.
    pub fn load_half_unsigned(&self, address: u32) -> Result<i32, EmulatorError> {
        let o = self.offset(address, 2, MemoryAccessKind::Read)?;
        Ok(u16::from_le_bytes([self.data[o], self.data[o + 1]]) as i32)
    }

    /// Store a halfword.
    pub fn store_half(&mut self, address: u32, value: i16) -> Result<(), EmulatorError> {
        let o = self.offset(address, 2, MemoryAccessKind::Write)?;
        self.data[o..o + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Load a byte, sign-extended to 32 bits.
    pub fn load_byte(&self, address: u32) -> Result<i32, EmulatorError> {
        let o = self.offset(address, 1, MemoryAccessKind::Read)?;
        Ok(self.data[o] as i8 as i32)
    }

    /// Load a byte, zero-extended to 32 bits.
    pub fn load_byte_unsigned(&self, address: u32) -> Result<i32, EmulatorError> {
        let o = self.offset(address, 1, MemoryAccessKind::Read)?;
        Ok(self.data[o] as i32)
    }

    /// Store a byte.
    pub fn store_byte(&mut self, address: u32, value: i8) -> Result<(), EmulatorError> {
        let o = self.offset(address, 1, MemoryAccessKind::Write)?;
        self.data[o] = value as u8;
        Ok(())
    }

    /// Copy `bytes` into memory starting at `address`.
    ///
    /// This is how a host places a program image before the first step.
    pub fn write_bytes(&mut self, address: u32, bytes: &[u8]) -> Result<(), EmulatorError> {
        let o = self.offset(address, bytes.len(), MemoryAccessKind::Write)?;
        self.data[o..o + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Get a view of the whole buffer (for inspection).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable view of the whole buffer (for initialization).
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_round_trip() {
        let mut mem = Memory::new(64);
        mem.store_word(12, -559038737).unwrap();
        assert_eq!(mem.load_word(12).unwrap(), -559038737);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut mem = Memory::new(64);
        mem.store_word(0, 0x1234_5678).unwrap();
        assert_eq!(mem.load_byte_unsigned(0).unwrap(), 0x78);
        assert_eq!(mem.load_byte_unsigned(1).unwrap(), 0x56);
        assert_eq!(mem.load_byte_unsigned(2).unwrap(), 0x34);
        assert_eq!(mem.load_byte_unsigned(3).unwrap(), 0x12);
        assert_eq!(mem.load_half_unsigned(0).unwrap(), 0x5678);
        assert_eq!(mem.load_half_unsigned(2).unwrap(), 0x1234);
    }

    #[test]
    fn test_sign_extension() {
        let mut mem = Memory::new(64);
        mem.store_byte(0, -128).unwrap();
        assert_eq!(mem.load_byte(0).unwrap(), -128);
        assert_eq!(mem.load_byte_unsigned(0).unwrap(), 128);

        mem.store_half(2, -2).unwrap();
        assert_eq!(mem.load_half(2).unwrap(), -2);
        assert_eq!(mem.load_half_unsigned(2).unwrap(), 0xfffe);
    }

    #[test]
    fn test_misaligned_access() {
        let mut mem = Memory::new(64);
        mem.store_word(1, 0x0102_0304).unwrap();
        assert_eq!(mem.load_word(1).unwrap(), 0x0102_0304);
        assert_eq!(mem.load_half(3).unwrap(), 0x0102);
    }

    #[test]
    fn test_out_of_bounds() {
        let mem = Memory::new(16);
        assert!(matches!(
            mem.load_word(13),
            Err(EmulatorError::InvalidMemoryAccess {
                address: 13,
                size: 4,
                kind: MemoryAccessKind::Read,
                ..
            })
        ));
        assert!(mem.load_byte(16).is_err());
        assert!(mem.load_half(15).is_err());
        assert!(mem.fetch_instruction(u32::MAX).is_err());
    }

    #[test]
    fn test_boundary_access_succeeds() {
        let mut mem = Memory::new(16);
        mem.store_word(12, 7).unwrap();
        assert_eq!(mem.load_word(12).unwrap(), 7);
        mem.store_byte(15, 1).unwrap();
        assert_eq!(mem.load_byte(15).unwrap(), 1);
    }

    #[test]
    fn test_reset_zeroes() {
        let mut mem = Memory::new(32);
        mem.store_word(0, -1).unwrap();
        mem.reset();
        assert_eq!(mem.load_word(0).unwrap(), 0);
        // Reset is idempotent.
        mem.reset();
        assert_eq!(mem.load_word(0).unwrap(), 0);
    }

    #[test]
    fn test_write_bytes() {
        let mut mem = Memory::new(8);
        mem.write_bytes(2, &[1, 2, 3]).unwrap();
        assert_eq!(mem.load_byte(2).unwrap(), 1);
        assert_eq!(mem.load_byte(4).unwrap(), 3);
        assert!(mem.write_bytes(6, &[0; 4]).is_err());
    }
}
