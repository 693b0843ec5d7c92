use std::collections::HashMap;

/// Last valid byte address: the usable space is the low half of the
/// 32-bit range.
pub const ADDR_MAX: u32 = 0x7fff_ffff;

/// Sparse byte-addressable memory. Addresses never written read as zero.
/// Validity is a separate predicate: an out-of-range access is reported
/// by the caller, but the byte access itself still goes through the map.
#[derive(Debug, Default, Clone)]
pub struct Memory {
    bytes: HashMap<u32, u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, addr: u32) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    pub fn set(&mut self, addr: u32, value: u8) {
        self.bytes.insert(addr, value);
    }

    pub fn is_valid(&self, addr: u32) -> bool {
        addr <= ADDR_MAX
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Little-endian 32-bit word assembled from four independent byte
    /// reads, byte 0 the LSB.
    pub fn word(&self, addr: u32) -> u32 {
        u32::from_le_bytes([
            self.get(addr),
            self.get(addr.wrapping_add(1)),
            self.get(addr.wrapping_add(2)),
            self.get(addr.wrapping_add(3)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_bytes_read_zero() {
        let mem = Memory::new();
        assert_eq!(mem.get(0), 0);
        assert_eq!(mem.get(0x7fff_ffff), 0);
    }

    #[test]
    fn set_then_get() {
        let mut mem = Memory::new();
        mem.set(100, 0xAB);
        assert_eq!(mem.get(100), 0xAB);
        mem.clear();
        assert_eq!(mem.get(100), 0);
    }

    #[test]
    fn word_is_little_endian() {
        let mut mem = Memory::new();
        mem.set(8, 0x78);
        mem.set(9, 0x56);
        mem.set(10, 0x34);
        mem.set(11, 0x12);
        assert_eq!(mem.word(8), 0x1234_5678);
    }

    #[test]
    fn validity_covers_the_low_half_only() {
        let mem = Memory::new();
        assert!(mem.is_valid(0));
        assert!(mem.is_valid(0x7fff_ffff));
        assert!(!mem.is_valid(0x8000_0000));
        assert!(!mem.is_valid(u32::MAX));
    }
}
