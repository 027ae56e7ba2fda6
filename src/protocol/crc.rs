//! CRC-16/MODBUS
//!
//! Table-driven, reflected polynomial 0xA001, initial value 0xFFFF.

const POLY: u16 = 0xA001;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Incremental CRC-16/MODBUS state
#[derive(Debug, Clone, Copy)]
pub struct Crc16 {
    reg: u16,
}

impl Crc16 {
    pub fn new() -> Self {
        Self { reg: 0xFFFF }
    }

    /// Fold more bytes into the checksum
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let index = ((self.reg ^ byte as u16) & 0xFF) as usize;
            self.reg = (self.reg >> 8) ^ TABLE[index];
        }
    }

    pub fn finish(&self) -> u16 {
        self.reg
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC-16/MODBUS of `data`
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.finish()
}
