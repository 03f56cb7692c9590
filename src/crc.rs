//! CRC-8 checksum used to protect every 16-bit word exchanged with the device
//!
//! Copyright 2019 Ryan Kurte

use crate::device::{CRC_INIT, CRC_POLY, CRC_XOR};

/// Helper for device CRC-8 calculation
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC_INIT;

    // For each byte
    for v in data {
        // XOR with current byte
        crc ^= v;

        // For each bit (in -ve order, but, doesn't actually matter here)
        for _bit in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    // Apply final xor
    crc ^ CRC_XOR
}

/// Check data against a received CRC
pub fn crc8_check(data: &[u8], expected: u8) -> bool {
    crc8(data) == expected
}
