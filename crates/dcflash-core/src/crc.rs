//! CRC16 used by the image header and the loader protocol
//!
//! The device firmware uses the classic table-driven reflected CRC16
//! (polynomial 0x8005, seed 0), which is CRC-16/ARC.

use ::crc::{Crc, CRC_16_ARC};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// Compute the CRC16 of `data`
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // CRC-16/ARC check value
        assert_eq!(crc16(b"123456789"), 0xBB3D);
    }

    #[test]
    fn test_empty() {
        assert_eq!(crc16(&[]), 0x0000);
    }

    #[test]
    fn test_single_byte_matches_table_step() {
        // (0 >> 8) ^ table[(0 ^ 0x01) & 0xff] == table[1] == 0xC0C1
        assert_eq!(crc16(&[0x01]), 0xC0C1);
    }
}
