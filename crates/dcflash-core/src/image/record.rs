//! On-flash binary records
//!
//! All multi-byte fields are little-endian and every record is unaligned,
//! so the structs below map byte-for-byte onto the header page.

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Fixed part of the header page: signature, asset count and table CRC
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct HeaderPrefix {
    pub signature: [u8; 4],
    pub asset_count: u8,
    pub table_crc: U16,
}

/// Descriptor record used by the v1 format
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct DescriptorV1 {
    pub role: u8,
    pub weight: u8,
    pub start_page: U16,
    pub pages: U16,
    pub tail_length: U16,
}

/// Descriptor record used by the v2 format (adds the repeat count)
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct DescriptorV2 {
    pub role: u8,
    pub weight: u8,
    pub repeat: u8,
    pub start_page: U16,
    pub pages: U16,
    pub tail_length: U16,
}

pub(crate) const HEADER_PREFIX_SIZE: usize = core::mem::size_of::<HeaderPrefix>();
pub(crate) const DESCRIPTOR_V1_SIZE: usize = core::mem::size_of::<DescriptorV1>();
pub(crate) const DESCRIPTOR_V2_SIZE: usize = core::mem::size_of::<DescriptorV2>();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(HEADER_PREFIX_SIZE, 7);
        assert_eq!(DESCRIPTOR_V1_SIZE, 8);
        assert_eq!(DESCRIPTOR_V2_SIZE, 9);
    }

    #[test]
    fn test_descriptor_v1_layout() {
        let rec = DescriptorV1 {
            role: 1,
            weight: 10,
            start_page: U16::new(0x0102),
            pages: U16::new(3),
            tail_length: U16::new(0x01F4),
        };
        assert_eq!(rec.as_bytes(), &[1, 10, 0x02, 0x01, 3, 0, 0xF4, 0x01]);
    }
}
