//! Header page encoding and decoding

use alloc::vec::Vec;

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, IntoBytes};

use super::record::{DescriptorV1, DescriptorV2, HeaderPrefix, HEADER_PREFIX_SIZE};
use super::{AssetDescriptor, FormatVersion, Role};
use crate::crc::crc16;
use crate::error::{Error, Result};
use crate::geometry::{pad_to_page, PAGE_SIZE};

/// Decoded contents of page 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    /// Format revision, identified by the signature
    pub format: FormatVersion,
    /// CRC16 over the serialized descriptor table
    pub descriptor_table_crc: u16,
    /// Descriptors in flash order
    pub descriptors: Vec<AssetDescriptor>,
}

impl ImageHeader {
    /// Create a header for `descriptors`, computing the table CRC
    pub(crate) fn new(format: FormatVersion, descriptors: Vec<AssetDescriptor>) -> Self {
        let descriptor_table_crc = crc16(&encode_table(format, &descriptors));
        Self {
            format,
            descriptor_table_crc,
            descriptors,
        }
    }

    /// Number of assets
    pub fn asset_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Serialized descriptor table (the bytes covered by the CRC)
    pub fn descriptor_table(&self) -> Vec<u8> {
        encode_table(self.format, &self.descriptors)
    }

    /// Encode the header as one filler-padded page
    pub fn to_page(&self) -> Vec<u8> {
        let prefix = HeaderPrefix {
            signature: *self.format.signature(),
            asset_count: self.descriptors.len() as u8,
            table_crc: U16::new(self.descriptor_table_crc),
        };

        let mut data = Vec::with_capacity(PAGE_SIZE);
        data.extend_from_slice(prefix.as_bytes());
        data.extend_from_slice(&self.descriptor_table());
        pad_to_page(&data)
    }

    /// Decode a header from the start of `data`
    ///
    /// The signature selects the format revision and the descriptor table
    /// CRC is verified.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (prefix, rest) = HeaderPrefix::read_from_prefix(data).map_err(|_| Error::Truncated)?;
        let format = FormatVersion::from_signature(&prefix.signature)
            .ok_or(Error::InvalidSignature(prefix.signature))?;

        let count = prefix.asset_count as usize;
        let table_len = count * format.descriptor_size();
        if HEADER_PREFIX_SIZE + table_len > PAGE_SIZE || rest.len() < table_len {
            return Err(Error::Truncated);
        }

        let table = &rest[..table_len];
        let expected = prefix.table_crc.get();
        let actual = crc16(table);
        if expected != actual {
            return Err(Error::DescriptorCrcMismatch { expected, actual });
        }

        let descriptors = table
            .chunks_exact(format.descriptor_size())
            .map(|rec| decode_descriptor(format, rec))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "image header: format {}, {} asset(s), table CRC 0x{:04X}",
            format,
            count,
            expected
        );

        Ok(Self {
            format,
            descriptor_table_crc: expected,
            descriptors,
        })
    }
}

fn encode_table(format: FormatVersion, descriptors: &[AssetDescriptor]) -> Vec<u8> {
    let mut table = Vec::with_capacity(descriptors.len() * format.descriptor_size());
    for d in descriptors {
        match format {
            FormatVersion::V1 => {
                let rec = DescriptorV1 {
                    role: d.role.code(),
                    weight: d.weight,
                    start_page: U16::new(d.start_page),
                    pages: U16::new(d.pages),
                    tail_length: U16::new(d.tail_length),
                };
                table.extend_from_slice(rec.as_bytes());
            }
            FormatVersion::V2 => {
                let rec = DescriptorV2 {
                    role: d.role.code(),
                    weight: d.weight,
                    repeat: d.repeat,
                    start_page: U16::new(d.start_page),
                    pages: U16::new(d.pages),
                    tail_length: U16::new(d.tail_length),
                };
                table.extend_from_slice(rec.as_bytes());
            }
        }
    }
    table
}

fn decode_descriptor(format: FormatVersion, rec: &[u8]) -> Result<AssetDescriptor> {
    let d = match format {
        FormatVersion::V1 => {
            let r = DescriptorV1::read_from_bytes(rec).map_err(|_| Error::Truncated)?;
            AssetDescriptor {
                role: Role::from(r.role),
                weight: r.weight,
                repeat: 1,
                start_page: r.start_page.get(),
                pages: r.pages.get(),
                tail_length: r.tail_length.get(),
            }
        }
        FormatVersion::V2 => {
            let r = DescriptorV2::read_from_bytes(rec).map_err(|_| Error::Truncated)?;
            AssetDescriptor {
                role: Role::from(r.role),
                weight: r.weight,
                repeat: r.repeat,
                start_page: r.start_page.get(),
                pages: r.pages.get(),
                tail_length: r.tail_length.get(),
            }
        }
    };
    Ok(d)
}
