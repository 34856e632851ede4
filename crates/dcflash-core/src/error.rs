//! Error types for dcflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Input errors
    /// Sample source is not mono 8-bit PCM
    UnsupportedSampleFormat {
        /// Channel count reported by the source
        channels: u16,
        /// Sample width in bits reported by the source
        bits: u16,
    },
    /// WAV container could not be parsed
    InvalidWav,

    // Build errors
    /// Descriptor table does not fit in the header page
    TooManyAssets {
        /// Number of assets requested
        count: usize,
        /// Maximum supported by the selected format
        max: usize,
    },
    /// Asset payload is too long to describe with 16-bit page fields
    AssetTooLarge {
        /// Index of the asset in declaration order
        index: usize,
        /// Payload length in bytes
        len: usize,
    },
    /// Image does not fit in the device flash
    ImageTooLarge {
        /// Pages needed by the image
        pages: usize,
        /// Pages available on the device
        available: usize,
    },

    // Parse errors
    /// Header signature is not a known format revision
    InvalidSignature([u8; 4]),
    /// Descriptor table checksum does not match its contents
    DescriptorCrcMismatch {
        /// CRC stored in the header
        expected: u16,
        /// CRC computed over the descriptor table
        actual: u16,
    },
    /// Data ended before the structure was complete
    Truncated,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSampleFormat { channels, bits } => write!(
                f,
                "unsupported sample format: {} channel(s), {} bits (need mono 8-bit)",
                channels, bits
            ),
            Self::InvalidWav => write!(f, "invalid WAV file"),
            Self::TooManyAssets { count, max } => {
                write!(f, "too many assets: {} (at most {} fit in the header page)", count, max)
            }
            Self::AssetTooLarge { index, len } => {
                write!(f, "asset #{} is too large ({} bytes)", index, len)
            }
            Self::ImageTooLarge { pages, available } => write!(
                f,
                "image needs {} pages but the device only has {}",
                pages, available
            ),
            Self::InvalidSignature(sig) => write!(f, "invalid image signature {:02X?}", sig),
            Self::DescriptorCrcMismatch { expected, actual } => write!(
                f,
                "descriptor table CRC mismatch: header says 0x{:04X}, computed 0x{:04X}",
                expected, actual
            ),
            Self::Truncated => write!(f, "data truncated"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
