//! Error types for loader operations

use thiserror::Error;

/// Malformed, incomplete or unexpected exchanges
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes arrived than the reply needs
    #[error("Reply too short for {command} command: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Command being answered
        command: &'static str,
        /// Bytes expected
        expected: usize,
        /// Bytes received before the timeout
        actual: usize,
    },

    /// A line other than `ok` arrived (empty means timeout)
    #[error("Got {reply:?} instead of OK")]
    UnexpectedReply {
        /// The raw line received
        reply: String,
    },

    /// Write payload does not fit in a page
    #[error("Data is larger than page size ({len} > {max} bytes)")]
    PayloadTooLarge {
        /// Payload length
        len: usize,
        /// Page size
        max: usize,
    },

    /// CRC trailer of a read reply is not hexadecimal
    #[error("Malformed CRC trailer {0:?}")]
    MalformedCrc(String),
}

/// Loader errors
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Handshake did not identify a DISCONNECT device
    #[error("No DISCONNECT device found (reply {reply:?})")]
    Signature {
        /// The raw handshake reply
        reply: String,
    },

    /// Page data does not match its CRC
    #[error("CRC16 error on page {page}: device sent 0x{expected:04X}, data has 0x{actual:04X}")]
    Crc {
        /// Page number
        page: u16,
        /// CRC sent by the device
        expected: u16,
        /// CRC computed over the received data
        actual: u16,
    },

    /// Protocol violation
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Page range outside the device flash
    #[error("Pages {start}..{end} are outside the flash (page count {limit})")]
    OutOfRange {
        /// First page
        start: usize,
        /// One past the last page
        end: usize,
        /// Number of flash pages
        limit: usize,
    },

    /// Read-back data differs from what was written
    #[error("Verify failed: page {page} differs from the image")]
    VerifyMismatch {
        /// First differing page
        page: u16,
    },

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;
