//! Loader protocol constants and line formats
//!
//! The bootloader speaks an ASCII line protocol, one command at a time:
//!
//! ```text
//! > hi                          < disconnect <version>
//! > read <page>                 < ok, PAGE_SIZE raw bytes, hex CRC16 trailer
//! > write <page> <len> <crc>    (followed by <len> raw bytes)
//!                               < ok
//! > <custom>                    (reply depends on the command)
//! ```
//!
//! Numbers are lowercase hexadecimal without prefix, lines end in CRLF.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ProtocolError;

/// Handshake command
pub const CMD_HELLO: &str = "hi";
/// Command that leaves the bootloader
pub const CMD_GO: &str = "go";

/// First token of the handshake reply
pub const DEVICE_SIGNATURE: &str = "disconnect";

/// Acknowledgment line, including terminator
pub const OK_REPLY: &[u8] = b"ok\r\n";

/// Line terminator sent after each command
pub const LINE_END: &str = "\r\n";

/// Default serial baud rate
pub const DEFAULT_BAUD: u32 = 57600;

/// Default timeout for replies
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Width of the CRC trailer that follows page data in a read reply
///
/// Firmware revisions differ in whether the 4 hex digits are followed by a
/// line terminator, and the host cannot tell them apart from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcTrailer {
    /// Four hex digits
    Bare,
    /// Four hex digits and CRLF
    #[default]
    Crlf,
}

impl CrcTrailer {
    /// Trailer length in bytes
    pub const fn width(self) -> usize {
        match self {
            Self::Bare => 4,
            Self::Crlf => 6,
        }
    }
}

impl FromStr for CrcTrailer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bare" | "4" => Ok(Self::Bare),
            "crlf" | "6" => Ok(Self::Crlf),
            _ => Err(format!("Invalid CRC trailer: {} (use bare or crlf)", s)),
        }
    }
}

/// Format a `read` command line
pub fn read_command(page: u16) -> String {
    format!("read {:x}{}", page, LINE_END)
}

/// Format a `write` command line
pub fn write_command(page: u16, len: usize, crc: u16) -> String {
    format!("write {:x} {:x} {:x}{}", page, len, crc, LINE_END)
}

/// Split a handshake reply into the version string
///
/// Returns `None` if the line is empty or does not start with
/// [`DEVICE_SIGNATURE`].
pub fn parse_hello(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let (token, version) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    (token == DEVICE_SIGNATURE).then(|| version.trim().to_string())
}

/// Parse the hexadecimal CRC trailer of a read reply
pub fn parse_crc_trailer(trailer: &[u8]) -> Result<u16, ProtocolError> {
    let malformed = || ProtocolError::MalformedCrc(String::from_utf8_lossy(trailer).into_owned());
    let text = std::str::from_utf8(trailer).map_err(|_| malformed())?;
    u16::from_str_radix(text.trim(), 16).map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_lines() {
        assert_eq!(read_command(8191), "read 1fff\r\n");
        assert_eq!(write_command(0, 1056, 0xBEEF), "write 0 420 beef\r\n");
        assert_eq!(write_command(0x10, 5, 0x00A1), "write 10 5 a1\r\n");
    }

    #[test]
    fn test_parse_hello() {
        assert_eq!(parse_hello(b"disconnect fw-2.1\r\n"), Some("fw-2.1".to_string()));
        assert_eq!(parse_hello(b"disconnect v2\r\n"), Some("v2".to_string()));
        assert_eq!(parse_hello(b"disconnect\r\n"), Some(String::new()));
        assert_eq!(parse_hello(b"hello\r\n"), None);
        assert_eq!(parse_hello(b""), None);
        assert_eq!(parse_hello(b"disconnected v2\r\n"), None);
    }

    #[test]
    fn test_parse_hello_surrounding_whitespace() {
        assert_eq!(parse_hello(b" disconnect v2\r\n"), Some("v2".to_string()));
        assert_eq!(parse_hello(b"\r\ndisconnect\tv1 \r\n"), Some("v1".to_string()));
        assert_eq!(parse_hello(b"  \r\n"), None);
    }

    #[test]
    fn test_parse_crc_trailer() {
        assert_eq!(parse_crc_trailer(b"beef"), Ok(0xBEEF));
        assert_eq!(parse_crc_trailer(b"00a1\r\n"), Ok(0x00A1));
        assert_eq!(parse_crc_trailer(b" 1F2\r\n"), Ok(0x01F2));
        assert!(matches!(
            parse_crc_trailer(b"zz\r\n"),
            Err(ProtocolError::MalformedCrc(_))
        ));
        assert!(parse_crc_trailer(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn test_trailer_len() {
        assert_eq!(CrcTrailer::Bare.width(), 4);
        assert_eq!(CrcTrailer::Crlf.width(), 6);
        assert_eq!("bare".parse::<CrcTrailer>(), Ok(CrcTrailer::Bare));
        assert!("x".parse::<CrcTrailer>().is_err());
    }
}
