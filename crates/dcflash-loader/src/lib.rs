//! dcflash-loader - DISCONNECT serial bootloader support
//!
//! This crate talks to the bootloader of the DISCONNECT audio phone over a
//! serial line and streams flash images to it.
//!
//! # Protocol Overview
//!
//! The bootloader speaks a small ASCII line protocol: a `hi` handshake,
//! page-sized `read` and `write` commands protected by CRC16, and
//! passthrough commands for device-side tests. See [`protocol`] for the
//! grammar.
//!
//! # Supported Connections
//!
//! - Serial port: `/dev/ttyUSB0`, `dev=/dev/ttyUSB0:57600`, `COM1`, etc.
//! - In-memory emulator: `dummy`
//!
//! # Example
//!
//! ```no_run
//! use dcflash_loader::{flash_image, open_serial, LoaderConfig, NoProgress};
//!
//! let mut loader = open_serial("/dev/ttyUSB0", 57600, LoaderConfig::default())?;
//! println!("Device version: {}", loader.version());
//!
//! let image = std::fs::read("image.bin")?;
//! flash_image(&mut loader, &image, 0, &mut NoProgress)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod dummy;
pub mod error;
pub mod flash;
pub mod protocol;
pub mod selftest;
pub mod transport;

// Re-exports
pub use device::{Loader, LoaderConfig};
pub use dummy::{DummyConfig, DummyDevice};
pub use error::{LoaderError, ProtocolError, Result};
pub use flash::{flash_image, read_pages, verify_image, FlashProgress, FlashStats, NoProgress, Phase};
pub use protocol::{CrcTrailer, DEFAULT_BAUD, DEFAULT_TIMEOUT};
pub use selftest::{enter_normal_mode, run_selftest, SelfTestStep};
pub use transport::serial::SerialTransport;
pub use transport::Transport;

/// Where to find the bootloader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
        /// Baud rate
        baud: u32,
    },
    /// In-memory emulator
    Dummy,
}

impl Connection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dummy` - In-memory emulator
    /// - `dev=/dev/ttyUSB0` or `/dev/ttyUSB0` - Serial at `default_baud`
    /// - `dev=/dev/ttyUSB0:115200` - Serial with specified baud
    pub fn parse(s: &str, default_baud: u32) -> std::result::Result<Self, String> {
        if s == "dummy" {
            return Ok(Connection::Dummy);
        }

        let Some(dev) = s.strip_prefix("dev=") else {
            if s.is_empty() {
                return Err("Empty connection string".to_string());
            }
            return Ok(Connection::Serial {
                device: s.to_string(),
                baud: default_baud,
            });
        };

        // Device paths may contain colons themselves (e.g. by-path names)
        let baud_suffix = dev
            .rsplit_once(':')
            .filter(|(_, b)| !b.is_empty() && b.bytes().all(|c| c.is_ascii_digit()));

        match baud_suffix {
            Some((device, baud_str)) => {
                let baud = baud_str
                    .parse()
                    .map_err(|_| format!("Invalid baud rate: {}", baud_str))?;
                Ok(Connection::Serial {
                    device: device.to_string(),
                    baud,
                })
            }
            None => Ok(Connection::Serial {
                device: dev.to_string(),
                baud: default_baud,
            }),
        }
    }
}

/// Open a connection and perform the handshake
///
/// The transport is type-erased so callers can treat the emulator and a
/// real port alike.
pub fn open(conn: &Connection, config: LoaderConfig) -> Result<Loader<Box<dyn Transport>>> {
    let transport: Box<dyn Transport> = match conn {
        Connection::Serial { device, baud } => Box::new(SerialTransport::open(device, *baud)?),
        Connection::Dummy => Box::new(DummyDevice::new_default()),
    };
    Loader::connect(transport, config)
}

/// Open a bootloader connection via serial port
pub fn open_serial(device: &str, baud: u32, config: LoaderConfig) -> Result<Loader<SerialTransport>> {
    let transport = SerialTransport::open(device, baud)?;
    Loader::connect(transport, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection() {
        assert_eq!(Connection::parse("dummy", 57600), Ok(Connection::Dummy));
        assert_eq!(
            Connection::parse("/dev/ttyUSB0", 57600),
            Ok(Connection::Serial {
                device: "/dev/ttyUSB0".to_string(),
                baud: 57600
            })
        );
        assert_eq!(
            Connection::parse("dev=COM3:115200", 57600),
            Ok(Connection::Serial {
                device: "COM3".to_string(),
                baud: 115200
            })
        );
        assert!(Connection::parse("dev=/dev/ttyACM0:99999999999", 57600).is_err());
        assert!(Connection::parse("", 57600).is_err());
    }

    #[test]
    fn test_parse_connection_path_with_colons() {
        let path = "/dev/serial/by-path/pci-0000:00:14.0-usb-0:2:1.0-port0";
        assert_eq!(
            Connection::parse(&format!("dev={}", path), 57600),
            Ok(Connection::Serial {
                device: path.to_string(),
                baud: 57600
            })
        );
        assert_eq!(
            Connection::parse(&format!("dev={}:115200", path), 57600),
            Ok(Connection::Serial {
                device: path.to_string(),
                baud: 115200
            })
        );
        assert_eq!(
            Connection::parse("dev=/dev/ttyACM0:fast", 57600),
            Ok(Connection::Serial {
                device: "/dev/ttyACM0:fast".to_string(),
                baud: 57600
            })
        );
    }

    #[test]
    fn test_open_dummy() {
        let loader = open(&Connection::Dummy, LoaderConfig::default()).unwrap();
        assert_eq!(loader.version(), "v2");
    }
}
