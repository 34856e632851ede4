//! Loader session
//!
//! This module provides the `Loader` struct that implements the bootloader
//! command/response exchanges on top of a [`Transport`].

use std::time::{Duration, Instant};

use dcflash_core::crc::crc16;
use dcflash_core::geometry::PAGE_SIZE;
use dcflash_core::image::FormatVersion;

use crate::error::{LoaderError, ProtocolError, Result};
use crate::protocol::*;
use crate::transport::Transport;

/// Loader settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Default timeout for replies
    pub timeout: Duration,
    /// CRC trailer format of read replies
    pub trailer: CrcTrailer,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            trailer: CrcTrailer::default(),
        }
    }
}

/// A connected bootloader
///
/// A `Loader` only exists after a successful handshake and owns its
/// transport; dropping it closes the connection. The protocol has no
/// request identifiers, so every method completes one exchange before
/// returning. If a method fails midway the device may still be busy with
/// the command; there is no way to cancel it.
pub struct Loader<T: Transport> {
    /// Transport layer (serial port or emulator)
    transport: T,
    /// Protocol settings
    config: LoaderConfig,
    /// Version string reported by the handshake
    version: String,
}

impl<T: Transport> Loader<T> {
    /// Connect to the bootloader over `transport`
    ///
    /// Sends `hi` and expects `disconnect <version>`. Any other reply fails
    /// with [`LoaderError::Signature`] and the transport is dropped.
    pub fn connect(transport: T, config: LoaderConfig) -> Result<Self> {
        let mut loader = Self {
            transport,
            config,
            version: String::new(),
        };

        loader.version = loader.hello()?;
        log::info!("DISCONNECT device version {:?} found", loader.version);

        Ok(loader)
    }

    /// Version string reported by the device
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Image format implied by the device version, if recognizable
    pub fn device_format(&self) -> Option<FormatVersion> {
        FormatVersion::from_device_version(&self.version)
    }

    /// Protocol settings
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Close the session and return the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Read one flash page using the default timeout
    pub fn read_page(&mut self, page: u16) -> Result<Vec<u8>> {
        self.read_page_timeout(page, self.config.timeout)
    }

    /// Read one flash page and verify its CRC16
    pub fn read_page_timeout(&mut self, page: u16, timeout: Duration) -> Result<Vec<u8>> {
        log::debug!("loader: read page {}", page);
        self.send_line(&read_command(page))?;
        self.wait_ok(timeout)?;

        let expected = PAGE_SIZE + self.config.trailer.width();
        let reply = self.read_bytes(expected, timeout)?;
        if reply.len() != expected {
            return Err(ProtocolError::ShortRead {
                command: "read",
                expected,
                actual: reply.len(),
            }
            .into());
        }

        let (data, trailer) = reply.split_at(PAGE_SIZE);
        let device_crc = parse_crc_trailer(trailer)?;
        let actual = crc16(data);
        if device_crc != actual {
            return Err(LoaderError::Crc {
                page,
                expected: device_crc,
                actual,
            });
        }

        Ok(data.to_vec())
    }

    /// Write up to one page of data using the default timeout
    pub fn write_page(&mut self, page: u16, data: &[u8]) -> Result<()> {
        self.write_page_timeout(page, data, self.config.timeout)
    }

    /// Write up to one page of data and wait for the device to accept it
    ///
    /// Data longer than [`PAGE_SIZE`] is rejected before anything is sent.
    pub fn write_page_timeout(&mut self, page: u16, data: &[u8], timeout: Duration) -> Result<()> {
        if data.len() > PAGE_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                len: data.len(),
                max: PAGE_SIZE,
            }
            .into());
        }

        let crc = crc16(data);
        log::debug!(
            "loader: write page {} ({} bytes, crc 0x{:04X})",
            page,
            data.len(),
            crc
        );

        let line = write_command(page, data.len(), crc);
        log::trace!("loader: > {:?}", line);
        self.transport.write(line.as_bytes())?;
        self.transport.write(data)?;
        self.transport.flush()?;

        self.wait_ok(timeout)
    }

    /// Send a command line verbatim
    ///
    /// No reply is awaited; device-side commands can take seconds, so
    /// callers pair this with [`Loader::wait_ok`] and a suitable timeout.
    pub fn custom(&mut self, cmd: &str) -> Result<()> {
        log::debug!("loader: custom command {:?}", cmd);
        self.send_line(&format!("{}{}", cmd, LINE_END))
    }

    /// Wait for an `ok` line
    ///
    /// Anything else, including silence until `timeout`, is a protocol
    /// error carrying the raw reply.
    pub fn wait_ok(&mut self, timeout: Duration) -> Result<()> {
        let reply = self.read_line(timeout)?;
        if reply != OK_REPLY {
            return Err(ProtocolError::UnexpectedReply {
                reply: String::from_utf8_lossy(&reply).into_owned(),
            }
            .into());
        }
        Ok(())
    }

    // ---- Protocol implementation ----

    /// Perform the handshake and return the version string
    fn hello(&mut self) -> Result<String> {
        self.send_line(&format!("{}{}", CMD_HELLO, LINE_END))?;
        let reply = self.read_line(self.config.timeout)?;

        parse_hello(&reply).ok_or_else(|| LoaderError::Signature {
            reply: String::from_utf8_lossy(&reply).into_owned(),
        })
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        log::trace!("loader: > {:?}", line);
        self.transport.write(line.as_bytes())?;
        self.transport.flush()
    }

    /// Read up to and including `\n`, or whatever arrived before `timeout`
    fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        let mut c = [0u8];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if self.transport.read_nonblock(&mut c, remaining)? == 0 {
                break;
            }
            line.push(c[0]);
            if c[0] == b'\n' {
                break;
            }
        }

        log::trace!("loader: < {:?}", String::from_utf8_lossy(&line));
        Ok(line)
    }

    /// Read `len` bytes, or fewer if `timeout` expires first
    fn read_bytes(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; len];
        let mut filled = 0;

        while filled < len {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let n = self.transport.read_nonblock(&mut buf[filled..], remaining)?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        buf.truncate(filled);
        Ok(buf)
    }
}
