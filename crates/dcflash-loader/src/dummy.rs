//! In-memory bootloader emulator for testing
//!
//! `DummyDevice` implements [`Transport`] and answers the loader protocol
//! like the phone would, backed by an in-memory flash. It's useful for
//! testing and development without real hardware.

use std::collections::VecDeque;
use std::time::Duration;

use dcflash_core::crc::crc16;
use dcflash_core::geometry::{FILLER, PAGE_COUNT, PAGE_SIZE};

use crate::error::Result;
use crate::protocol::{CrcTrailer, CMD_GO, CMD_HELLO, DEVICE_SIGNATURE, LINE_END};
use crate::transport::Transport;

/// Device-side commands that play a test sound and then answer `ok`
const SOUND_TESTS: [&str; 4] = ["saw", "zoom", "busy", "ring"];

/// Configuration for the dummy device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Version string reported by the handshake
    pub version: String,
    /// Trailer format used for read replies
    pub trailer: CrcTrailer,
    /// Send a wrong CRC for reads of this page
    pub corrupt_read_page: Option<u16>,
    /// Refuse writes to this page
    pub reject_write_page: Option<u16>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            version: "v2".to_string(),
            trailer: CrcTrailer::default(),
            corrupt_read_page: None,
            reject_write_page: None,
        }
    }
}

/// What the emulator expects next from the host
#[derive(Debug)]
enum RxState {
    /// Collecting a command line
    Line,
    /// Collecting the payload of a `write` command
    Payload { page: usize, len: usize, crc: u16 },
}

/// Dummy bootloader
///
/// Emulates the phone's serial loader in memory. Flash starts erased.
pub struct DummyDevice {
    config: DummyConfig,
    flash: Vec<u8>,
    rx: Vec<u8>,
    state: RxState,
    /// Last line ended in CR; a following LF belongs to the same terminator
    after_cr: bool,
    tx: VecDeque<u8>,
    commands: Vec<String>,
    running: bool,
}

impl DummyDevice {
    /// Create a new dummy device with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            flash: vec![FILLER; PAGE_COUNT * PAGE_SIZE],
            rx: Vec::new(),
            state: RxState::Line,
            after_cr: false,
            tx: VecDeque::new(),
            commands: Vec::new(),
            running: false,
        }
    }

    /// Create a new dummy device with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get a reference to the flash data
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Get one flash page
    pub fn page(&self, page: usize) -> &[u8] {
        &self.flash[page * PAGE_SIZE..(page + 1) * PAGE_SIZE]
    }

    /// Command lines received so far, without terminators
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Whether the host sent `go`
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn reply(&mut self, data: &[u8]) {
        self.tx.extend(data);
    }

    fn reply_line(&mut self, line: &str) {
        self.reply(line.as_bytes());
        self.reply(LINE_END.as_bytes());
    }

    fn receive(&mut self, byte: u8) {
        if std::mem::take(&mut self.after_cr) && byte == b'\n' {
            return;
        }

        match self.state {
            RxState::Line => {
                if byte == b'\r' || byte == b'\n' {
                    self.after_cr = byte == b'\r';
                    if !self.rx.is_empty() {
                        let line = String::from_utf8_lossy(&self.rx).into_owned();
                        self.rx.clear();
                        self.handle_command(&line);
                    }
                } else {
                    self.rx.push(byte);
                }
            }
            RxState::Payload { page, len, crc } => {
                self.rx.push(byte);
                if self.rx.len() == len {
                    let data = std::mem::take(&mut self.rx);
                    self.state = RxState::Line;
                    self.handle_payload(page, &data, crc);
                }
            }
        }
    }

    fn handle_command(&mut self, line: &str) {
        log::trace!("dummy: command {:?}", line);
        self.commands.push(line.to_string());

        let mut args = line.split_whitespace();
        match args.next() {
            Some(CMD_HELLO) => {
                let reply = format!("{} {}", DEVICE_SIGNATURE, self.config.version);
                self.reply_line(&reply);
            }
            Some("read") => match parse_hex_args::<1>(args) {
                Some([page]) if page < PAGE_COUNT => self.handle_read(page),
                _ => self.reply_line("err"),
            },
            Some("write") => match parse_hex_args::<3>(args) {
                Some([page, len, crc]) if page < PAGE_COUNT && len <= PAGE_SIZE => {
                    if len == 0 {
                        self.handle_payload(page, &[], crc as u16);
                    } else {
                        self.state = RxState::Payload {
                            page,
                            len,
                            crc: crc as u16,
                        };
                    }
                }
                _ => self.reply_line("err"),
            },
            Some(CMD_GO) => {
                self.running = true;
                self.reply_line("entering normal mode");
            }
            Some(cmd) if SOUND_TESTS.contains(&cmd) => self.reply_line("ok"),
            _ => {}
        }
    }

    fn handle_read(&mut self, page: usize) {
        let data = self.page(page).to_vec();
        let mut crc = crc16(&data);
        if self.config.corrupt_read_page == Some(page as u16) {
            crc ^= 0xFFFF;
        }

        self.reply_line("ok");
        self.reply(&data);
        let trailer = match self.config.trailer {
            CrcTrailer::Bare => format!("{:04x}", crc),
            CrcTrailer::Crlf => format!("{:04x}{}", crc, LINE_END),
        };
        self.reply(trailer.as_bytes());
    }

    fn handle_payload(&mut self, page: usize, data: &[u8], crc: u16) {
        if crc16(data) != crc || self.config.reject_write_page == Some(page as u16) {
            self.reply_line("err");
            return;
        }
        let start = page * PAGE_SIZE;
        self.flash[start..start + data.len()].copy_from_slice(data);
        self.reply_line("ok");
    }
}

fn parse_hex_args<'a, const N: usize>(mut args: impl Iterator<Item = &'a str>) -> Option<[usize; N]> {
    let mut out = [0usize; N];
    for slot in out.iter_mut() {
        *slot = usize::from_str_radix(args.next()?, 16).ok()?;
    }
    if args.next().is_some() {
        return None;
    }
    Some(out)
}

impl Transport for DummyDevice {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        for &b in data {
            self.receive(b);
        }
        Ok(())
    }

    fn read_nonblock(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let n = buf.len().min(self.tx.len());
        for (dst, src) in buf.iter_mut().zip(self.tx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Loader, LoaderConfig};
    use crate::error::LoaderError;

    #[test]
    fn test_handshake() {
        let loader = Loader::connect(DummyDevice::new_default(), LoaderConfig::default()).unwrap();
        assert_eq!(loader.version(), "v2");
    }

    #[test]
    fn test_write_then_read() {
        let mut loader = Loader::connect(DummyDevice::new_default(), LoaderConfig::default()).unwrap();
        let data: Vec<u8> = (0..PAGE_SIZE).map(|i| (i % 256) as u8).collect();
        loader.write_page(7, &data).unwrap();
        assert_eq!(loader.read_page(7).unwrap(), data);

        let device = loader.into_transport();
        assert_eq!(device.page(7), &data[..]);
        assert!(device.page(8).iter().all(|&b| b == FILLER));
    }

    #[test]
    fn test_partial_write_keeps_rest() {
        let mut loader = Loader::connect(DummyDevice::new_default(), LoaderConfig::default()).unwrap();
        loader.write_page(0, b"abc").unwrap();
        let page = loader.read_page(0).unwrap();
        assert_eq!(&page[..3], b"abc");
        assert!(page[3..].iter().all(|&b| b == FILLER));
    }

    #[test]
    fn test_bare_trailer() {
        let config = DummyConfig {
            trailer: CrcTrailer::Bare,
            ..DummyConfig::default()
        };
        let loader_config = LoaderConfig {
            trailer: CrcTrailer::Bare,
            ..LoaderConfig::default()
        };
        let mut loader = Loader::connect(DummyDevice::new(config), loader_config).unwrap();
        assert_eq!(loader.read_page(1).unwrap(), vec![FILLER; PAGE_SIZE]);
    }

    #[test]
    fn test_corrupt_read() {
        let config = DummyConfig {
            corrupt_read_page: Some(2),
            ..DummyConfig::default()
        };
        let mut loader = Loader::connect(DummyDevice::new(config), LoaderConfig::default()).unwrap();
        assert!(loader.read_page(1).is_ok());
        assert!(matches!(loader.read_page(2), Err(LoaderError::Crc { page: 2, .. })));
    }

    #[test]
    fn test_go() {
        let mut loader = Loader::connect(DummyDevice::new_default(), LoaderConfig::default()).unwrap();
        loader.custom("go").unwrap();
        assert!(loader.into_transport().is_running());
    }
}
