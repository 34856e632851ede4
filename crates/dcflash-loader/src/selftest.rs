//! Hardware self-test and mode switching

use std::time::Duration;

use dcflash_core::geometry::{PAGE_COUNT, PAGE_SIZE};
use rand::Rng;

use crate::device::Loader;
use crate::error::{LoaderError, Result};
use crate::protocol::CMD_GO;
use crate::transport::Transport;

/// Page overwritten by the flash check
pub const SELFTEST_PAGE: u16 = (PAGE_COUNT - 1) as u16;

/// Device-side audio tests and how long each may take to answer
pub const SOUND_TESTS: [(&str, Duration); 4] = [
    ("saw", Duration::from_secs(5)),
    ("zoom", Duration::from_secs(5)),
    ("busy", Duration::from_secs(5)),
    ("ring", Duration::from_secs(8)),
];

/// One stage of the self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestStep {
    /// Random page written, read back and compared
    Flash,
    /// A device-side sound test answered `ok`
    Sound(&'static str),
}

/// Exercise flash and audio hardware
///
/// Overwrites [`SELFTEST_PAGE`] with random data, reads it back, then runs
/// every entry of [`SOUND_TESTS`]. `on_step` is called after each stage
/// passes; the first failure is returned.
pub fn run_selftest<T: Transport>(
    loader: &mut Loader<T>,
    on_step: &mut dyn FnMut(SelfTestStep),
) -> Result<()> {
    let mut data = vec![0u8; PAGE_SIZE];
    rand::thread_rng().fill(&mut data[..]);

    log::info!("Testing flash on page {}", SELFTEST_PAGE);
    loader.write_page(SELFTEST_PAGE, &data)?;
    if loader.read_page(SELFTEST_PAGE)? != data {
        return Err(LoaderError::VerifyMismatch {
            page: SELFTEST_PAGE,
        });
    }
    on_step(SelfTestStep::Flash);

    for (cmd, timeout) in SOUND_TESTS {
        log::info!("Running sound test {}", cmd);
        loader.custom(cmd)?;
        loader.wait_ok(timeout)?;
        on_step(SelfTestStep::Sound(cmd));
    }

    Ok(())
}

/// Leave the bootloader and start the phone firmware
///
/// The device answers with a free-form line that is not read.
pub fn enter_normal_mode<T: Transport>(loader: &mut Loader<T>) -> Result<()> {
    log::info!("Entering normal mode");
    loader.custom(CMD_GO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::{connected, ScriptedTransport};
    use crate::device::LoaderConfig;
    use crate::dummy::{DummyConfig, DummyDevice};
    use crate::error::ProtocolError;

    #[test]
    fn test_selftest_order() {
        let mut loader = Loader::connect(DummyDevice::new_default(), LoaderConfig::default()).unwrap();
        let mut steps = Vec::new();
        run_selftest(&mut loader, &mut |s| steps.push(s)).unwrap();

        assert_eq!(
            steps,
            vec![
                SelfTestStep::Flash,
                SelfTestStep::Sound("saw"),
                SelfTestStep::Sound("zoom"),
                SelfTestStep::Sound("busy"),
                SelfTestStep::Sound("ring"),
            ]
        );

        let device = loader.into_transport();
        let commands: Vec<&str> = device.commands().iter().map(String::as_str).collect();
        assert_eq!(commands[0], "hi");
        assert!(commands[1].starts_with("write 1fff 420 "));
        assert_eq!(&commands[2..], ["read 1fff", "saw", "zoom", "busy", "ring"]);
    }

    #[test]
    fn test_selftest_stops_on_flash_failure() {
        let config = DummyConfig {
            corrupt_read_page: Some(SELFTEST_PAGE),
            ..DummyConfig::default()
        };
        let mut loader = Loader::connect(DummyDevice::new(config), LoaderConfig::default()).unwrap();
        let mut steps = Vec::new();
        assert!(matches!(
            run_selftest(&mut loader, &mut |s| steps.push(s)),
            Err(LoaderError::Crc { .. })
        ));
        assert!(steps.is_empty());
        assert!(!loader.into_transport().commands().iter().any(|c| c == "saw"));
    }

    #[test]
    fn test_selftest_read_timeout() {
        // Write is acknowledged, the read-back reply never arrives
        let t = ScriptedTransport::with_reply(b"disconnect v2\r\nok\r\n");
        let mut loader = Loader::connect(t, LoaderConfig::default()).unwrap();
        let mut steps = Vec::new();
        assert!(matches!(
            run_selftest(&mut loader, &mut |s| steps.push(s)),
            Err(LoaderError::Protocol(ProtocolError::UnexpectedReply { .. }))
        ));
        assert!(steps.is_empty());
    }

    #[test]
    fn test_enter_normal_mode() {
        let mut loader = Loader::connect(DummyDevice::new_default(), LoaderConfig::default()).unwrap();
        enter_normal_mode(&mut loader).unwrap();
        assert!(loader.into_transport().is_running());

        let mut loader = connected("v2");
        enter_normal_mode(&mut loader).unwrap();
        assert_eq!(loader.into_transport().tx, b"go\r\n");
    }
}
