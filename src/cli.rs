//! CLI argument parsing

use clap::{Parser, Subcommand};
use dcflash_core::image::FormatVersion;
use dcflash_loader::{CrcTrailer, DEFAULT_BAUD};
use std::path::PathBuf;
use std::time::Duration;

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a timeout in seconds, fractions allowed
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("Invalid timeout: {}", e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("Invalid timeout: {}", e))
}

#[derive(Parser)]
#[command(name = "dcflash")]
#[command(author, version, about = "DISCONNECT audio phone image builder and flasher", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection options shared across device commands
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Serial port (e.g. /dev/ttyUSB0, dev=COM3:115200) or "dummy"
    #[arg(short, long)]
    pub device: String,

    /// Baud rate used when the device string does not name one
    #[arg(short, long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// Reply timeout in seconds
    #[arg(long, value_parser = parse_seconds, default_value = "2")]
    pub timeout: Duration,

    /// CRC trailer of read replies (bare or crlf)
    #[arg(long, default_value = "crlf")]
    pub trailer: CrcTrailer,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a flash image from a manifest
    Build {
        /// Manifest file (TOML format)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,

        /// Override the image format named in the manifest (v1 or v2)
        #[arg(long)]
        format: Option<FormatVersion>,
    },

    /// Show the header of an image file
    Info {
        /// Image file (or a page dump starting at page 0)
        #[arg(short, long)]
        input: PathBuf,

        /// Write every asset as a WAV file into this directory
        #[arg(long)]
        extract: Option<PathBuf>,

        /// Sample rate written into extracted WAV files
        #[arg(long, default_value_t = 8000)]
        sample_rate: u32,
    },

    /// Connect to the bootloader and show its version
    Probe {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Write an image to the device
    Flash {
        #[command(flatten)]
        device: DeviceArgs,

        /// Image file
        #[arg(short, long)]
        input: PathBuf,

        /// First page to write (hex or decimal)
        #[arg(long, value_parser = parse_hex_u16, default_value = "0")]
        start_page: u16,

        /// Skip reading the pages back after writing
        #[arg(long)]
        no_verify: bool,

        /// Flash even if the image format does not match the device
        #[arg(long)]
        force: bool,
    },

    /// Read pages from the device to a file
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// First page to read (hex or decimal)
        #[arg(long, value_parser = parse_hex_u16, default_value = "0")]
        start_page: u16,

        /// Number of pages to read
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Run the flash and audio hardware test
    Hwtest {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Leave the bootloader and start the phone firmware
    Go {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u16() {
        assert_eq!(parse_hex_u16("0x1fff"), Ok(0x1FFF));
        assert_eq!(parse_hex_u16("12"), Ok(12));
        assert!(parse_hex_u16("0x10000").is_err());
        assert!(parse_hex_u16("page").is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("2"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_seconds("0.5"), Ok(Duration::from_millis(500)));
        assert!(parse_seconds("-1").is_err());
    }

    #[test]
    fn test_cli_flash_args() {
        let cli = Cli::try_parse_from([
            "dcflash", "-v", "flash", "-d", "dummy", "-i", "img.bin", "--trailer", "bare",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Flash {
                device,
                start_page,
                no_verify,
                ..
            } => {
                assert_eq!(device.device, "dummy");
                assert_eq!(device.baud, DEFAULT_BAUD);
                assert_eq!(device.trailer, CrcTrailer::Bare);
                assert_eq!(start_page, 0);
                assert!(!no_verify);
            }
            _ => panic!("expected flash command"),
        }
    }

    #[test]
    fn test_cli_build_format_override() {
        let cli = Cli::try_parse_from([
            "dcflash", "build", "-m", "m.toml", "-o", "out.bin", "--format", "v1",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Build {
                format: Some(FormatVersion::V1),
                ..
            }
        ));
    }
}
