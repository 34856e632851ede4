//! dcflash - DISCONNECT audio phone image builder and flasher
//!
//! # Architecture
//!
//! dcflash is split into two library crates:
//! - **dcflash-core** - Image format, page geometry, CRC16 and audio
//!   sources. Builds images without any I/O
//! - **dcflash-loader** - Serial bootloader protocol and the transfer,
//!   verify and self-test routines built on it
//!
//! This binary wires both to the command line.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

/// Log level requested by `-v` flags, if any
fn verbosity_level(verbose: u8) -> Option<log::LevelFilter> {
    match verbose {
        0 => None, // default (info, or RUST_LOG)
        1 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger; -v overrides the default filter
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = verbosity_level(cli.verbose) {
        logger.filter_level(level);
    }
    logger.init();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            format,
        } => commands::image::cmd_build(&manifest, &output, format),
        Commands::Info {
            input,
            extract,
            sample_rate,
        } => commands::image::cmd_info(&input, extract.as_deref(), sample_rate),
        Commands::Probe { device } => {
            let loader = commands::device::connect(&device)?;
            commands::device::cmd_probe(&loader)
        }
        Commands::Flash {
            device,
            input,
            start_page,
            no_verify,
            force,
        } => {
            let mut loader = commands::device::connect(&device)?;
            commands::device::cmd_flash(&mut loader, &input, start_page, !no_verify, force)
        }
        Commands::Read {
            device,
            output,
            start_page,
            count,
        } => {
            let mut loader = commands::device::connect(&device)?;
            commands::device::cmd_read(&mut loader, &output, start_page, count)
        }
        Commands::Hwtest { device } => {
            let mut loader = commands::device::connect(&device)?;
            commands::device::cmd_hwtest(&mut loader)
        }
        Commands::Go { device } => {
            let mut loader = commands::device::connect(&device)?;
            commands::device::cmd_go(&mut loader)
        }
    }
}
