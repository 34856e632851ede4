//! Commands that talk to the bootloader

use crate::cli::DeviceArgs;
use crate::commands::progress::IndicatifProgress;
use dcflash_core::geometry::PAGE_SIZE;
use dcflash_core::image::ImageHeader;
use dcflash_loader::selftest::SOUND_TESTS;
use dcflash_loader::{
    enter_normal_mode, flash_image, read_pages, run_selftest, verify_image, Connection, Loader,
    LoaderConfig, SelfTestStep, Transport,
};
use std::fs;
use std::path::Path;

/// Open the connection described by `args` and perform the handshake
pub fn connect(args: &DeviceArgs) -> Result<Loader<Box<dyn Transport>>, Box<dyn std::error::Error>> {
    let conn = Connection::parse(&args.device, args.baud)?;
    let config = LoaderConfig {
        timeout: args.timeout,
        trailer: args.trailer,
    };
    Ok(dcflash_loader::open(&conn, config)?)
}

/// Show the device version
pub fn cmd_probe<T: Transport>(loader: &Loader<T>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Device version:  {}", loader.version());
    match loader.device_format() {
        Some(format) => println!("Image format:    {}", format),
        None => println!("Image format:    unknown"),
    }
    Ok(())
}

/// Write an image file and optionally verify it
pub fn cmd_flash<T: Transport>(
    loader: &mut Loader<T>,
    input: &Path,
    start_page: u16,
    verify: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    println!("Read {} bytes from {:?}", data.len(), input);

    // Only full images starting at page 0 carry a header worth checking
    if start_page == 0 {
        check_format(loader, &data, force)?;
    }

    let mut progress = IndicatifProgress::new();
    let stats = flash_image(loader, &data, start_page, &mut progress)?;
    println!(
        "Wrote {} bytes to pages {}..{}",
        stats.bytes,
        stats.start_page,
        stats.start_page as usize + stats.pages
    );

    if verify {
        verify_image(loader, &data, start_page, &mut progress)?;
        println!("Verification passed");
    }

    Ok(())
}

/// Refuse images whose header format differs from what the device reports
fn check_format<T: Transport>(
    loader: &Loader<T>,
    data: &[u8],
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let header = match ImageHeader::parse(data) {
        Ok(header) => header,
        Err(e) => {
            log::warn!("Input does not start with an image header: {}", e);
            return Ok(());
        }
    };

    match loader.device_format() {
        Some(device) if device != header.format => {
            if force {
                log::warn!(
                    "Image format {} does not match device format {}, flashing anyway",
                    header.format,
                    device
                );
                Ok(())
            } else {
                Err(format!(
                    "Image format {} does not match device format {} (use --force to override)",
                    header.format, device
                )
                .into())
            }
        }
        Some(_) => Ok(()),
        None => {
            log::warn!(
                "Cannot tell the image format of device version {:?}",
                loader.version()
            );
            Ok(())
        }
    }
}

/// Read a page range to a file
pub fn cmd_read<T: Transport>(
    loader: &mut Loader<T>,
    output: &Path,
    start_page: u16,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::new();
    let data = read_pages(loader, start_page, count, &mut progress)?;
    fs::write(output, &data)?;
    println!(
        "Wrote {} bytes ({} pages of {}) to {:?}",
        data.len(),
        count,
        PAGE_SIZE,
        output
    );
    Ok(())
}

/// Run the hardware self-test
pub fn cmd_hwtest<T: Transport>(loader: &mut Loader<T>) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Running flash test and {} sound tests, listen to the phone",
        SOUND_TESTS.len()
    );
    run_selftest(loader, &mut |step| match step {
        SelfTestStep::Flash => println!("  flash  OK"),
        SelfTestStep::Sound(name) => println!("  {:6} OK", name),
    })?;
    println!("Hardware test passed");
    Ok(())
}

/// Start the phone firmware
pub fn cmd_go<T: Transport>(loader: &mut Loader<T>) -> Result<(), Box<dyn std::error::Error>> {
    enter_normal_mode(loader)?;
    println!("Device left the bootloader");
    Ok(())
}
