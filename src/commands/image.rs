//! Image file commands

use dcflash_core::audio::{REQUIRED_CHANNELS, REQUIRED_SAMPLE_BITS};
use dcflash_core::geometry::{PAGE_COUNT, PAGE_SIZE};
use dcflash_core::image::{self, AssetDescriptor, FormatVersion, ImageHeader};
use dcflash_core::manifest::Manifest;
use dcflash_core::wav;
use std::fs;
use std::path::Path;

/// Print a descriptor table
pub fn print_descriptors(descriptors: &[AssetDescriptor]) {
    println!(
        "  {:>3}  {:8} {:>6} {:>6} {:>6} {:>6} {:>6} {:>8}",
        "#", "Role", "Weight", "Repeat", "Start", "Pages", "Tail", "Bytes"
    );
    for (i, d) in descriptors.iter().enumerate() {
        println!(
            "  {:>3}  {:8} {:>6} {:>6} {:>6} {:>6} {:>6} {:>8}",
            i,
            d.role.to_string(),
            d.weight,
            d.repeat,
            d.start_page,
            d.pages,
            d.tail_length,
            d.payload_len()
        );
    }
}

/// Build an image from a manifest and write it to `output`
pub fn cmd_build(
    manifest: &Path,
    output: &Path,
    format: Option<FormatVersion>,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest_obj = Manifest::from_toml_file(manifest)?;
    log::info!(
        "Loaded manifest {:?} with {} asset(s)",
        manifest,
        manifest_obj.assets.len()
    );

    let format = match format {
        Some(f) if f != manifest_obj.format => {
            log::warn!(
                "Overriding manifest format {} with {}",
                manifest_obj.format,
                f
            );
            f
        }
        Some(f) => f,
        None => manifest_obj.format,
    };

    let assets = manifest_obj.load_assets()?;
    let image = image::build(&assets, format)?;
    image.check_capacity()?;

    println!("Image format {}, {} asset(s):", format, assets.len());
    print_descriptors(image.descriptors());

    fs::write(output, image.as_bytes())?;
    println!(
        "Wrote {} bytes ({} of {} pages) to {:?}",
        image.len(),
        image.page_count(),
        PAGE_COUNT,
        output
    );

    Ok(())
}

/// Show the header of an image and optionally export its assets
pub fn cmd_info(
    input: &Path,
    extract: Option<&Path>,
    sample_rate: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let header = ImageHeader::parse(&data)?;

    println!("Image Information");
    println!("=================");
    println!();
    println!("Format:          {}", header.format);
    println!("Assets:          {}", header.asset_count());
    println!("Table CRC:       0x{:04X}", header.descriptor_table_crc);
    println!(
        "File size:       {} bytes ({} pages)",
        data.len(),
        data.len().div_ceil(PAGE_SIZE)
    );
    println!();
    print_descriptors(&header.descriptors);

    if let Some(dir) = extract {
        extract_assets(&data, &header, dir, sample_rate)?;
    }

    Ok(())
}

/// Write each asset payload as a mono 8-bit WAV file
fn extract_assets(
    data: &[u8],
    header: &ImageHeader,
    dir: &Path,
    sample_rate: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;

    for (i, d) in header.descriptors.iter().enumerate() {
        let start = d.start_page as usize * PAGE_SIZE;
        let end = start + d.payload_len();
        let payload = data.get(start..end).ok_or_else(|| {
            format!(
                "Asset {} needs bytes {}..{} but the image has {}",
                i,
                start,
                end,
                data.len()
            )
        })?;

        let path = dir.join(format!("asset-{:03}-{}.wav", i, d.role));
        let wav = wav::encode(REQUIRED_CHANNELS, REQUIRED_SAMPLE_BITS, sample_rate, payload);
        fs::write(&path, wav)?;
        println!("Extracted asset {} to {:?}", i, path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcflash_core::image::{build, Asset, Role};
    use dcflash_core::wav::WavFile;

    #[test]
    fn test_extract_assets() {
        let dir = tempfile::tempdir().unwrap();
        let assets = [
            Asset::new(vec![0x80; 700], Role::Music, 3),
            Asset::new(vec![0x40; 1056], Role::Free, 0),
        ];
        let image = build(&assets, FormatVersion::V2).unwrap();
        let input = dir.path().join("image.bin");
        fs::write(&input, image.as_bytes()).unwrap();

        let out = dir.path().join("assets");
        cmd_info(&input, Some(&out), 8000).unwrap();

        let first = WavFile::open(out.join("asset-000-music.wav")).unwrap();
        assert_eq!(first.sample_rate(), 8000);
        assert_eq!(
            dcflash_core::audio::SampleSource::frames(&first),
            &[0x80; 700][..]
        );
        let second = WavFile::open(out.join("asset-001-free.wav")).unwrap();
        assert_eq!(dcflash_core::audio::SampleSource::len(&second), 1056);
    }

    #[test]
    fn test_extract_truncated_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = build(&[Asset::new(vec![1; 2000], Role::Music, 1)], FormatVersion::V1).unwrap();
        let input = dir.path().join("image.bin");
        fs::write(&input, &image.as_bytes()[..2 * PAGE_SIZE]).unwrap();

        assert!(cmd_info(&input, None, 8000).is_ok());
        assert!(cmd_info(&input, Some(&dir.path().join("out")), 8000).is_err());
    }

    #[test]
    fn test_build_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tone.wav"),
            wav::encode(1, 8, 8000, &[0x7F; 1500]),
        )
        .unwrap();
        let manifest = dir.path().join("image.toml");
        fs::write(
            &manifest,
            "[image]\nformat = \"v2\"\n\n[[asset]]\nfile = \"tone.wav\"\nrole = \"music\"\nweight = 5\n",
        )
        .unwrap();
        let output = dir.path().join("out.bin");

        cmd_build(&manifest, &output, Some(FormatVersion::V1)).unwrap();

        let data = fs::read(&output).unwrap();
        let header = ImageHeader::parse(&data).unwrap();
        assert_eq!(header.format, FormatVersion::V1);
        assert_eq!(header.descriptors[0].payload_len(), 1500);
        assert_eq!(data.len(), 3 * PAGE_SIZE);
    }
}
