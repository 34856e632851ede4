//! TOML image manifests
//!
//! A manifest lists the audio files that go into an image:
//!
//! ```toml
//! [image]
//! format = "v2"
//!
//! [[asset]]
//! file = "dialtone.wav"
//! role = "free"
//! weight = 10
//!
//! [[asset]]
//! file = "loop.wav"
//! role = 1
//! weight = 5
//! repeat = 3
//! ```
//!
//! Relative file paths are resolved against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::image::{Asset, FormatVersion, Role};
use crate::wav::{WavError, WavFile};

/// Errors from loading a manifest or its assets
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Manifest is not valid TOML or misses fields
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// Unknown image format name
    #[error("invalid image format {0:?}")]
    InvalidFormat(String),

    /// Unknown role name
    #[error("asset #{index}: invalid role {value:?}")]
    InvalidRole {
        /// Index of the asset entry
        index: usize,
        /// Role as written in the manifest
        value: String,
    },

    /// An asset file could not be loaded
    #[error("{path}: {source}")]
    Asset {
        /// Asset file path
        path: PathBuf,
        /// Underlying error
        source: WavError,
    },
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlManifest {
    image: TomlImage,
    #[serde(default)]
    asset: Vec<TomlAsset>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlImage {
    format: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlAsset {
    file: PathBuf,
    role: TomlRole,
    #[serde(default)]
    weight: u8,
    repeat: Option<u8>,
}

/// Roles may be written by name or as a raw tag
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum TomlRole {
    Code(u8),
    Name(String),
}

/// One asset entry of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// WAV file, already resolved against the manifest directory
    pub file: PathBuf,
    /// Playback purpose
    pub role: Role,
    /// Selection weight
    pub weight: u8,
    /// Repeat count
    pub repeat: u8,
}

/// A parsed image manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Image format revision
    pub format: FormatVersion,
    /// Assets in flash order
    pub assets: Vec<AssetEntry>,
}

impl Manifest {
    /// Load a manifest from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_toml_str(&content, base)
    }

    /// Parse a manifest, resolving relative asset paths against `base_dir`
    pub fn from_toml_str(content: &str, base_dir: &Path) -> Result<Self, ManifestError> {
        let file: TomlManifest = toml::from_str(content)?;

        let format: FormatVersion = file
            .image
            .format
            .parse()
            .map_err(|_| ManifestError::InvalidFormat(file.image.format.clone()))?;

        let mut assets = Vec::with_capacity(file.asset.len());
        for (index, entry) in file.asset.into_iter().enumerate() {
            let role = match entry.role {
                TomlRole::Code(code) => Role::from(code),
                TomlRole::Name(name) => name
                    .parse()
                    .map_err(|_| ManifestError::InvalidRole { index, value: name })?,
            };

            if entry.repeat.is_some() && format == FormatVersion::V1 {
                log::warn!(
                    "asset #{}: repeat is ignored by the v1 image format",
                    index
                );
            }

            assets.push(AssetEntry {
                file: base_dir.join(&entry.file),
                role,
                weight: entry.weight,
                repeat: entry.repeat.unwrap_or(1),
            });
        }

        Ok(Self { format, assets })
    }

    /// Read every asset file and check that it is mono 8-bit PCM
    pub fn load_assets(&self) -> Result<Vec<Asset>, ManifestError> {
        self.assets
            .iter()
            .map(|entry| {
                let wrap = |source: WavError| ManifestError::Asset {
                    path: entry.file.clone(),
                    source,
                };
                let wav = WavFile::open(&entry.file).map_err(wrap)?;
                let asset = Asset::from_source(&wav, entry.role, entry.weight)
                    .map_err(|e| wrap(WavError::Format(e)))?;
                Ok(asset.with_repeat(entry.repeat))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::wav::encode;

    const MANIFEST: &str = r#"
[image]
format = "v2"

[[asset]]
file = "dial.wav"
role = "free"
weight = 10

[[asset]]
file = "/abs/loop.wav"
role = 1
weight = 5
repeat = 3
"#;

    #[test]
    fn test_parse_manifest() {
        let m = Manifest::from_toml_str(MANIFEST, Path::new("/tmp/sounds")).unwrap();
        assert_eq!(m.format, FormatVersion::V2);
        assert_eq!(m.assets.len(), 2);
        assert_eq!(m.assets[0].file, PathBuf::from("/tmp/sounds/dial.wav"));
        assert_eq!(m.assets[0].role, Role::Free);
        assert_eq!(m.assets[0].repeat, 1);
        assert_eq!(m.assets[1].file, PathBuf::from("/abs/loop.wav"));
        assert_eq!(m.assets[1].role, Role::Music);
        assert_eq!(m.assets[1].repeat, 3);
    }

    #[test]
    fn test_invalid_role() {
        let toml = "[image]\nformat = \"v1\"\n[[asset]]\nfile = \"a.wav\"\nrole = \"ringing\"\n";
        assert!(matches!(
            Manifest::from_toml_str(toml, Path::new(".")),
            Err(ManifestError::InvalidRole { index: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_format() {
        let toml = "[image]\nformat = \"v7\"\n";
        assert!(matches!(
            Manifest::from_toml_str(toml, Path::new(".")),
            Err(ManifestError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_format_is_required() {
        let toml = "[[asset]]\nfile = \"a.wav\"\nrole = 0\n";
        assert!(matches!(
            Manifest::from_toml_str(toml, Path::new(".")),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn test_load_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.wav"), encode(1, 8, 8000, &[0x80; 500])).unwrap();
        fs::write(dir.path().join("b.wav"), encode(1, 8, 8000, &[0x7F; 2000])).unwrap();
        let manifest_path = dir.path().join("image.toml");
        fs::write(
            &manifest_path,
            "[image]\nformat = \"v2\"\n\
             [[asset]]\nfile = \"a.wav\"\nrole = \"free\"\nweight = 1\n\
             [[asset]]\nfile = \"b.wav\"\nrole = \"music\"\nweight = 2\nrepeat = 4\n",
        )
        .unwrap();

        let manifest = Manifest::from_toml_file(&manifest_path).unwrap();
        let assets = manifest.load_assets().unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].payload.len(), 500);
        assert_eq!(assets[1].payload.len(), 2000);
        assert_eq!(assets[1].repeat, 4);
    }

    #[test]
    fn test_load_rejects_stereo() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("s.wav"), encode(2, 8, 8000, &[0; 10])).unwrap();
        let manifest = Manifest::from_toml_str(
            "[image]\nformat = \"v1\"\n[[asset]]\nfile = \"s.wav\"\nrole = 0\n",
            dir.path(),
        )
        .unwrap();
        match manifest.load_assets() {
            Err(ManifestError::Asset {
                source: WavError::Format(Error::UnsupportedSampleFormat { channels: 2, bits: 8 }),
                ..
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
