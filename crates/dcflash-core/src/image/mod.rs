//! Flash image format
//!
//! An image is a sequence of whole flash pages:
//!
//! ```text
//! page 0        header: signature, asset count, descriptor CRC, descriptors, 0xFF filler
//! page 1..      asset payloads in declaration order, each padded to its page span
//! ```
//!
//! Two revisions of the header exist. They differ in the signature and in
//! whether descriptors carry a repeat count; see [`FormatVersion`].

mod builder;
mod header;
pub(crate) mod record;

use core::fmt;
use core::str::FromStr;

use alloc::vec::Vec;

use crate::audio::{playable_frames, SampleSource};
use crate::error::{Error, Result};
use crate::geometry::{PAGE_COUNT, PAGE_SIZE};

pub use builder::{build, layout, FIRST_ASSET_PAGE};
pub use header::ImageHeader;

use record::{DESCRIPTOR_V1_SIZE, DESCRIPTOR_V2_SIZE, HEADER_PREFIX_SIZE};

/// Image format revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormatVersion {
    /// Original format, no repeat count
    V1,
    /// Descriptors carry a repeat count
    #[default]
    V2,
}

impl FormatVersion {
    /// All known revisions
    pub const ALL: [FormatVersion; 2] = [FormatVersion::V1, FormatVersion::V2];

    /// The 4-byte signature at the start of the header page
    pub const fn signature(self) -> &'static [u8; 4] {
        match self {
            Self::V1 => b"v1\r\n",
            Self::V2 => b"v2\r\n",
        }
    }

    /// Look up the revision for a header signature
    pub fn from_signature(sig: &[u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.signature() == sig)
    }

    /// Size of one serialized descriptor record
    pub const fn descriptor_size(self) -> usize {
        match self {
            Self::V1 => DESCRIPTOR_V1_SIZE,
            Self::V2 => DESCRIPTOR_V2_SIZE,
        }
    }

    /// Maximum number of descriptors that fit in the header page
    pub const fn max_assets(self) -> usize {
        let fit = (PAGE_SIZE - HEADER_PREFIX_SIZE) / self.descriptor_size();
        if fit > u8::MAX as usize {
            u8::MAX as usize
        } else {
            fit
        }
    }

    /// Guess the revision from a device version string such as `v2`
    pub fn from_device_version(version: &str) -> Option<Self> {
        let tag = version.split_whitespace().next()?;
        match tag {
            "v1" => Some(Self::V1),
            "v2" => Some(Self::V2),
            _ => None,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for FormatVersion {
    type Err = &'static str;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("v1") || s == "1" {
            Ok(Self::V1)
        } else if s.eq_ignore_ascii_case("v2") || s == "2" {
            Ok(Self::V2)
        } else {
            Err("unknown image format (expected v1 or v2)")
        }
    }
}

/// Playback purpose of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Played while the line is free
    Free,
    /// Music loop
    Music,
    /// Any other tag understood by the firmware
    Other(u8),
}

impl Role {
    /// Raw tag stored in the descriptor
    pub const fn code(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Music => 1,
            Self::Other(code) => code,
        }
    }
}

impl From<u8> for Role {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Free,
            1 => Self::Music,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Music => write!(f, "music"),
            Self::Other(code) => write!(f, "role#{}", code),
        }
    }
}

impl FromStr for Role {
    type Err = &'static str;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("free") {
            Ok(Self::Free)
        } else if s.eq_ignore_ascii_case("music") {
            Ok(Self::Music)
        } else {
            s.parse::<u8>()
                .map(Role::from)
                .map_err(|_| "unknown role (expected free, music or 0-255)")
        }
    }
}

/// One audio payload to place in the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Raw unsigned 8-bit mono PCM
    pub payload: Vec<u8>,
    /// Playback purpose
    pub role: Role,
    /// Selection weight
    pub weight: u8,
    /// Repeat count (only stored by [`FormatVersion::V2`])
    pub repeat: u8,
}

impl Asset {
    /// Create an asset with a repeat count of 1
    pub fn new(payload: Vec<u8>, role: Role, weight: u8) -> Self {
        Self {
            payload,
            role,
            weight,
            repeat: 1,
        }
    }

    /// Set the repeat count
    pub fn with_repeat(mut self, repeat: u8) -> Self {
        self.repeat = repeat;
        self
    }

    /// Create an asset from a sample source, rejecting anything but mono 8-bit
    pub fn from_source<S: SampleSource + ?Sized>(source: &S, role: Role, weight: u8) -> Result<Self> {
        let frames = playable_frames(source)?;
        Ok(Self::new(frames.to_vec(), role, weight))
    }
}

/// Placement and metadata of one asset in the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Playback purpose
    pub role: Role,
    /// Selection weight
    pub weight: u8,
    /// Repeat count; always 1 when decoded from a v1 header
    pub repeat: u8,
    /// First flash page of the payload
    pub start_page: u16,
    /// Number of complete pages (`len / PAGE_SIZE`)
    pub pages: u16,
    /// Bytes used in the final page (`len % PAGE_SIZE`)
    pub tail_length: u16,
}

impl AssetDescriptor {
    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        self.pages as usize * PAGE_SIZE + self.tail_length as usize
    }

    /// Pages reserved for the payload in the image
    pub fn page_span(&self) -> usize {
        self.pages as usize + 1
    }
}

/// A built flash image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    header: ImageHeader,
    data: Vec<u8>,
}

impl Image {
    /// Decoded header
    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    /// Descriptors in flash order
    pub fn descriptors(&self) -> &[AssetDescriptor] {
        &self.header.descriptors
    }

    /// Raw image bytes (always whole pages)
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the raw image bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Image length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image is empty (never true for a built image)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of flash pages the image occupies
    pub fn page_count(&self) -> usize {
        self.data.len() / PAGE_SIZE
    }

    /// Check that the image fits in the device flash
    ///
    /// [`build`] does not enforce this, so callers that target real
    /// hardware should.
    pub fn check_capacity(&self) -> Result<()> {
        let pages = self.page_count();
        if pages > PAGE_COUNT {
            return Err(Error::ImageTooLarge {
                pages,
                available: PAGE_COUNT,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_signatures() {
        assert_eq!(FormatVersion::V1.signature(), b"v1\r\n");
        assert_eq!(FormatVersion::from_signature(b"v2\r\n"), Some(FormatVersion::V2));
        assert_eq!(FormatVersion::from_signature(b"v3\r\n"), None);
    }

    #[test]
    fn test_max_assets() {
        assert_eq!(FormatVersion::V1.max_assets(), (1056 - 7) / 8);
        assert_eq!(FormatVersion::V2.max_assets(), (1056 - 7) / 9);
    }

    #[test]
    fn test_format_from_device_version() {
        assert_eq!(FormatVersion::from_device_version("v2"), Some(FormatVersion::V2));
        assert_eq!(FormatVersion::from_device_version("v1 beta"), Some(FormatVersion::V1));
        assert_eq!(FormatVersion::from_device_version("fw-2.1"), None);
        assert_eq!(FormatVersion::from_device_version(""), None);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("free".parse::<Role>(), Ok(Role::Free));
        assert_eq!("Music".parse::<Role>(), Ok(Role::Music));
        assert_eq!("1".parse::<Role>(), Ok(Role::Music));
        assert_eq!("7".parse::<Role>(), Ok(Role::Other(7)));
        assert!("ringing".parse::<Role>().is_err());
        assert_eq!(Role::from(Role::Other(9).code()), Role::Other(9));
    }

    #[test]
    fn test_descriptor_lengths() {
        let d = AssetDescriptor {
            role: Role::Free,
            weight: 0,
            repeat: 1,
            start_page: 2,
            pages: 1,
            tail_length: 944,
        };
        assert_eq!(d.payload_len(), 2000);
        assert_eq!(d.page_span(), 2);
    }
}
