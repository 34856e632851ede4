//! Minimal RIFF/WAVE reader
//!
//! Only uncompressed PCM is understood. The `fmt ` and `data` chunks are
//! required; anything else (`LIST`, `fact`, ...) is skipped.

use std::fs;
use std::path::Path;

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use crate::audio::SampleSource;
use crate::error::Error;

const WAVE_FORMAT_PCM: u16 = 1;

#[repr(C)]
#[derive(Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[allow(dead_code)]
struct RiffHeader {
    riff: [u8; 4],
    size: U32,
    wave: [u8; 4],
}

#[repr(C)]
#[derive(Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
struct ChunkHeader {
    id: [u8; 4],
    size: U32,
}

#[repr(C)]
#[derive(Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[allow(dead_code)]
struct FmtChunk {
    format_tag: U16,
    channels: U16,
    sample_rate: U32,
    byte_rate: U32,
    block_align: U16,
    bits_per_sample: U16,
}

/// Errors from loading a WAV file
#[derive(Debug, thiserror::Error)]
pub enum WavError {
    /// File could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents are not a PCM WAVE stream
    #[error("{0}")]
    Format(#[from] Error),
}

/// Decoded PCM WAVE file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavFile {
    channels: u16,
    bits: u16,
    sample_rate: u32,
    frames: Vec<u8>,
}

impl WavFile {
    /// Read and decode a WAV file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WavError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let wav = Self::parse(&data)?;
        log::debug!(
            "{}: {} ch, {} bit, {} Hz, {} bytes of frames",
            path.display(),
            wav.channels,
            wav.bits,
            wav.sample_rate,
            wav.frames.len()
        );
        Ok(wav)
    }

    /// Decode a WAV file held in memory
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let (riff, mut rest) = RiffHeader::read_from_prefix(data).map_err(|_| Error::InvalidWav)?;
        if &riff.riff != b"RIFF" || &riff.wave != b"WAVE" {
            return Err(Error::InvalidWav);
        }

        let mut fmt: Option<FmtChunk> = None;
        let mut frames: Option<&[u8]> = None;

        while !rest.is_empty() {
            let (chunk, body) = ChunkHeader::read_from_prefix(rest).map_err(|_| Error::InvalidWav)?;
            let size = chunk.size.get() as usize;
            if body.len() < size {
                return Err(Error::InvalidWav);
            }
            let (content, after) = body.split_at(size);

            match &chunk.id {
                b"fmt " => {
                    let (f, _) = FmtChunk::read_from_prefix(content).map_err(|_| Error::InvalidWav)?;
                    fmt = Some(f);
                }
                b"data" => frames = Some(content),
                other => log::trace!("wav: skipping chunk {:?}", String::from_utf8_lossy(other)),
            }

            // Chunks are padded to an even length
            rest = if size % 2 == 1 && !after.is_empty() {
                &after[1..]
            } else {
                after
            };
        }

        let fmt = fmt.ok_or(Error::InvalidWav)?;
        let frames = frames.ok_or(Error::InvalidWav)?;
        if fmt.format_tag.get() != WAVE_FORMAT_PCM {
            return Err(Error::InvalidWav);
        }

        Ok(Self {
            channels: fmt.channels.get(),
            bits: fmt.bits_per_sample.get(),
            sample_rate: fmt.sample_rate.get(),
            frames: frames.to_vec(),
        })
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl SampleSource for WavFile {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_width_bits(&self) -> u16 {
        self.bits
    }

    fn frames(&self) -> &[u8] {
        &self.frames
    }
}

/// Encode PCM frames as a WAV file
///
/// Used to produce fixtures and to export assets read back from a device.
pub fn encode(channels: u16, bits: u16, sample_rate: u32, frames: &[u8]) -> Vec<u8> {
    let block_align = channels * bits.div_ceil(8);
    let byte_rate = sample_rate * block_align as u32;

    let mut out = Vec::with_capacity(44 + frames.len() + 1);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&(frames.len() as u32).to_le_bytes());
    out.extend_from_slice(frames);
    if frames.len() % 2 == 1 {
        out.push(0);
    }

    let riff_size = (out.len() - 8) as u32;
    out[4..8].copy_from_slice(&riff_size.to_le_bytes());
    out
}
