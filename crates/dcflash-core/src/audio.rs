//! Audio sample sources
//!
//! The phone plays unsigned 8-bit mono PCM straight out of flash, so the
//! image builder only needs the raw frame bytes. Decoding containers is left
//! to implementors of [`SampleSource`].

use alloc::vec::Vec;

use crate::error::{Error, Result};

/// Channel count the device can play
pub const REQUIRED_CHANNELS: u16 = 1;
/// Sample width the device can play
pub const REQUIRED_SAMPLE_BITS: u16 = 8;

/// A provider of raw PCM frames
pub trait SampleSource {
    /// Number of interleaved channels
    fn channels(&self) -> u16;

    /// Bits per sample
    fn sample_width_bits(&self) -> u16;

    /// Raw frame bytes
    fn frames(&self) -> &[u8];

    /// Frame data length in bytes
    fn len(&self) -> usize {
        self.frames().len()
    }

    /// Whether the source holds no frames
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check that `source` is mono 8-bit and return its frames
pub fn playable_frames<S: SampleSource + ?Sized>(source: &S) -> Result<&[u8]> {
    let channels = source.channels();
    let bits = source.sample_width_bits();
    if channels != REQUIRED_CHANNELS || bits != REQUIRED_SAMPLE_BITS {
        return Err(Error::UnsupportedSampleFormat { channels, bits });
    }
    Ok(source.frames())
}

/// In-memory PCM data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPcm {
    channels: u16,
    bits: u16,
    frames: Vec<u8>,
}

impl RawPcm {
    /// Mono 8-bit frames
    pub fn mono8(frames: Vec<u8>) -> Self {
        Self::new(REQUIRED_CHANNELS, REQUIRED_SAMPLE_BITS, frames)
    }

    /// Frames in an arbitrary format
    pub fn new(channels: u16, bits: u16, frames: Vec<u8>) -> Self {
        Self {
            channels,
            bits,
            frames,
        }
    }

    /// Take the frame bytes
    pub fn into_frames(self) -> Vec<u8> {
        self.frames
    }
}

impl SampleSource for RawPcm {
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
