//! dcflash-core - Flash image format for the DISCONNECT audio phone
//!
//! This crate knows how the phone's AT45 DataFlash is laid out: the page
//! geometry, the header page with its descriptor table, and how audio
//! payloads are placed after it. It does no I/O besides optional file
//! loading, so the same code can decode images on the device side.
//!
//! # Features
//!
//! - `std` - Enable WAV file loading, TOML manifests and `std::error::Error`
//!
//! # Example
//!
//! ```
//! use dcflash_core::image::{build, Asset, FormatVersion, Role};
//! use dcflash_core::geometry::PAGE_SIZE;
//!
//! let assets = [Asset::new(vec![0x80; 500], Role::Music, 10)];
//! let image = build(&assets, FormatVersion::V2).unwrap();
//! assert_eq!(image.len(), 2 * PAGE_SIZE);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

pub mod audio;
pub mod crc;
pub mod error;
pub mod geometry;
pub mod image;
#[cfg(feature = "std")]
pub mod manifest;
#[cfg(feature = "std")]
pub mod wav;

pub use error::{Error, Result};
