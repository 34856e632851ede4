//! CLI command implementations
//!
//! ## Image commands
//!
//! The `image` module builds and inspects image files without touching a
//! device.
//!
//! ## Device commands
//!
//! The `device` module opens a bootloader session and drives the loader
//! operations. Transfers report through the indicatif bars in `progress`.

pub mod device;
pub mod image;
mod progress;
