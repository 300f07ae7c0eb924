//! Concrete display drivers for the Ennea stack
//!
//! Currently one device: the STE2007 controller behind Nokia 1202 class
//! 96x68 monochrome panels, driven over its 9-bit SPI link.
//!
//! Drivers are written against the `ennea-hal` traits and expose the
//! `ennea-core` [`MonoDisplay`](ennea_core::MonoDisplay) capability, so
//! application code stays independent of the concrete panel.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod font;
pub mod ste2007;

pub use font::Font5x7;
pub use ste2007::{Ste2007, Ste2007Config};
