//! Board-agnostic core logic for the Ennea LCD driver stack
//!
//! Everything here is independent of a concrete controller or bus:
//!
//! - [`txn::TxnBuffer`] - bounded byte-to-word transaction buffer that
//!   adapts 8-bit data into tagged 16-bit SPI frames
//! - [`display`] - the `MonoDisplay` capability trait, error type, line
//!   clear policy and glyph table seam shared by concrete drivers

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod display;
pub mod txn;

pub use display::{DisplayError, GlyphTable, LineClearPolicy, MonoDisplay};
pub use txn::TxnBuffer;
