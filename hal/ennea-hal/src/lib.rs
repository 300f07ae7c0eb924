//! Ennea Hardware Abstraction Layer
//!
//! Trait seams between the display protocol engine and the actual
//! peripherals. The engine in `ennea-drivers` is written against these
//! traits only, so it runs unchanged on any chip whose HAL can clock out
//! 16-bit SPI words and wiggle a GPIO pin.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │  ennea-drivers (protocol engine)     │
//! └──────────────────────────────────────┘
//!                   │
//!                   ▼
//! ┌──────────────────────────────────────┐
//! │  ennea-hal (this crate - traits)     │
//! └──────────────────────────────────────┘
//!                   │
//!        ┌──────────┴──────────┐
//!        ▼                     ▼
//! ┌──────────────┐     ┌───────────────────┐
//! │ chip HAL via │     │ bespoke bit-bang  │
//! │ compat::*    │     │ implementations   │
//! └──────────────┘     └───────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`spi::SpiWordBus`] - blocking 16-bit word transport
//! - [`gpio::OutputPin`] - chip-select and backlight control
//!
//! [`compat`] bridges `embedded-hal` 1.0 peripherals onto these traits.

#![no_std]
#![deny(unsafe_code)]

pub mod compat;
pub mod gpio;
pub mod spi;

pub use gpio::OutputPin;
pub use spi::{Mode, SpiConfig, SpiWordBus};
