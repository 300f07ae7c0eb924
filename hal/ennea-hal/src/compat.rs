//! Adapters for `embedded-hal` 1.0 peripherals
//!
//! Chip HALs that already implement the `embedded-hal` traits plug into the
//! Ennea seams through these newtypes instead of hand-written glue.

use crate::gpio::OutputPin;
use crate::spi::SpiWordBus;

/// Wraps an `embedded_hal::spi::SpiBus<u16>` as an [`SpiWordBus`].
///
/// `transfer` flushes after writing so the all-or-nothing contract holds
/// even on buses that buffer internally.
pub struct CompatSpi<T>(pub T);

impl<T> SpiWordBus for CompatSpi<T>
where
    T: embedded_hal::spi::SpiBus<u16>,
{
    type Error = T::Error;

    fn transfer(&mut self, words: &[u16]) -> Result<(), Self::Error> {
        self.0.write(words)?;
        self.0.flush()
    }
}

/// Wraps an `embedded_hal::digital::OutputPin` as an [`OutputPin`].
///
/// Pin errors are discarded; the Ennea seam treats GPIO writes as
/// infallible.
pub struct CompatPin<T>(pub T);

impl<T> OutputPin for CompatPin<T>
where
    T: embedded_hal::digital::OutputPin,
{
    fn set_high(&mut self) {
        let _ = self.0.set_high();
    }

    fn set_low(&mut self) {
        let _ = self.0.set_low();
    }
}
