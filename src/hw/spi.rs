// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Serial Peripheral Interface (SPI) abstraction layer.
//!
//! - `SpiBus` wraps a configured HAL SPI instance with 8-bit words.
//! - `ChipSelect` is an active-low GPIO output wrapper for manual CS control.
//!
//! Both implement the `embedded-hal` 1.0 traits the device drivers are written against.

use core::convert::Infallible;

use embedded_hal::{digital, spi as hal_spi};
use stm32f7xx_hal::{
    gpio::{self, Output, PinState, PushPull},
    prelude::*,
    spi::{self, Enabled, Spi},
};

/// Wrapper around an enabled HAL SPI instance (8-bit words).
pub struct SpiBus<I, P> {
    spi: Spi<I, P, Enabled<u8>>,
}

impl<I, P> SpiBus<I, P>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    pub fn new(spi: Spi<I, P, Enabled<u8>>) -> Self {
        Self { spi }
    }

    /// Perform a blocking, full-duplex transfer of one byte.
    pub fn transfer_byte(&mut self, byte: u8) -> Result<u8, spi::Error> {
        let mut tmp = [byte];
        self.spi.transfer(&mut tmp)?;
        Ok(tmp[0])
    }

    /// Send a byte, ignoring the response.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> Result<(), spi::Error> {
        let _ = self.transfer_byte(byte)?;
        Ok(())
    }

    /// Read a byte, sending 0x00.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8, spi::Error> {
        self.transfer_byte(0x00)
    }

    /// Transfer a byte buffer in-place.
    pub fn transfer_in_place(&mut self, buf: &mut [u8]) -> Result<(), spi::Error> {
        for b in buf.iter_mut() {
            *b = self.transfer_byte(*b)?;
        }
        Ok(())
    }

    pub fn free(self) -> Spi<I, P, Enabled<u8>> {
        self.spi
    }
}

/// HAL SPI error in `embedded-hal` 1.0 terms.
#[derive(Debug)]
pub struct SpiError(pub spi::Error);

impl hal_spi::Error for SpiError {
    fn kind(&self) -> hal_spi::ErrorKind {
        match self.0 {
            spi::Error::Overrun => hal_spi::ErrorKind::Overrun,
            spi::Error::ModeFault => hal_spi::ErrorKind::ModeFault,
            spi::Error::FrameFormat => hal_spi::ErrorKind::FrameFormat,
            #[allow(unreachable_patterns)]
            _ => hal_spi::ErrorKind::Other,
        }
    }
}

impl<I, P> hal_spi::ErrorType for SpiBus<I, P>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    type Error = SpiError;
}

impl<I, P> hal_spi::SpiBus<u8> for SpiBus<I, P>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    fn read(&mut self, words: &mut [u8]) -> Result<(), SpiError> {
        for w in words.iter_mut() {
            *w = self.read_byte().map_err(SpiError)?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), SpiError> {
        for &w in words {
            self.write_byte(w).map_err(SpiError)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), SpiError> {
        let len = read.len().max(write.len());
        for i in 0..len {
            let out = write.get(i).copied().unwrap_or(0);
            let byte = self.transfer_byte(out).map_err(SpiError)?;
            if let Some(slot) = read.get_mut(i) {
                *slot = byte;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), SpiError> {
        SpiBus::transfer_in_place(self, words).map_err(SpiError)
    }

    fn flush(&mut self) -> Result<(), SpiError> {
        Ok(())
    }
}

/// Manual chip-select line, active-low, generic over any GPIO pin.
pub struct ChipSelect<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Output<PushPull>>,
}

impl<const P: char, const N: u8> ChipSelect<P, N> {
    /// Create an active-low chip select and set to the inactive state (i.e., high).
    pub fn active_low<MODE>(pin: gpio::Pin<P, N, MODE>) -> Self {
        let mut pin = pin.into_push_pull_output();
        pin.set_state(PinState::High);
        Self { pin }
    }

    /// Assert the chip select.
    #[inline]
    pub fn select(&mut self) {
        self.pin.set_low();
    }

    /// Deassert the chip select.
    #[inline]
    pub fn deselect(&mut self) {
        self.pin.set_high();
    }

    pub fn free(self) -> gpio::Pin<P, N, Output<PushPull>> {
        self.pin
    }
}

impl<const P: char, const N: u8> digital::ErrorType for ChipSelect<P, N> {
    type Error = Infallible;
}

/// Low means selected.
impl<const P: char, const N: u8> digital::OutputPin for ChipSelect<P, N> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.deselect();
        Ok(())
    }
}
