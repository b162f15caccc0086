// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Radio front-end SPI port.
//!
//! Each byte is exchanged when it is written; the radio answers with an SPIACK edge, at which
//! point the received byte is already waiting in `last`.

use stm32f7xx_hal::spi;

use super::spi::{ChipSelect, SpiBus};
use crate::drivers::FramePort;

pub struct RfPort<I, P, const CP: char, const CN: u8> {
    spi: SpiBus<I, P>,
    cs: ChipSelect<CP, CN>,
    last: u8,
}

impl<I, P, const CP: char, const CN: u8> RfPort<I, P, CP, CN>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    pub fn new(spi: SpiBus<I, P>, cs: ChipSelect<CP, CN>) -> Self {
        Self { spi, cs, last: 0 }
    }

    pub fn free(self) -> (SpiBus<I, P>, ChipSelect<CP, CN>) {
        (self.spi, self.cs)
    }
}

impl<I, P, const CP: char, const CN: u8> FramePort for RfPort<I, P, CP, CN>
where
    I: spi::Instance,
    P: spi::Pins<I>,
{
    fn select(&mut self) {
        self.cs.select();
    }

    fn deselect(&mut self) {
        self.cs.deselect();
    }

    fn write(&mut self, byte: u8) {
        // A failed transfer reads back as zero.
        self.last = self.spi.transfer_byte(byte).unwrap_or(0);
    }

    fn read(&mut self) -> u8 {
        self.last
    }
}
