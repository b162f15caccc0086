// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command-level interface of a sector-erasable serial NOR flash.
//!
//! The sound store is written against this trait; [`super::at26f004::At26f004`] implements it
//! over an SPI bus, and tests use an in-memory model.

use crate::config::store::BLOCK_SIZE;

/// 24-bit flash address.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u32);

impl Address {
    pub const MASK: u32 = 0x00FF_FFFF;

    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr & Self::MASK)
    }

    /// From `[high, middle, low]` bytes as stored in the sound index.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
    }

    /// `[high, middle, low]` bytes, the order they go on the wire.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// 4 KiB block number, truncated to a byte.
    #[inline]
    pub const fn block(self) -> u8 {
        (self.0 / BLOCK_SIZE) as u8
    }

    /// First address of the following block.
    #[inline]
    pub const fn next_block(self) -> Self {
        Self::new((self.0 + BLOCK_SIZE) & !(BLOCK_SIZE - 1))
    }

    #[inline]
    pub const fn offset(self, n: u32) -> Self {
        Self::new(self.0 + n)
    }
}

impl From<u32> for Address {
    fn from(addr: u32) -> Self {
        Self::new(addr)
    }
}

/// Serial flash operations used by the sound store.
pub trait SerialFlash {
    type Error;

    /// The device is still erasing or programming.
    fn is_busy(&mut self) -> Result<bool, Self::Error>;

    /// Non-blocking readiness poll.
    fn poll_ready(&mut self) -> nb::Result<(), Self::Error> {
        match self.is_busy() {
            Ok(true) => Err(nb::Error::WouldBlock),
            Ok(false) => Ok(()),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }

    /// Busy-wait until the current erase or program cycle is over.
    fn wait_ready(&mut self) -> Result<(), Self::Error> {
        nb::block!(self.poll_ready())
    }

    /// Random read of `buf.len()` bytes.
    fn read(&mut self, addr: Address, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Single-byte read.
    fn read_byte(&mut self, addr: Address) -> Result<u8, Self::Error> {
        let mut b = [0u8];
        self.read(addr, &mut b)?;
        Ok(b[0])
    }

    /// Program one byte. Waits for the device, sets write-enable, then programs.
    fn program_byte(&mut self, addr: Address, data: u8) -> Result<(), Self::Error>;

    /// Enter sequential programming at `addr` and store `first` there.
    fn begin_sequential(&mut self, addr: Address, first: u8) -> Result<(), Self::Error>;

    /// Store `data` at the next sequential address.
    fn program_next(&mut self, data: u8) -> Result<(), Self::Error>;

    /// Leave programming mode.
    fn write_disable(&mut self) -> Result<(), Self::Error>;

    /// Unprotect everything and start a chip erase. Returns without waiting.
    fn erase_chip(&mut self) -> Result<(), Self::Error>;

    /// Erase one 4 KiB block and wait for it.
    fn erase_block(&mut self, block: u8) -> Result<(), Self::Error>;

    fn protect_sector(&mut self, addr: Address) -> Result<(), Self::Error>;

    fn unprotect_sector(&mut self, addr: Address) -> Result<(), Self::Error>;

    /// Open a streaming read at `addr`.
    fn begin_read(&mut self, addr: Address) -> Result<(), Self::Error>;

    /// Next byte of the open streaming read.
    fn read_next(&mut self) -> Result<u8, Self::Error>;

    fn end_read(&mut self) -> Result<(), Self::Error>;

    /// Enter deep power-down.
    fn power_down(&mut self) -> Result<(), Self::Error>;

    /// Leave deep power-down.
    fn resume(&mut self) -> Result<(), Self::Error>;
}
