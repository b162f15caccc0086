// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! AT26F004 4-Mbit SPI serial flash.
//!
//! Opcode framing for the commands the sound store needs. The device is generic over any
//! `embedded-hal` SPI bus (mode 0 or 3, MSB first) and an active-low chip-select pin that this
//! driver toggles around each command.

use super::serial_flash::{Address, SerialFlash};

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

// Command opcodes
pub mod op {
    pub const READ_ARRAY: u8 = 0x0B;
    pub const READ_ARRAY_LOW_F: u8 = 0x03;
    pub const BLOCK_ERASE_4K: u8 = 0x20;
    pub const BLOCK_ERASE_32K: u8 = 0x52;
    pub const BLOCK_ERASE_64K: u8 = 0xD8;
    pub const CHIP_ERASE: u8 = 0x60;
    pub const BYTE_PROGRAM: u8 = 0x02;
    pub const SEQU_PROGRAM: u8 = 0xAF;
    pub const WRITE_EN: u8 = 0x06;
    pub const WRITE_DIS: u8 = 0x04;
    pub const PROTECT_SECTOR: u8 = 0x36;
    pub const UNPROTECT_SECTOR: u8 = 0x39;
    pub const READ_SECT_PROTECT: u8 = 0x3C;
    pub const READ_STATUS_REG: u8 = 0x05;
    pub const WRITE_STATUS_REG: u8 = 0x01;
    pub const DEEP_POWER_MODE: u8 = 0xB9;
    pub const RESUME_DEEP_MODE: u8 = 0xAB;
    pub const NOP: u8 = 0x00;
}

/// First address of each protectable sector.
pub const SECTORS: [u32; 11] = [
    0x00_0000, 0x01_0000, 0x02_0000, 0x03_0000, 0x04_0000, 0x05_0000, 0x06_0000, 0x07_0000,
    0x07_8000, 0x07_A000, 0x07_C000,
];

/// Status register.
#[derive(Copy, Clone, Debug)]
pub struct Status {
    raw: u8,
}

impl Status {
    #[inline]
    pub fn raw(&self) -> u8 {
        self.raw
    }

    /// Erase or program cycle in progress.
    #[inline]
    pub fn busy(&self) -> bool {
        (self.raw & 0x01) != 0
    }

    /// Write enable latch.
    #[inline]
    pub fn wel(&self) -> bool {
        (self.raw & 0x02) != 0
    }

    /// Software protection status, two bits.
    #[inline]
    pub fn swp(&self) -> u8 {
        (self.raw & 0x0C) >> 2
    }

    /// Write protect pin state.
    #[inline]
    pub fn wpp(&self) -> bool {
        (self.raw & 0x10) != 0
    }

    /// Sequential program mode active.
    #[inline]
    pub fn spm(&self) -> bool {
        (self.raw & 0x40) != 0
    }

    /// Sector protection registers locked.
    #[inline]
    pub fn sprl(&self) -> bool {
        (self.raw & 0x80) != 0
    }
}

/// Bus or pin failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<S, P> {
    Spi(S),
    Pin(P),
}

/// AT26F004 bound to its SPI bus and chip-select line.
pub struct At26f004<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> At26f004<SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    /// Take the bus and chip select; the device is left deselected.
    pub fn new(spi: SPI, mut cs: CS) -> Result<Self, Error<SPI::Error, CS::Error>> {
        cs.set_high().map_err(Error::Pin)?;
        Ok(Self { spi, cs })
    }

    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn select(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.cs.set_low().map_err(Error::Pin)
    }

    fn deselect(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.spi.flush().map_err(Error::Spi)?;
        self.cs.set_high().map_err(Error::Pin)
    }

    /// Run one complete command with chip select asserted around it.
    fn command(&mut self, bytes: &[u8]) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.select()?;
        let res = self.spi.write(bytes).map_err(Error::Spi);
        self.deselect()?;
        res
    }

    fn addressed(opcode: u8, addr: Address) -> [u8; 4] {
        let [a2, a1, a0] = addr.to_bytes();
        [opcode, a2, a1, a0]
    }

    pub fn read_status(&mut self) -> Result<Status, Error<SPI::Error, CS::Error>> {
        let mut buf = [op::READ_STATUS_REG, op::NOP];
        self.select()?;
        let res = self.spi.transfer_in_place(&mut buf).map_err(Error::Spi);
        self.deselect()?;
        res?;
        Ok(Status { raw: buf[1] })
    }

    pub fn write_status(&mut self, status: u8) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.command(&[op::WRITE_STATUS_REG, status])
    }

    pub fn write_enable(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.command(&[op::WRITE_EN])
    }

    /// Clear the global protection bits and unprotect every sector.
    pub fn unprotect_all(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.write_status(0x00)?;
        for sector in SECTORS {
            self.unprotect_sector(Address::new(sector))?;
        }
        Ok(())
    }
}

impl<SPI, CS> SerialFlash for At26f004<SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    type Error = Error<SPI::Error, CS::Error>;

    fn is_busy(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_status()?.busy())
    }

    fn read(&mut self, addr: Address, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.select()?;
        let res = self
            .spi
            .write(&Self::addressed(op::READ_ARRAY_LOW_F, addr))
            .and_then(|_| self.spi.read(buf))
            .map_err(Error::Spi);
        self.deselect()?;
        res
    }

    fn program_byte(&mut self, addr: Address, data: u8) -> Result<(), Self::Error> {
        self.wait_ready()?;
        self.write_enable()?;
        let [o, a2, a1, a0] = Self::addressed(op::BYTE_PROGRAM, addr);
        self.command(&[o, a2, a1, a0, data])
    }

    fn begin_sequential(&mut self, addr: Address, first: u8) -> Result<(), Self::Error> {
        self.write_enable()?;
        let [o, a2, a1, a0] = Self::addressed(op::SEQU_PROGRAM, addr);
        self.command(&[o, a2, a1, a0, first])
    }

    fn program_next(&mut self, data: u8) -> Result<(), Self::Error> {
        self.command(&[op::SEQU_PROGRAM, data])
    }

    fn write_disable(&mut self) -> Result<(), Self::Error> {
        self.command(&[op::WRITE_DIS])
    }

    fn erase_chip(&mut self) -> Result<(), Self::Error> {
        self.unprotect_all()?;
        self.write_enable()?;
        self.command(&[op::CHIP_ERASE])
    }

    fn erase_block(&mut self, block: u8) -> Result<(), Self::Error> {
        self.unprotect_all()?;
        self.write_enable()?;
        self.command(&[op::BLOCK_ERASE_4K, block >> 4, block << 4, 0x00])?;
        self.wait_ready()
    }

    fn protect_sector(&mut self, addr: Address) -> Result<(), Self::Error> {
        self.write_enable()?;
        self.command(&Self::addressed(op::PROTECT_SECTOR, addr))
    }

    fn unprotect_sector(&mut self, addr: Address) -> Result<(), Self::Error> {
        self.write_enable()?;
        self.command(&Self::addressed(op::UNPROTECT_SECTOR, addr))
    }

    fn begin_read(&mut self, addr: Address) -> Result<(), Self::Error> {
        self.select()?;
        self.spi
            .write(&Self::addressed(op::READ_ARRAY_LOW_F, addr))
            .map_err(Error::Spi)
    }

    fn read_next(&mut self) -> Result<u8, Self::Error> {
        let mut b = [op::NOP];
        self.spi.transfer_in_place(&mut b).map_err(Error::Spi)?;
        Ok(b[0])
    }

    fn end_read(&mut self) -> Result<(), Self::Error> {
        self.deselect()
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        self.command(&[op::DEEP_POWER_MODE])
    }

    fn resume(&mut self) -> Result<(), Self::Error> {
        self.command(&[op::RESUME_DEEP_MODE])
    }
}
