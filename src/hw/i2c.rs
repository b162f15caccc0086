// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! I2C1 slave port for the core processor, using direct PAC register access.
//!
//! The HAL only drives I2C as a master. This port configures the own address, enables the event
//! interrupts and translates each interrupt into the [`TwiStatus`] the slave state machine
//! expects. The master side on the companion uses the HAL's blocking driver through
//! [`crate::drivers::BlockingTwi`].

use stm32f7xx_hal::pac;

use crate::drivers::{TwiPort, TwiStatus};

// ISR / ICR bits
const TXE: u32 = 1 << 0;
const TXIS: u32 = 1 << 1;
const RXNE: u32 = 1 << 2;
const ADDR: u32 = 1 << 3;
const NACKF: u32 = 1 << 4;
const STOPF: u32 = 1 << 5;
const BERR: u32 = 1 << 8;
const ARLO: u32 = 1 << 9;
const DIR: u32 = 1 << 16;

// CR1 bits
const PE: u32 = 1 << 0;
const TXIE: u32 = 1 << 1;
const RXIE: u32 = 1 << 2;
const ADDRIE: u32 = 1 << 3;
const NACKIE: u32 = 1 << 4;
const STOPIE: u32 = 1 << 5;
const ERRIE: u32 = 1 << 7;

const OA1EN: u32 = 1 << 15;
const CR2_NACK: u32 = 1 << 15;

/// Data setup/hold timing for 100 kHz with a 16 MHz kernel clock.
const TIMING_100K: u32 = 0x0030_3D5B;

pub struct I2cSlave {
    i2c: pac::I2C1,
    transmitting: bool,
}

impl I2cSlave {
    /// Enable I2C1 as a slave answering at the 7-bit address `addr`.
    pub fn i2c1(i2c1: pac::I2C1, addr: u8) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.i2c1en().set_bit());

        let i2c = i2c1;
        i2c.cr1.write(|w| unsafe { w.bits(0) });
        i2c.timingr.write(|w| unsafe { w.bits(TIMING_100K) });
        i2c.oar1
            .write(|w| unsafe { w.bits(OA1EN | ((addr as u32) << 1)) });
        i2c.cr1.write(|w| unsafe {
            w.bits(PE | TXIE | RXIE | ADDRIE | NACKIE | STOPIE | ERRIE)
        });

        Self {
            i2c,
            transmitting: false,
        }
    }

    fn clear(&mut self, flags: u32) {
        self.i2c.icr.write(|w| unsafe { w.bits(flags) });
    }

    /// Translate the pending interrupt, if any, and acknowledge its flag.
    pub fn status(&mut self) -> Option<TwiStatus> {
        let isr = self.i2c.isr.read().bits();

        if isr & (BERR | ARLO) != 0 {
            self.clear(BERR | ARLO);
            return Some(TwiStatus::BusError);
        }

        if isr & ADDR != 0 {
            self.transmitting = isr & DIR != 0;
            if self.transmitting {
                // Drop whatever is left over in the transmit register.
                self.i2c.isr.write(|w| unsafe { w.bits(TXE) });
            }
            self.clear(ADDR);
            return Some(if self.transmitting {
                TwiStatus::StSlaAck
            } else {
                TwiStatus::SrSlaAck
            });
        }

        if isr & RXNE != 0 {
            return Some(TwiStatus::SrDataAck);
        }

        if isr & TXIS != 0 {
            return Some(TwiStatus::StDataAck);
        }

        if isr & NACKF != 0 {
            self.clear(NACKF);
            return Some(TwiStatus::StDataNack);
        }

        if isr & STOPF != 0 {
            self.clear(STOPF);
            if self.transmitting {
                self.transmitting = false;
                return None;
            }
            return Some(TwiStatus::SrStop);
        }

        None
    }

    pub fn free(self) -> pac::I2C1 {
        self.i2c
    }
}

impl TwiPort for I2cSlave {
    fn send_start(&mut self) {}

    /// Bus error recovery: cycle the peripheral.
    fn send_stop(&mut self) {
        self.i2c.cr1.modify(|r, w| unsafe { w.bits(r.bits() & !PE) });
        self.i2c.cr1.modify(|r, w| unsafe { w.bits(r.bits() | PE) });
    }

    fn send_data(&mut self, byte: u8) {
        self.i2c.txdr.write(|w| unsafe { w.bits(byte as u32) });
    }

    fn read_data(&mut self) -> u8 {
        self.i2c.rxdr.read().bits() as u8
    }

    fn ack(&mut self) {}

    fn nack(&mut self) {
        self.i2c.cr2.modify(|r, w| unsafe { w.bits(r.bits() | CR2_NACK) });
    }

    fn reset(&mut self) {}
}
