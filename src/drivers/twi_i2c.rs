// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! [`TwiPort`] on top of a blocking `embedded-hal` I2C master.
//!
//! The bus state machines expect a byte-level controller that reports a status after every
//! action. A blocking controller moves a whole transfer at once, so this adaptor performs the
//! transfer at the point where the state machine commits to it (address byte for reads, stop
//! for writes) and synthesizes the statuses the state machine would have seen.

use embedded_hal::i2c::I2c;

use super::twi::{TwiPort, TwiStatus};
use crate::protocol::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Start,
    Write,
    Read,
}

pub struct BlockingTwi<B: I2c> {
    bus: B,
    phase: Phase,
    addr: u8,
    buf: [u8; Record::SIZE],
    len: usize,
    idx: usize,
    event: Option<TwiStatus>,
}

impl<B: I2c> BlockingTwi<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            phase: Phase::Idle,
            addr: 0,
            buf: [0; Record::SIZE],
            len: 0,
            idx: 0,
            event: None,
        }
    }

    /// Status produced by the last action, to be fed back into the state machine.
    #[inline]
    pub fn take_event(&mut self) -> Option<TwiStatus> {
        self.event.take()
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn free(self) -> B {
        self.bus
    }
}

impl<B: I2c> TwiPort for BlockingTwi<B> {
    fn send_start(&mut self) {
        self.phase = Phase::Start;
        self.len = 0;
        self.idx = 0;
        self.event = Some(TwiStatus::Start);
    }

    fn send_stop(&mut self) {
        if self.phase == Phase::Write && self.len > 0 {
            let (addr, len) = (self.addr, self.len);
            if self.bus.write(addr, &self.buf[..len]).is_err() {
                self.event = Some(TwiStatus::MtDataNack);
            }
        }
        self.phase = Phase::Idle;
    }

    fn send_data(&mut self, byte: u8) {
        match self.phase {
            Phase::Start => {
                self.addr = byte >> 1;
                if byte & 1 != 0 {
                    self.phase = Phase::Read;
                    self.event = Some(match self.bus.read(self.addr, &mut self.buf) {
                        Ok(()) => TwiStatus::MrSlaAck,
                        Err(_) => TwiStatus::MrSlaNack,
                    });
                } else {
                    self.phase = Phase::Write;
                    self.event = Some(TwiStatus::MtSlaAck);
                }
            }
            Phase::Write => {
                if self.len < self.buf.len() {
                    self.buf[self.len] = byte;
                    self.len += 1;
                }
                self.event = Some(TwiStatus::MtDataAck);
            }
            Phase::Read | Phase::Idle => {}
        }
    }

    fn read_data(&mut self) -> u8 {
        let byte = self.buf.get(self.idx).copied().unwrap_or(0);
        self.idx += 1;
        byte
    }

    fn ack(&mut self) {
        if self.phase == Phase::Read {
            self.event = Some(TwiStatus::MrDataAck);
        }
    }

    fn nack(&mut self) {
        if self.phase == Phase::Read {
            self.event = Some(TwiStatus::MrDataNack);
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.event = None;
    }
}
