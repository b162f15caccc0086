// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Byte-level driver of the framed link to the radio front-end.
//!
//! The radio announces each frame with a TXE edge; the companion then clocks a whole frame out
//! and in, one byte per SPIACK edge. Both edges arrive as interrupts and call into this driver;
//! the main loop starts the transfer and picks up the finished frame.

use crate::config::link::FRAME_SIZE;
use crate::protocol::Frame;

/// SPI master access to the radio.
pub trait FramePort {
    /// Assert the radio chip select.
    fn select(&mut self);
    /// Release the radio chip select.
    fn deselect(&mut self);
    /// Load the next byte to shift out.
    fn write(&mut self, byte: u8);
    /// Byte shifted in by the last transfer.
    fn read(&mut self) -> u8;
}

/// Frame exchange state for one radio link.
pub struct RfLink<P: FramePort> {
    port: P,
    tx: Frame,
    rx: Frame,
    idx: usize,
    active: bool,
    request: bool,
    txe: bool,
    complete: bool,
    sent: bool,
}

impl<P: FramePort> RfLink<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            tx: Frame::new(),
            rx: Frame::new(),
            idx: 0,
            active: false,
            request: false,
            txe: false,
            complete: false,
            sent: true,
        }
    }

    /// TXE edge: the radio is ready for a new frame.
    pub fn on_txe(&mut self) {
        self.request = true;
        self.txe = true;
    }

    /// Main loop: start a requested transfer.
    pub fn poll_start(&mut self) -> bool {
        if !self.request {
            return false;
        }
        self.request = false;
        self.idx = 0;
        self.active = true;
        self.port.select();
        self.port.write(self.tx.as_bytes()[0]);
        true
    }

    /// SPIACK edge: one byte has been exchanged.
    pub fn on_ack(&mut self) {
        if !self.active {
            return;
        }
        self.rx.as_bytes_mut()[self.idx] = self.port.read();
        self.idx += 1;

        if self.idx == FRAME_SIZE {
            self.port.deselect();
            self.active = false;
            self.complete = true;
            self.sent = true;
        } else {
            self.port.write(self.tx.as_bytes()[self.idx]);
        }
    }

    /// A finished inbound frame, once.
    pub fn take_received(&mut self) -> Option<Frame> {
        if !self.complete {
            return None;
        }
        self.complete = false;
        Some(self.rx)
    }

    /// The frame to send on the next transfer.
    #[inline]
    pub fn outgoing_mut(&mut self) -> &mut Frame {
        &mut self.tx
    }

    #[inline]
    pub fn outgoing(&self) -> &Frame {
        &self.tx
    }

    /// A new command was loaded into the outgoing frame.
    #[inline]
    pub fn mark_pending(&mut self) {
        self.sent = false;
    }

    /// The outgoing command went out in a completed transfer.
    #[inline]
    pub fn command_sent(&self) -> bool {
        self.sent
    }

    /// The radio is waiting for this frame period's transfer.
    #[inline]
    pub fn txe_pending(&self) -> bool {
        self.txe
    }

    /// The outgoing frame for this period is ready.
    #[inline]
    pub fn clear_txe(&mut self) {
        self.txe = false;
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
