// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Two-wire bus link between the companion (permanent master) and the core (addressed slave).
//!
//! Both roles are event-driven state machines. The bus interrupt decodes the controller status
//! into a [`TwiStatus`] and hands it to [`BusMaster::on_event`] or [`BusSlave::on_event`], which
//! perform one bounded step and return. Register access goes through [`TwiPort`], so tests drive
//! the state machines with scripted events.
//!
//! Every transaction carries exactly one 4-byte command record.

use crate::error::LinkError;
use crate::protocol::Record;

use core::fmt;

/// Controller status after a bus event. Codes follow the classic TWI status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwiStatus {
    Start,
    RepeatedStart,
    MtSlaAck,
    MtSlaNack,
    MtDataAck,
    MtDataNack,
    ArbitrationLost,
    MrSlaAck,
    MrSlaNack,
    MrDataAck,
    MrDataNack,
    SrSlaAck,
    SrArbLostSlaAck,
    SrGcallAck,
    SrArbLostGcallAck,
    SrDataAck,
    SrDataNack,
    SrGcallDataAck,
    SrGcallDataNack,
    SrStop,
    StSlaAck,
    StArbLostSlaAck,
    StDataAck,
    StDataNack,
    StLastData,
    NoInfo,
    BusError,
}

impl TwiStatus {
    /// Decode a status register value (prescaler bits masked off).
    pub fn from_code(code: u8) -> Self {
        match code & 0xF8 {
            0x08 => TwiStatus::Start,
            0x10 => TwiStatus::RepeatedStart,
            0x18 => TwiStatus::MtSlaAck,
            0x20 => TwiStatus::MtSlaNack,
            0x28 => TwiStatus::MtDataAck,
            0x30 => TwiStatus::MtDataNack,
            0x38 => TwiStatus::ArbitrationLost,
            0x40 => TwiStatus::MrSlaAck,
            0x48 => TwiStatus::MrSlaNack,
            0x50 => TwiStatus::MrDataAck,
            0x58 => TwiStatus::MrDataNack,
            0x60 => TwiStatus::SrSlaAck,
            0x68 => TwiStatus::SrArbLostSlaAck,
            0x70 => TwiStatus::SrGcallAck,
            0x78 => TwiStatus::SrArbLostGcallAck,
            0x80 => TwiStatus::SrDataAck,
            0x88 => TwiStatus::SrDataNack,
            0x90 => TwiStatus::SrGcallDataAck,
            0x98 => TwiStatus::SrGcallDataNack,
            0xA0 => TwiStatus::SrStop,
            0xA8 => TwiStatus::StSlaAck,
            0xB0 => TwiStatus::StArbLostSlaAck,
            0xB8 => TwiStatus::StDataAck,
            0xC0 => TwiStatus::StDataNack,
            0xC8 => TwiStatus::StLastData,
            0x00 => TwiStatus::BusError,
            _ => TwiStatus::NoInfo,
        }
    }
}

/// Register-level access to a TWI controller.
pub trait TwiPort {
    /// Generate a START (or a repeated START if the bus is still owned).
    fn send_start(&mut self);
    /// Generate a STOP and release the bus.
    fn send_stop(&mut self);
    /// Load a byte and continue the transfer.
    fn send_data(&mut self, byte: u8);
    /// Last byte received.
    fn read_data(&mut self) -> u8;
    /// Continue and acknowledge the next received byte.
    fn ack(&mut self);
    /// Continue and refuse the next received byte.
    fn nack(&mut self);
    /// Back to not-addressed slave; a pending START request is kept.
    fn reset(&mut self);
}

/// Progress of a bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    Idle,
    Busy,
    /// Written and acknowledged up to the stop.
    Acked,
    /// Address or data refused by the slave.
    Nacked,
    /// Read buffer filled.
    Full,
    /// Another master won the bus; the request is dropped.
    ArbitrationLost,
}

/// A bus request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// A transaction is already running.
    Busy,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Busy => f.write_str("bus busy"),
        }
    }
}

/// One request/response exchange on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusMessage {
    pub addr: u8,
    pub len: usize,
    pub buf: [u8; Record::SIZE],
    pub state: BusState,
}

impl BusMessage {
    pub const fn new() -> Self {
        Self {
            addr: 0,
            len: Record::SIZE,
            buf: [0; Record::SIZE],
            state: BusState::Idle,
        }
    }

    /// The buffer as a record, if it holds a full one.
    pub fn record(&self) -> Option<Record> {
        Record::from_slice(&self.buf[..self.len])
    }
}

impl Default for BusMessage {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Write,
    Read,
}

/// Master side of the bus.
pub struct BusMaster<P: TwiPort> {
    port: P,
    state: BusState,
    dir: Direction,
    sla_rw: u8,
    idx: usize,
    outgoing: BusMessage,
    incoming: BusMessage,
}

impl<P: TwiPort> BusMaster<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            state: BusState::Idle,
            dir: Direction::Write,
            sla_rw: 0,
            idx: 0,
            outgoing: BusMessage::new(),
            incoming: BusMessage::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> BusState {
        self.state
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.state == BusState::Busy
    }

    /// Last write request and its outcome.
    #[inline]
    pub fn outgoing(&self) -> &BusMessage {
        &self.outgoing
    }

    /// Last read request and its outcome.
    #[inline]
    pub fn incoming(&self) -> &BusMessage {
        &self.incoming
    }

    /// Forget any finished or abandoned transaction.
    pub fn clear(&mut self) {
        self.state = BusState::Idle;
        self.outgoing.state = BusState::Idle;
        self.incoming.state = BusState::Idle;
    }

    /// Start writing `record` to the slave at `addr`.
    pub fn send(&mut self, addr: u8, record: Record) -> Result<(), BusError> {
        if self.is_busy() {
            return Err(BusError::Busy);
        }
        self.outgoing.addr = addr;
        self.outgoing.len = Record::SIZE;
        self.outgoing.buf = record.into_bytes();
        self.start(Direction::Write);
        Ok(())
    }

    /// Retry the last write, typically after it was `Nacked`.
    pub fn resend(&mut self) -> Result<(), BusError> {
        if self.is_busy() {
            return Err(BusError::Busy);
        }
        self.start(Direction::Write);
        Ok(())
    }

    /// Start reading one record from the slave at `addr`.
    pub fn read(&mut self, addr: u8) -> Result<(), BusError> {
        if self.is_busy() {
            return Err(BusError::Busy);
        }
        self.incoming.addr = addr;
        self.incoming.len = Record::SIZE;
        self.incoming.buf = [0; Record::SIZE];
        self.start(Direction::Read);
        Ok(())
    }

    fn start(&mut self, dir: Direction) {
        self.dir = dir;
        let msg = self.active_mut();
        msg.state = BusState::Busy;
        let addr = msg.addr;
        self.sla_rw = match dir {
            Direction::Write => addr << 1,
            Direction::Read => (addr << 1) | 1,
        };
        self.idx = 0;
        self.state = BusState::Busy;
        self.port.send_start();
    }

    fn active_mut(&mut self) -> &mut BusMessage {
        match self.dir {
            Direction::Write => &mut self.outgoing,
            Direction::Read => &mut self.incoming,
        }
    }

    fn finish(&mut self, state: BusState) {
        self.state = state;
        self.active_mut().state = state;
    }

    /// Advance the transaction after a bus event. `on_read` sees a completed read.
    pub fn on_event(&mut self, status: TwiStatus, on_read: impl FnOnce(&BusMessage)) {
        match status {
            TwiStatus::Start | TwiStatus::RepeatedStart => self.port.send_data(self.sla_rw),

            TwiStatus::MtSlaAck | TwiStatus::MtDataAck => {
                if self.idx < self.outgoing.len {
                    let byte = self.outgoing.buf[self.idx];
                    self.idx += 1;
                    self.port.send_data(byte);
                } else {
                    self.port.send_stop();
                    self.finish(BusState::Acked);
                }
            }

            TwiStatus::ArbitrationLost => {
                self.port.reset();
                self.finish(BusState::ArbitrationLost);
            }

            TwiStatus::MrDataAck | TwiStatus::MrSlaAck => {
                if status == TwiStatus::MrDataAck {
                    self.store_incoming();
                }
                // Refuse the last byte before it arrives.
                if self.idx + 1 < self.incoming.len {
                    self.port.ack();
                } else {
                    self.port.nack();
                }
            }

            TwiStatus::MrDataNack => {
                self.store_incoming();
                self.finish(BusState::Full);
                on_read(&self.incoming);
                self.port.send_stop();
            }

            TwiStatus::MtSlaNack | TwiStatus::MrSlaNack | TwiStatus::MtDataNack => {
                self.finish(BusState::Nacked);
                self.port.send_stop();
            }

            TwiStatus::BusError => self.port.send_stop(),

            _ => {}
        }
    }

    fn store_incoming(&mut self) {
        let byte = self.port.read_data();
        if self.idx < self.incoming.buf.len() {
            self.incoming.buf[self.idx] = byte;
            self.idx += 1;
        }
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn free(self) -> P {
        self.port
    }
}

/// Services the slave role calls into.
pub trait SlaveHandler {
    /// A complete record was written by the master.
    fn on_receive(&mut self, record: Record) -> Result<(), LinkError>;

    /// The master wants to read. Fill `buf` and return `true`, or return `false` to send idle
    /// bytes.
    fn on_transmit(&mut self, buf: &mut [u8; Record::SIZE]) -> Result<bool, LinkError>;
}

/// Slave side of the bus.
pub struct BusSlave<P: TwiPort> {
    port: P,
    state: BusState,
    rx: [u8; Record::SIZE],
    rx_idx: usize,
    tx: [u8; Record::SIZE],
    tx_idx: usize,
}

impl<P: TwiPort> BusSlave<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            state: BusState::Idle,
            rx: [0; Record::SIZE],
            rx_idx: 0,
            tx: [0; Record::SIZE],
            tx_idx: Record::SIZE,
        }
    }

    #[inline]
    pub fn state(&self) -> BusState {
        self.state
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.state == BusState::Busy
    }

    /// Advance after a bus event. Handler errors are passed up unchanged; the offending record
    /// has already been dropped.
    pub fn on_event<H: SlaveHandler>(
        &mut self,
        status: TwiStatus,
        handler: &mut H,
    ) -> Result<(), LinkError> {
        match status {
            TwiStatus::SrSlaAck
            | TwiStatus::SrArbLostSlaAck
            | TwiStatus::SrGcallAck
            | TwiStatus::SrArbLostGcallAck => {
                self.state = BusState::Busy;
                self.rx_idx = 0;
                self.port.ack();
            }

            TwiStatus::SrDataAck | TwiStatus::SrGcallDataAck => {
                let byte = self.port.read_data();
                if self.rx_idx < Record::SIZE {
                    self.rx[self.rx_idx] = byte;
                    self.rx_idx += 1;
                }
                if self.rx_idx < Record::SIZE {
                    self.port.ack();
                } else {
                    self.port.nack();
                }
            }

            TwiStatus::SrDataNack | TwiStatus::SrGcallDataNack => self.port.reset(),

            TwiStatus::SrStop => {
                self.state = BusState::Idle;
                self.port.reset();
                let complete = self.rx_idx == Record::SIZE;
                self.rx_idx = 0;
                if !complete {
                    return Err(LinkError::InvalidReceiveLength);
                }
                return handler.on_receive(Record::from_bytes(self.rx));
            }

            TwiStatus::StSlaAck | TwiStatus::StArbLostSlaAck => {
                self.state = BusState::Busy;
                self.tx_idx = Record::SIZE;
                let produced = handler.on_transmit(&mut self.tx);
                if let Ok(true) = produced {
                    self.tx_idx = 0;
                }
                self.transmit_next();
                return produced.map(|_| ());
            }

            TwiStatus::StDataAck => self.transmit_next(),

            TwiStatus::StDataNack | TwiStatus::StLastData => {
                self.state = BusState::Idle;
                self.tx_idx = Record::SIZE;
                self.port.reset();
            }

            TwiStatus::BusError => {
                self.state = BusState::Idle;
                self.port.send_stop();
            }

            _ => {}
        }
        Ok(())
    }

    fn transmit_next(&mut self) {
        let byte = if self.tx_idx < Record::SIZE {
            let b = self.tx[self.tx_idx];
            self.tx_idx += 1;
            b
        } else {
            0
        };
        self.port.send_data(byte);
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn free(self) -> P {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Start,
        Stop,
        Data(u8),
        Ack,
        Nack,
        Reset,
    }

    #[derive(Default)]
    struct ScriptPort {
        ops: Vec<Op>,
        rx: VecDeque<u8>,
    }

    impl TwiPort for ScriptPort {
        fn send_start(&mut self) {
            self.ops.push(Op::Start);
        }
        fn send_stop(&mut self) {
            self.ops.push(Op::Stop);
        }
        fn send_data(&mut self, byte: u8) {
            self.ops.push(Op::Data(byte));
        }
        fn read_data(&mut self) -> u8 {
            self.rx.pop_front().unwrap_or(0xEE)
        }
        fn ack(&mut self) {
            self.ops.push(Op::Ack);
        }
        fn nack(&mut self) {
            self.ops.push(Op::Nack);
        }
        fn reset(&mut self) {
            self.ops.push(Op::Reset);
        }
    }

    #[test]
    fn status_codes_ignore_prescaler_bits() {
        assert_eq!(TwiStatus::from_code(0x18 | 0x03), TwiStatus::MtSlaAck);
        assert_eq!(TwiStatus::from_code(0xA0), TwiStatus::SrStop);
        assert_eq!(TwiStatus::from_code(0xF8), TwiStatus::NoInfo);
    }

    #[test]
    fn master_write_sequence() {
        let mut m = BusMaster::new(ScriptPort::default());
        m.send(0x2A, Record::new(1, 2, 3, 4)).unwrap();
        assert_eq!(m.send(0x2A, Record::NULL), Err(BusError::Busy));

        m.on_event(TwiStatus::Start, |_| {});
        m.on_event(TwiStatus::MtSlaAck, |_| {});
        for _ in 0..4 {
            m.on_event(TwiStatus::MtDataAck, |_| {});
        }
        assert_eq!(m.state(), BusState::Acked);
        assert_eq!(m.outgoing().state, BusState::Acked);
        assert_eq!(
            m.free().ops,
            [
                Op::Start,
                Op::Data(0x54),
                Op::Data(1),
                Op::Data(2),
                Op::Data(3),
                Op::Data(4),
                Op::Stop
            ]
        );
    }

    #[test]
    fn master_read_nacks_last_byte() {
        let mut port = ScriptPort::default();
        port.rx.extend([0xC8, 1, 2, 3]);
        let mut m = BusMaster::new(port);
        m.read(0x2A).unwrap();

        let mut got = None;
        m.on_event(TwiStatus::Start, |_| {});
        m.on_event(TwiStatus::MrSlaAck, |_| {});
        m.on_event(TwiStatus::MrDataAck, |_| {});
        m.on_event(TwiStatus::MrDataAck, |_| {});
        m.on_event(TwiStatus::MrDataAck, |_| {});
        m.on_event(TwiStatus::MrDataNack, |msg| got = msg.record());

        assert_eq!(got, Some(Record::new(0xC8, 1, 2, 3)));
        assert_eq!(m.state(), BusState::Full);
        let ops = m.free().ops;
        assert_eq!(
            ops,
            [
                Op::Start,
                Op::Data(0x55),
                Op::Ack,
                Op::Ack,
                Op::Ack,
                Op::Nack,
                Op::Stop
            ]
        );
    }

    #[test]
    fn arbitration_lost_releases_the_request() {
        let mut m = BusMaster::new(ScriptPort::default());
        m.send(0x2A, Record::new(1, 0, 0, 0)).unwrap();
        m.on_event(TwiStatus::ArbitrationLost, |_| {});
        assert_eq!(m.state(), BusState::ArbitrationLost);
        assert!(m.send(0x2A, Record::new(1, 0, 0, 0)).is_ok());
    }

    struct Sink {
        got: Vec<Record>,
        reply: Option<Record>,
    }

    impl SlaveHandler for Sink {
        fn on_receive(&mut self, record: Record) -> Result<(), LinkError> {
            self.got.push(record);
            Ok(())
        }
        fn on_transmit(&mut self, buf: &mut [u8; Record::SIZE]) -> Result<bool, LinkError> {
            match self.reply.take() {
                Some(r) => {
                    *buf = r.into_bytes();
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    #[test]
    fn slave_rejects_short_write() {
        let mut port = ScriptPort::default();
        port.rx.extend([0x90, 1, 0]);
        let mut s = BusSlave::new(port);
        let mut sink = Sink {
            got: Vec::new(),
            reply: None,
        };

        s.on_event(TwiStatus::SrSlaAck, &mut sink).unwrap();
        for _ in 0..3 {
            s.on_event(TwiStatus::SrDataAck, &mut sink).unwrap();
        }
        assert_eq!(
            s.on_event(TwiStatus::SrStop, &mut sink),
            Err(LinkError::InvalidReceiveLength)
        );
        assert!(sink.got.is_empty());
        assert!(!s.is_busy());
    }

    #[test]
    fn slave_sends_idle_bytes_when_empty() {
        let mut s = BusSlave::new(ScriptPort::default());
        let mut sink = Sink {
            got: Vec::new(),
            reply: None,
        };
        s.on_event(TwiStatus::StSlaAck, &mut sink).unwrap();
        for _ in 0..3 {
            s.on_event(TwiStatus::StDataAck, &mut sink).unwrap();
        }
        s.on_event(TwiStatus::StDataNack, &mut sink).unwrap();
        let ops = s.free().ops;
        assert_eq!(&ops[..4], &[Op::Data(0); 4]);
    }
}
