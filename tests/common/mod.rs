// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Simulated peripherals shared by the integration tests.

#![allow(dead_code)]

use std::convert::Infallible;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

use robolink::config::link::FRAME_SIZE;
use robolink::config::store::{BASE, BLOCK_SIZE, INDEX_MARKER};
use robolink::config::FirmwareInfo;
use robolink::drivers::{
    Address, Amplifier, BlockingTwi, FramePort, SerialFlash, TwiPort, TwiStatus,
};
use robolink::link::{Actuators, Companion, CoreLink};
use robolink::protocol::{Frame, Record, RecordSink};
use robolink::Shared;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn info() -> FirmwareInfo {
    FirmwareInfo {
        major: 0,
        minor: 9,
        update: 4,
        revision: 0x0102,
        release_type: FirmwareInfo::RELEASE,
        author: 0x0304,
        variation: 1,
    }
}

/// 512 KiB NOR flash: programming only clears bits, erasing sets them.
pub struct MemFlash {
    pub mem: Vec<u8>,
    seq: Option<u32>,
    cursor: Option<u32>,
    /// Busy polls left after a chip erase.
    pub busy: u32,
    pub powered_down: bool,
    pub erases: u32,
}

impl MemFlash {
    pub const SIZE: usize = 0x8_0000;

    /// Factory-fresh device: all 0xFF, no index.
    pub fn blank() -> Self {
        Self {
            mem: vec![0xFF; Self::SIZE],
            seq: None,
            cursor: None,
            busy: 0,
            powered_down: false,
            erases: 0,
        }
    }

    /// Erased device with an empty index table.
    pub fn formatted() -> Self {
        let mut flash = Self::blank();
        flash.mem[0] = INDEX_MARKER;
        flash.mem[1..4].copy_from_slice(&Address::new(BASE).to_bytes());
        flash
    }

    /// Index entry `n` as an address.
    pub fn entry(&self, n: u8) -> u32 {
        let at = n as usize * 3 + 1;
        Address::from_bytes([self.mem[at], self.mem[at + 1], self.mem[at + 2]]).value()
    }

    /// Append an index entry directly, as a previous session would have.
    pub fn set_entry(&mut self, n: u8, addr: u32) {
        let at = n as usize * 3 + 1;
        self.mem[at..at + 3].copy_from_slice(&Address::new(addr).to_bytes());
    }

    fn program(&mut self, addr: u32, data: u8) {
        if let Some(b) = self.mem.get_mut(addr as usize) {
            *b &= data;
        }
    }
}

impl SerialFlash for MemFlash {
    type Error = Infallible;

    fn is_busy(&mut self) -> Result<bool, Infallible> {
        if self.busy > 0 {
            self.busy -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn read(&mut self, addr: Address, buf: &mut [u8]) -> Result<(), Infallible> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self
                .mem
                .get(addr.value() as usize + i)
                .copied()
                .unwrap_or(0xFF);
        }
        Ok(())
    }

    fn program_byte(&mut self, addr: Address, data: u8) -> Result<(), Infallible> {
        self.program(addr.value(), data);
        Ok(())
    }

    fn begin_sequential(&mut self, addr: Address, first: u8) -> Result<(), Infallible> {
        self.program(addr.value(), first);
        self.seq = Some(addr.value() + 1);
        Ok(())
    }

    fn program_next(&mut self, data: u8) -> Result<(), Infallible> {
        if let Some(at) = self.seq {
            self.program(at, data);
            self.seq = Some(at + 1);
        }
        Ok(())
    }

    fn write_disable(&mut self) -> Result<(), Infallible> {
        self.seq = None;
        Ok(())
    }

    fn erase_chip(&mut self) -> Result<(), Infallible> {
        self.mem.fill(0xFF);
        self.busy = 3;
        self.erases += 1;
        Ok(())
    }

    fn erase_block(&mut self, block: u8) -> Result<(), Infallible> {
        let start = block as usize * BLOCK_SIZE as usize;
        let end = (start + BLOCK_SIZE as usize).min(Self::SIZE);
        if start < end {
            self.mem[start..end].fill(0xFF);
        }
        Ok(())
    }

    fn protect_sector(&mut self, _addr: Address) -> Result<(), Infallible> {
        Ok(())
    }

    fn unprotect_sector(&mut self, _addr: Address) -> Result<(), Infallible> {
        Ok(())
    }

    fn begin_read(&mut self, addr: Address) -> Result<(), Infallible> {
        self.cursor = Some(addr.value());
        Ok(())
    }

    fn read_next(&mut self) -> Result<u8, Infallible> {
        let at = self.cursor.unwrap_or(0);
        self.cursor = Some(at + 1);
        Ok(self.mem.get(at as usize).copied().unwrap_or(0xFF))
    }

    fn end_read(&mut self) -> Result<(), Infallible> {
        self.cursor = None;
        Ok(())
    }

    fn power_down(&mut self) -> Result<(), Infallible> {
        self.powered_down = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), Infallible> {
        self.powered_down = false;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeAmp {
    pub muted: bool,
}

impl Amplifier for FakeAmp {
    fn mute(&mut self) {
        self.muted = true;
    }

    fn unmute(&mut self) {
        self.muted = false;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }
}

/// Collects status records.
#[derive(Debug, Default)]
pub struct Sink(pub Vec<Record>);

impl RecordSink for Sink {
    fn push(&mut self, record: Record) {
        self.0.push(record);
    }
}

/// Slave-side TWI controller: one data register each way.
#[derive(Debug, Default)]
pub struct SlavePort {
    /// Byte the master is writing.
    pub rx: u8,
    /// Byte loaded for the master to read.
    pub tx: u8,
    pub nacks: usize,
    pub resets: usize,
}

impl TwiPort for SlavePort {
    fn send_start(&mut self) {}

    fn send_stop(&mut self) {}

    fn send_data(&mut self, byte: u8) {
        self.tx = byte;
    }

    fn read_data(&mut self) -> u8 {
        self.rx
    }

    fn ack(&mut self) {}

    fn nack(&mut self) {
        self.nacks += 1;
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

/// Blocking I2C master wired straight to the core's slave link.
pub struct LinkedBus {
    pub core: CoreLink<SlavePort>,
    pub core_addr: u8,
}

impl LinkedBus {
    pub fn new(core_addr: u8) -> Self {
        Self {
            core: CoreLink::new(SlavePort::default(), info()),
            core_addr,
        }
    }

    fn master_write(&mut self, bytes: &[u8]) {
        self.core.on_bus_event(TwiStatus::SrSlaAck);
        for &b in bytes {
            self.core.bus().lock(|bus| bus.slave_mut().port_mut().rx = b);
            self.core.on_bus_event(TwiStatus::SrDataAck);
        }
        self.core.on_bus_event(TwiStatus::SrStop);
    }

    fn master_read(&mut self, buf: &mut [u8]) {
        self.core.on_bus_event(TwiStatus::StSlaAck);
        let len = buf.len();
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.core.bus().lock(|bus| bus.slave_mut().port_mut().tx);
            if i + 1 < len {
                self.core.on_bus_event(TwiStatus::StDataAck);
            } else {
                self.core.on_bus_event(TwiStatus::StDataNack);
            }
        }
    }
}

impl ErrorType for LinkedBus {
    type Error = ErrorKind;
}

impl I2c for LinkedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        if address != self.core_addr {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.master_write(bytes),
                Operation::Read(buf) => self.master_read(buf),
            }
        }
        Ok(())
    }
}

/// Radio front-end: answers each byte with the matching byte of `host` and keeps what the
/// companion sent.
pub struct RadioSim {
    pub host: Frame,
    pub sent: Vec<u8>,
}

impl RadioSim {
    pub fn new() -> Self {
        Self {
            host: Frame::new(),
            sent: Vec::new(),
        }
    }

    /// The last complete frame the companion sent.
    pub fn last_frame(&self) -> Option<Frame> {
        if self.sent.len() < FRAME_SIZE {
            return None;
        }
        let start = self.sent.len() - FRAME_SIZE;
        let mut bytes = [0u8; FRAME_SIZE];
        bytes.copy_from_slice(&self.sent[start..]);
        Some(Frame::from_bytes(bytes))
    }
}

impl FramePort for RadioSim {
    fn select(&mut self) {
        self.sent.clear();
    }

    fn deselect(&mut self) {}

    fn write(&mut self, byte: u8) {
        self.sent.push(byte);
    }

    fn read(&mut self) -> u8 {
        self.host.as_bytes()[self.sent.len() - 1]
    }
}

/// Records every command that reached the actuators.
#[derive(Debug, Default)]
pub struct Recorder {
    pub executed: Vec<Record>,
    pub known: Vec<u8>,
}

impl Actuators for Recorder {
    fn execute(&mut self, record: &Record) -> bool {
        if self.known.contains(&record.opcode()) {
            self.executed.push(*record);
            true
        } else {
            false
        }
    }
}

pub type TestCompanion = Companion<BlockingTwi<LinkedBus>, RadioSim, MemFlash, FakeAmp>;

pub fn companion(flash: MemFlash, core_addr: u8) -> TestCompanion {
    init_logging();
    match Companion::new(
        BlockingTwi::new(LinkedBus::new(core_addr)),
        RadioSim::new(),
        flash,
        FakeAmp::default(),
        info(),
    ) {
        Ok(c) => c,
        Err(e) => match e {},
    }
}

/// Run the blocking bus adaptor's statuses through the companion.
pub fn pump_bus(c: &mut TestCompanion) {
    while let Some(status) = c.bus_mut().port_mut().take_event() {
        c.on_bus_event(status);
    }
}

/// One frame period: TXE, start, 39 byte exchanges, processing and an idle pass. Returns the
/// frame the companion sent.
pub fn exchange_frame(c: &mut TestCompanion, host: Frame) -> Frame {
    exchange_frame_with(c, host, |_| {})
}

/// [`exchange_frame`], running `between` after the frame is processed and before the idle
/// pass.
pub fn exchange_frame_with(
    c: &mut TestCompanion,
    host: Frame,
    mut between: impl FnMut(&mut TestCompanion),
) -> Frame {
    c.rf().lock(|rf| rf.port_mut().host = host);
    c.on_rf_txe();
    c.poll().unwrap();
    pump_bus(c);
    for _ in 0..FRAME_SIZE {
        c.on_rf_ack();
    }
    c.poll().unwrap();
    pump_bus(c);
    between(c);
    // Idle pass between frames, where the store gets its turn.
    c.poll().unwrap();
    pump_bus(c);
    c.rf().lock(|rf| rf.port_mut().last_frame()).unwrap()
}

/// Core link behind the companion's bus.
pub fn core_of(c: &mut TestCompanion) -> &mut CoreLink<SlavePort> {
    &mut c.bus_mut().port_mut().bus_mut().core
}
