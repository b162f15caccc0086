// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Core processor side of the bus link: slave queues, command router and status reports.
//!
//! [`CoreBus`] is what the bus interrupt touches; [`CoreLink`] keeps it in a [`Shared`] cell and
//! runs the router and the actuators outside the lock.

use core::cell::RefCell;
use core::marker::PhantomData;

use log::{debug, info};

use crate::buffers::Fifo;
use crate::config::queues::{CORE_CMD_IN, CORE_CMD_OUT};
use crate::config::FirmwareInfo;
use crate::drivers::{BusSlave, SlaveHandler, TwiPort, TwiStatus};
use crate::error::{ErrorLog, LinkError};
use crate::protocol::messages::{self, cpu, identity_records};
use crate::protocol::{Command, Record, RecordSink, SwitchStatus};
use crate::shared::Shared;

/// The motors, LEDs and IR of the core. Commands the router does not handle itself end up here.
pub trait Actuators {
    /// Execute `record`. Return `false` if the opcode is unknown.
    fn execute(&mut self, record: &Record) -> bool;
}

/// Inbound and outbound command queues serviced from the bus interrupt.
#[derive(Debug, Default)]
pub struct CoreQueues {
    cmd_in: Fifo<CORE_CMD_IN>,
    cmd_out: Fifo<CORE_CMD_OUT>,
}

impl CoreQueues {
    pub const fn new() -> Self {
        Self {
            cmd_in: Fifo::new(),
            cmd_out: Fifo::new(),
        }
    }

    /// Queue a record for the companion.
    pub fn queue(&mut self, record: Record) -> Result<(), LinkError> {
        self.cmd_out
            .put_record(record)
            .map_err(|_| LinkError::CmdOutFull)
    }

    /// Next record received from the companion.
    pub fn next(&mut self) -> Result<Option<Record>, LinkError> {
        if self.cmd_in.is_empty() {
            return Ok(None);
        }
        self.cmd_in
            .get_record()
            .map(Some)
            .map_err(|_| LinkError::CmdInEmpty)
    }

    #[inline]
    pub fn outbound_empty(&self) -> bool {
        self.cmd_out.is_empty()
    }
}

impl SlaveHandler for CoreQueues {
    fn on_receive(&mut self, record: Record) -> Result<(), LinkError> {
        self.cmd_in
            .put_record(record)
            .map_err(|_| LinkError::CmdInOverflow)
    }

    fn on_transmit(&mut self, buf: &mut [u8; Record::SIZE]) -> Result<bool, LinkError> {
        if self.cmd_out.is_empty() {
            return Ok(false);
        }
        let record = self
            .cmd_out
            .get_record()
            .map_err(|_| LinkError::CmdOutEmpty)?;
        *buf = record.into_bytes();
        Ok(true)
    }
}

/// Records queued by the router; a full queue drops them.
impl RecordSink for CoreQueues {
    fn push(&mut self, record: Record) {
        if self.queue(record).is_err() {
            debug!("{:?} dropped, outbound queue full", record);
        }
    }
}

/// Edge-triggered conditions raised by incoming commands. Cleared by `COND_RESET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditions {
    pub startup: bool,
    pub head: bool,
    pub left_wing: bool,
    pub right_wing: bool,
    pub charger_start: bool,
    pub unplug: bool,
    pub rf_conn: bool,
    pub rf_disconn: bool,
}

impl Conditions {
    pub const fn new() -> Self {
        Self {
            startup: true,
            head: false,
            left_wing: false,
            right_wing: false,
            charger_start: false,
            unplug: false,
            rf_conn: false,
            rf_disconn: false,
        }
    }

    pub fn clear(&mut self) {
        *self = Self {
            startup: false,
            ..Self::new()
        };
    }
}

impl Default for Conditions {
    fn default() -> Self {
        Self::new()
    }
}

/// Last status snapshot received from the companion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStatus {
    pub switches: SwitchStatus,
    pub clip: u8,
    pub active: bool,
}

/// Command router of the core processor.
pub struct CoreRouter {
    info: FirmwareInfo,
    conditions: Conditions,
    audio: AudioStatus,
    ping_count: u8,
    sleep: bool,
    status_due: bool,
}

impl CoreRouter {
    pub fn new(info: FirmwareInfo) -> Self {
        Self {
            info,
            conditions: Conditions::new(),
            audio: AudioStatus::default(),
            ping_count: 0,
            sleep: false,
            status_due: false,
        }
    }

    #[inline]
    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    #[inline]
    pub fn audio_status(&self) -> AudioStatus {
        self.audio
    }

    #[inline]
    pub fn sleep_requested(&self) -> bool {
        self.sleep
    }

    /// Pongs still owed to the host.
    #[inline]
    pub fn pending_pongs(&self) -> u8 {
        self.ping_count
    }

    /// Handle `record`. Records for the companion go to `out`.
    pub fn route<O, A>(&mut self, record: &Record, out: &mut O, actuators: &mut A)
    where
        O: RecordSink,
        A: Actuators,
    {
        match Command::decode(record) {
            Command::AudioSensors {
                switches,
                clip,
                active,
            } => self.update_audio(AudioStatus {
                switches,
                clip,
                active,
            }),

            Command::Ping { count } => self.ping_count = count,

            // Sound commands belong to the companion.
            Command::PlaySound { .. } | Command::Mute(_) => out.push(*record),

            Command::Sleep { .. } => self.sleep = true,

            Command::InfoCore => {
                for r in identity_records(&self.info, cpu::CORE) {
                    out.push(r);
                }
            }

            Command::CondReset => self.conditions.clear(),

            _ => {
                if actuators.execute(record) {
                    self.status_due = true;
                } else {
                    debug!("unknown command {:?} dropped", record);
                }
            }
        }
    }

    fn update_audio(&mut self, new: AudioStatus) {
        let old = self.audio.switches;
        let now = new.switches;
        let c = &mut self.conditions;

        c.head |= now.head() && !old.head();
        c.left_wing |= now.left_wing() && !old.left_wing();
        c.right_wing |= now.right_wing() && !old.right_wing();
        c.charger_start |= now.charger() && !old.charger();
        c.unplug |= !now.power_plug() && old.power_plug();
        if now.rf() && !old.rf() {
            c.rf_conn = true;
            c.rf_disconn = false;
        }
        if !now.rf() && old.rf() {
            c.rf_conn = false;
            c.rf_disconn = true;
        }

        self.audio = new;
    }

    /// The next pong, once the outbound queue has drained.
    pub fn next_pong(&mut self, outbound_empty: bool) -> Option<Record> {
        if self.ping_count == 0 || !outbound_empty {
            return None;
        }
        self.ping_count -= 1;
        Some(Record::new(messages::PONG, self.ping_count, 0, 0))
    }
}

/// Bus-side state of the core: the slave state machine, both queues and the last-error register.
pub struct CoreBus<P: TwiPort> {
    slave: BusSlave<P>,
    queues: CoreQueues,
    errors: ErrorLog,
}

impl<P: TwiPort> CoreBus<P> {
    pub fn new(port: P) -> Self {
        Self {
            slave: BusSlave::new(port),
            queues: CoreQueues::new(),
            errors: ErrorLog::new(),
        }
    }

    /// Bus interrupt. Service errors are kept for the next status report.
    pub fn on_event(&mut self, status: TwiStatus) {
        if let Err(e) = self.slave.on_event(status, &mut self.queues) {
            self.errors.record(e);
        }
    }

    /// Next record received from the companion.
    pub fn next_cmd(&mut self) -> Option<Record> {
        match self.queues.next() {
            Ok(record) => record,
            Err(e) => {
                self.errors.record(e);
                None
            }
        }
    }

    /// Queue the periodic status and, if one is latched, the error report. Returns the error
    /// report that went out.
    fn queue_status(&mut self, status: Record) -> Option<Record> {
        if self.queues.queue(status).is_err() {
            self.errors.record(LinkError::OutBufOverflow);
            return None;
        }
        let report = self.errors.take_status_record(cpu::CORE)?;
        match self.queues.queue(report) {
            Ok(()) => Some(report),
            Err(_) => {
                self.errors.record(LinkError::OutBufOverflow);
                None
            }
        }
    }

    pub fn slave_mut(&mut self) -> &mut BusSlave<P> {
        &mut self.slave
    }
}

/// Outbound records of the router, one lock per record.
struct Outbox<'a, P, S> {
    bus: &'a S,
    _port: PhantomData<fn() -> P>,
}

impl<P, S> RecordSink for Outbox<'_, P, S>
where
    P: TwiPort,
    S: Shared<CoreBus<P>>,
{
    fn push(&mut self, record: Record) {
        self.bus.lock(|b| b.queues.push(record));
    }
}

/// Slave side of the bus plus everything the core does with the records it carries.
pub struct CoreLink<P, S = RefCell<CoreBus<P>>>
where
    P: TwiPort,
    S: Shared<CoreBus<P>>,
{
    bus: S,
    router: CoreRouter,
    _port: PhantomData<fn() -> P>,
}

impl<P: TwiPort> CoreLink<P> {
    pub fn new(port: P, info: FirmwareInfo) -> Self {
        Self::with_shared(RefCell::new(CoreBus::new(port)), info)
    }
}

impl<P, S> CoreLink<P, S>
where
    P: TwiPort,
    S: Shared<CoreBus<P>>,
{
    /// Build the link around a bus cell the interrupt handler shares.
    pub fn with_shared(bus: S, info: FirmwareInfo) -> Self {
        Self {
            bus,
            router: CoreRouter::new(info),
            _port: PhantomData,
        }
    }

    /// Bus interrupt, for single-context use.
    pub fn on_bus_event(&self, status: TwiStatus) {
        self.bus.lock(|b| b.on_event(status));
    }

    /// Next record from the companion.
    pub fn get_cmd(&self) -> Option<Record> {
        self.bus.lock(|b| b.next_cmd())
    }

    /// Queue a record for the companion.
    pub fn queue_cmd(&self, record: Record) -> Result<(), LinkError> {
        self.bus.lock(|b| b.queues.queue(record))
    }

    /// Nothing left to send and no transaction in progress.
    pub fn cmds_sent(&self) -> bool {
        self.bus
            .lock(|b| b.queues.outbound_empty() && !b.slave.is_busy())
    }

    #[inline]
    pub fn cmds_empty(&self) -> bool {
        self.bus.lock(|b| b.queues.outbound_empty())
    }

    /// Status timer tick.
    pub fn status_tick(&mut self) {
        self.router.status_due = true;
    }

    /// One pass of the main loop: status, pongs, then one received command.
    pub fn poll<A: Actuators>(&mut self, actuators: &mut A) {
        if self.router.status_due {
            self.router.status_due = false;
            if !self.router.sleep {
                self.send_status();
            }
        }

        let router = &mut self.router;
        self.bus.lock(|b| {
            if let Some(pong) = router.next_pong(b.queues.outbound_empty()) {
                let _ = b.queues.queue(pong);
            }
        });

        if let Some(record) = self.get_cmd() {
            let mut out = Outbox {
                bus: &self.bus,
                _port: PhantomData,
            };
            self.router.route(&record, &mut out, actuators);
        }
    }

    fn send_status(&mut self) {
        let audio = self.router.audio;
        let status = Record::new(
            messages::STATUS_SENSORS1,
            audio.switches.raw(),
            audio.clip,
            audio.active as u8,
        );
        if let Some(report) = self.bus.lock(|b| b.queue_status(status)) {
            info!("reporting bus error {:?}", report);
        }
    }

    /// A sleep request arrived; the caller sleeps, then calls [`Self::wake`].
    #[inline]
    pub fn sleep_requested(&self) -> bool {
        self.router.sleep_requested()
    }

    pub fn wake(&mut self) {
        self.router.sleep = false;
    }

    pub fn router(&self) -> &CoreRouter {
        &self.router
    }

    /// Error waiting for the next status report.
    pub fn last_error(&self) -> LinkError {
        self.bus.lock(|b| b.errors.last())
    }

    /// Bus errors since boot.
    pub fn error_count(&self) -> u32 {
        self.bus.lock(|b| b.errors.count())
    }

    pub fn bus(&self) -> &S {
        &self.bus
    }
}
