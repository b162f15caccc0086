// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Main task of the companion processor.
//!
//! The companion sits between the radio front-end and the core: it exchanges one frame with the
//! radio per frame period, moves commands across the bus, plays and records audio, and
//! reports its sensors.
//!
//! The radio link and the audio streams belong to interrupt handlers as much as to the main
//! loop, so the companion reaches them through [`Shared`] cells. Interrupt handlers lock the
//! same cells directly; single-context setups (and the host tests) use the `on_*` methods. The
//! main loop calls [`Companion::poll`] as fast as it can and [`Companion::sensors_tick`] from
//! the sensor timer.

use core::cell::RefCell;
use core::marker::PhantomData;

use log::{debug, info, warn};

use super::{CommandQueues, Route, Router};
use crate::buffers::{AudioStreams, FifoError};
use crate::config::bus::CORE_ADDR;
use crate::config::companion::DISCONNECT_TIMEOUT;
use crate::config::link::MIC_SAMPLES;
use crate::config::FirmwareInfo;
use crate::drivers::{
    Amplifier, BusMaster, BusState, FramePort, RfLink, SerialFlash, TwiPort, TwiStatus,
};
use crate::fault::{FaultCode, FaultState};
use crate::protocol::{messages, Frame, Handshake, Record, SleepKind, SwitchStatus};
use crate::shared::Shared;
use crate::store::{SoundStore, StoreControl};

/// Where a routed record would be forwarded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toward {
    Core,
    Host,
}

pub struct Companion<B, R, F, A, L = RefCell<RfLink<R>>, S = RefCell<AudioStreams>>
where
    B: TwiPort,
    R: FramePort,
    F: SerialFlash,
    A: Amplifier,
    L: Shared<RfLink<R>>,
    S: Shared<AudioStreams>,
{
    bus: BusMaster<B>,
    rf: L,
    audio: S,
    flash: F,
    amp: A,
    queues: CommandQueues,
    store: SoundStore,
    router: Router,
    handshake: Handshake,
    /// Record read from the core, waiting to be routed.
    from_core: Option<Record>,
    disconnected: u16,
    faults: FaultState,
    _port: PhantomData<fn() -> R>,
}

impl<B, R, F, A> Companion<B, R, F, A>
where
    B: TwiPort,
    R: FramePort,
    F: SerialFlash,
    A: Amplifier,
{
    /// Mount the sound store and set up both links, all in one execution context.
    pub fn new(bus: B, rf: R, flash: F, amp: A, info: FirmwareInfo) -> Result<Self, F::Error> {
        Self::with_shared(
            bus,
            RefCell::new(RfLink::new(rf)),
            RefCell::new(AudioStreams::new()),
            flash,
            amp,
            info,
        )
    }
}

impl<B, R, F, A, L, S> Companion<B, R, F, A, L, S>
where
    B: TwiPort,
    R: FramePort,
    F: SerialFlash,
    A: Amplifier,
    L: Shared<RfLink<R>>,
    S: Shared<AudioStreams>,
{
    /// Mount the sound store around radio and audio state that interrupt handlers share.
    pub fn with_shared(
        bus: B,
        rf: L,
        audio: S,
        mut flash: F,
        amp: A,
        info: FirmwareInfo,
    ) -> Result<Self, F::Error> {
        let store = SoundStore::mount(&mut flash)?;
        Ok(Self {
            bus: BusMaster::new(bus),
            rf,
            audio,
            flash,
            amp,
            queues: CommandQueues::new(),
            store,
            router: Router::new(info),
            handshake: Handshake::new(),
            from_core: None,
            disconnected: DISCONNECT_TIMEOUT,
            faults: FaultState::new(),
            _port: PhantomData,
        })
    }

    /// Bus interrupt.
    pub fn on_bus_event(&mut self, status: TwiStatus) {
        let slot = &mut self.from_core;
        self.bus.on_event(status, |msg| {
            if msg.addr != CORE_ADDR {
                return;
            }
            // All-zero bytes mean the core had nothing to say.
            if let Some(record) = msg.record().filter(|r| !r.is_null()) {
                *slot = Some(record);
            }
        });
    }

    /// Radio TXE edge.
    #[inline]
    pub fn on_rf_txe(&self) {
        self.rf.lock(|rf| rf.on_txe());
    }

    /// Radio SPIACK edge.
    #[inline]
    pub fn on_rf_ack(&self) {
        self.rf.lock(|rf| rf.on_ack());
    }

    /// Sample clock tick: the next speaker sample, if any.
    #[inline]
    pub fn on_sample_tick(&self, mic: Option<u8>) -> Option<u8> {
        self.audio.lock(|a| a.sample_tick(mic))
    }

    /// Playback timer reload currently chosen by the rate controller.
    #[inline]
    pub fn playback_rate(&self) -> u8 {
        self.audio.lock(|a| a.rate.rate())
    }

    /// One pass of the main loop.
    pub fn poll(&mut self) -> Result<(), F::Error> {
        // The store only works between the end of a frame and the next TXE.
        if !self.rf.lock(|rf| rf.txe_pending()) {
            self.store.poll(&mut self.flash, &self.audio, &mut self.queues)?;
        }

        let received = self.rf.lock(|rf| {
            rf.poll_start();
            rf.take_received()
        });
        if let Some(frame) = received {
            self.process_frame(&frame);
        }

        self.bus_task();
        Ok(())
    }

    fn process_frame(&mut self, frame: &Frame) {
        if let Some(mut command) = self.handshake.receive(frame) {
            self.dispatch(&mut command, Toward::Core);
        }

        let speaker = (frame.flags().audio() && !self.store.is_playing())
            .then(|| frame.speaker_audio());
        let mut mic = [0u8; MIC_SAMPLES];
        let with_audio = self.audio.lock(|a| {
            match speaker {
                Some(samples) => {
                    a.rate.update(a.speaker.len());
                    a.push_speaker(samples);
                }
                None => a.silent_frame(),
            }
            a.mic.len() >= MIC_SAMPLES && a.mic.get_slice(&mut mic).is_ok()
        });

        let command = if self.handshake.can_send() {
            self.queues.pop_rf()
        } else {
            None
        };
        let loaded = command.is_some();

        let handshake = &mut self.handshake;
        let prepared = self.rf.lock(|rf| {
            let out = rf.outgoing_mut();
            if with_audio {
                out.mic_audio_mut().copy_from_slice(&mic);
            }
            let prepared = handshake.prepare(out, command, with_audio);
            if loaded {
                rf.mark_pending();
            }
            rf.clear_txe();
            prepared
        });
        if prepared.is_err() {
            // `can_send` was checked above; the record cannot come back.
            debug!("outgoing command slot still busy");
        }
    }

    fn bus_task(&mut self) {
        if self.bus.is_busy() {
            return;
        }

        if self.bus.outgoing().state == BusState::Nacked {
            let _ = self.bus.resend();
            return;
        }

        if let Some(mut record) = self.from_core.take() {
            self.dispatch(&mut record, Toward::Host);
        }

        match self.queues.pop_core() {
            Ok(record) => {
                let _ = self.bus.send(CORE_ADDR, record);
            }
            Err(FifoError::Truncated) => warn!("partial record dropped from core queue"),
            Err(_) => {
                if !self.router.sleep_pending() && self.queues.rf_has_room() {
                    let _ = self.bus.read(CORE_ADDR);
                }
            }
        }
    }

    fn dispatch(&mut self, record: &mut Record, toward: Toward) {
        match self
            .router
            .route(record, &mut self.queues, &mut self.store, &mut self.amp)
        {
            Route::Forward => {
                let queued = match toward {
                    Toward::Core => self.queues.queue_core(*record),
                    Toward::Host => self.queues.queue_rf(*record),
                };
                if !queued {
                    debug!("{:?} dropped toward {:?}", record, toward);
                }
            }
            Route::Sleep => self.rf.lock(|rf| rf.outgoing_mut().set_command(Record::NULL)),
            Route::Handled => {}
        }
    }

    /// Sensor timer tick: report switches to the core and watch the radio link.
    ///
    /// `pins` holds the raw switch input levels, active low.
    pub fn sensors_tick(&mut self, pins: u8, rf_online: bool) {
        self.queues.set_rf_online(rf_online);

        if rf_online {
            self.disconnected = DISCONNECT_TIMEOUT;
        } else {
            self.disconnected = self.disconnected.saturating_sub(1);
            if self.disconnected == 0 {
                info!("radio offline too long, going to sleep");
                self.disconnected = DISCONNECT_TIMEOUT;
                let mut sleep = Record::new(messages::SLEEP, SleepKind::Quick.as_u8(), 0, 0);
                self.dispatch(&mut sleep, Toward::Core);
            }
        }

        if self.router.sleep_pending() {
            return;
        }

        let switches = SwitchStatus::from_pins(pins, rf_online);
        let clip = self.store.playing_clip();
        let active = self.store.is_playing();
        self.queues.queue_core(Record::new(
            messages::SEND_AUDIOSENSORS,
            switches.raw(),
            clip,
            active as u8,
        ));
    }

    /// Both command queues drained, the bus idle and the last radio command sent.
    pub fn cmds_sent(&self) -> bool {
        !self.queues.core_pending()
            && !self.bus.is_busy()
            && !self.queues.rf_pending()
            && self.rf.lock(|rf| rf.command_sent())
    }

    /// A pending sleep can be carried out now.
    pub fn ready_to_sleep(&self) -> bool {
        self.router.sleep_pending() && !self.store.is_playing() && self.cmds_sent()
    }

    /// Tell the core to sleep too. Keep polling until [`Self::cmds_sent`], then call
    /// [`Self::power_down`].
    pub fn prepare_sleep(&mut self) {
        self.queues
            .queue_core(Record::new(messages::SLEEP, SleepKind::Quick.as_u8(), 0, 0));
    }

    /// Put the flash into deep power-down.
    pub fn power_down(&mut self) -> Result<(), F::Error> {
        info!("entering sleep");
        self.flash.power_down()
    }

    /// Resume after sleep with fresh buffers. The next frame carries the WAKEUP flag.
    pub fn wake(&mut self) -> Result<(), F::Error> {
        self.flash.resume()?;
        self.queues.clear();
        self.audio.lock(|a| a.clear());
        self.rf.lock(|rf| rf.outgoing_mut().set_command(Record::NULL));
        self.bus.clear();
        self.from_core = None;
        self.router.wake();
        self.disconnected = DISCONNECT_TIMEOUT;
        self.handshake.request_wakeup();
        info!("awake");
        Ok(())
    }

    /// Verify queue consistency; a failure latches a fault.
    pub fn check(&self) -> Result<(), FaultCode> {
        self.faults.check_queue(self.queues.core_queue())?;
        self.faults.check_queue(self.queues.rf_queue())?;
        let faults = &self.faults;
        self.audio.lock(|a| {
            faults.check_queue(&a.speaker)?;
            faults.check_queue(&a.mic)
        })
    }

    pub fn faults(&self) -> &FaultState {
        &self.faults
    }

    pub fn queues(&self) -> &CommandQueues {
        &self.queues
    }

    pub fn queues_mut(&mut self) -> &mut CommandQueues {
        &mut self.queues
    }

    pub fn store(&self) -> &SoundStore {
        &self.store
    }

    pub fn amp(&self) -> &A {
        &self.amp
    }

    pub fn audio(&self) -> &S {
        &self.audio
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn bus_mut(&mut self) -> &mut BusMaster<B> {
        &mut self.bus
    }

    pub fn rf(&self) -> &L {
        &self.rf
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}
