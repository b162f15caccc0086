// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Companion processor firmware: radio bridge, audio path and sound store.

#![no_main]
#![no_std]

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m::interrupt::{self, Mutex};
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::{entry, exception};
use log::{error, info, LevelFilter};
use panic_halt as _;

use hal::{
    gpio::{
        gpioa, gpiob, gpioc, gpiod, Alternate, Edge, ExtiPin, Floating, Input, OpenDrain, Output,
        PushPull,
    },
    i2c::{BlockingI2c, Mode as I2cMode},
    pac::{self, interrupt},
    prelude::*,
    serial::{Config, Serial},
    spi::{Mode, Phase, Polarity, Spi},
};
use stm32f7xx_hal as hal;

use robolink::buffers::AudioStreams;
use robolink::config::FirmwareInfo;
use robolink::drivers::{AmpSwitch, At26f004, BlockingTwi, RfLink};
use robolink::hw::{
    stack, ChipSelect, CompanionPins, IrqCell, Microphone, RfPort, SampleClock, SpeakerPwm,
    SpiBus, Usart, UsartLogger,
};
use robolink::link::Companion;
use robolink::Shared;

/// Microphone input channel (PC0).
const MIC_CHANNEL: u8 = 10;
/// Sensor reports per second.
const SENSOR_RATE_HZ: u32 = 30;

type FlashSpi = SpiBus<
    pac::SPI1,
    (
        gpioa::PA5<Alternate<5>>,
        gpioa::PA6<Alternate<5>>,
        gpioa::PA7<Alternate<5>>,
    ),
>;
type RadioPins = (
    gpiob::PB13<Alternate<5>>,
    gpiob::PB14<Alternate<5>>,
    gpiob::PB15<Alternate<5>>,
);
type CoreBus = BlockingI2c<
    pac::I2C1,
    gpiob::PB8<Alternate<4, OpenDrain>>,
    gpiob::PB9<Alternate<4, OpenDrain>>,
>;

type Radio = RfPort<pac::SPI2, RadioPins, 'B', 12>;

type Board = Companion<
    BlockingTwi<CoreBus>,
    Radio,
    At26f004<FlashSpi, ChipSelect<'A', 4>>,
    AmpSwitch<gpiod::PD3<Output<PushPull>>>,
    IrqCell<RfLink<Radio>>,
    IrqCell<AudioStreams>,
>;

struct AudioHw {
    clock: SampleClock,
    pwm: SpeakerPwm,
    mic: Microphone,
}

struct RadioLines {
    txe: gpioc::PC6<Input<Floating>>,
    spiack: gpioc::PC7<Input<Floating>>,
}

static STREAMS: Mutex<RefCell<AudioStreams>> = Mutex::new(RefCell::new(AudioStreams::new()));
static RF: Mutex<Cell<Option<IrqCell<RfLink<Radio>>>>> = Mutex::new(Cell::new(None));
static AUDIO: Mutex<RefCell<Option<AudioHw>>> = Mutex::new(RefCell::new(None));
static RADIO: Mutex<RefCell<Option<RadioLines>>> = Mutex::new(RefCell::new(None));
static SENSOR_TICK: AtomicBool = AtomicBool::new(false);
static LOGGER: UsartLogger<pac::USART1> = UsartLogger::new(LevelFilter::Info);

#[entry]
fn main() -> ! {
    stack::paint();

    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    // Clocks
    let mut rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();

    let pins = CompanionPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOC, dp.GPIOD, dp.GPIOE);

    // USART1 (DBG)
    let usart_cfg = Config {
        baud_rate: 115_200.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART1, (pins.usart1.tx, pins.usart1.rx), &clocks, usart_cfg);
    let _ = LOGGER.install(Usart::new(serial));
    info!("companion firmware {}", env!("CARGO_PKG_VERSION"));

    let spi_mode = Mode {
        polarity: Polarity::IdleLow,
        phase: Phase::CaptureOnFirstTransition,
    };

    // SPI1: sound flash
    let flash_spi = Spi::new(dp.SPI1, (pins.flash.sck, pins.flash.miso, pins.flash.mosi))
        .enable::<u8>(spi_mode, 8.MHz(), &clocks, &mut rcc.apb2);
    let flash = At26f004::new(SpiBus::new(flash_spi), ChipSelect::active_low(pins.flash.cs))
        .unwrap();

    // SPI2: radio
    let radio_spi = Spi::new(dp.SPI2, (pins.radio.sck, pins.radio.miso, pins.radio.mosi))
        .enable::<u8>(spi_mode, 1.MHz(), &clocks, &mut rcc.apb1);
    let radio = RfPort::new(SpiBus::new(radio_spi), ChipSelect::active_low(pins.radio.cs));

    // Reset the radio, then let it run.
    let mut radio_reset = pins.radio.reset;
    radio_reset.set_low();
    cortex_m::asm::delay(16_000);
    radio_reset.set_high();

    // I2C1: core processor
    let i2c = BlockingI2c::i2c1(
        dp.I2C1,
        (pins.i2c1.scl, pins.i2c1.sda),
        I2cMode::standard(100.kHz()),
        &clocks,
        &mut rcc.apb1,
        50_000,
    );

    let amp = AmpSwitch::shutdown_low(pins.audio.amp_shutdown);

    let rf_cell = cortex_m::singleton!(
        : Mutex<RefCell<RfLink<Radio>>> = Mutex::new(RefCell::new(RfLink::new(radio)))
    )
    .unwrap();
    let rf = IrqCell::new(rf_cell);
    let streams = IrqCell::new(&STREAMS);

    let mut companion: Board = match Companion::with_shared(
        BlockingTwi::new(i2c),
        rf,
        streams,
        flash,
        amp,
        FirmwareInfo::current(),
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("sound store mount failed: {:?}", e);
            halt(&mut radio_reset);
        }
    };
    let initial_rate = companion.playback_rate();

    // Radio handshake lines
    let mut syscfg = dp.SYSCFG;
    let mut exti = dp.EXTI;
    let mut txe = pins.radio.txe;
    let mut spiack = pins.radio.spiack;
    arm_rising_edge(&mut txe, &mut syscfg, &mut exti, &mut rcc.apb2);
    arm_rising_edge(&mut spiack, &mut syscfg, &mut exti, &mut rcc.apb2);

    let audio = AudioHw {
        clock: SampleClock::tim2(dp.TIM2, initial_rate),
        pwm: SpeakerPwm::tim3(dp.TIM3),
        mic: Microphone::adc1(dp.ADC1, MIC_CHANNEL),
    };

    interrupt::free(|cs| {
        RF.borrow(cs).set(Some(rf));
        AUDIO.borrow(cs).replace(Some(audio));
        RADIO.borrow(cs).replace(Some(RadioLines { txe, spiack }));
    });

    // Sensor tick
    let mut syst = cp.SYST;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(clocks.sysclk().raw() / SENSOR_RATE_HZ - 1);
    syst.clear_current();
    syst.enable_counter();
    syst.enable_interrupt();

    unsafe {
        pac::NVIC::unmask(pac::Interrupt::EXTI9_5);
        pac::NVIC::unmask(pac::Interrupt::TIM2);
    }

    let online = pins.radio.online;
    let switches = pins.switches;

    loop {
        let c = &mut companion;
        if SENSOR_TICK.swap(false, Ordering::AcqRel) {
            c.sensors_tick(switches.levels(), online.is_high());
        }
        pump_bus(c);
        if let Err(e) = c.poll() {
            error!("sound flash: {:?}", e);
        }

        if c.check().is_err() {
            error!("queue corruption, halting");
            halt(&mut radio_reset);
        }
        if c.faults().check_stack(&stack::guard()).is_err() {
            error!("stack overflow, halting");
            halt(&mut radio_reset);
        }

        if c.ready_to_sleep() {
            enter_sleep(c);
        }
    }
}

/// Feed the statuses produced by the blocking bus adaptor back into the state machine.
fn pump_bus(c: &mut Board) {
    while let Some(status) = c.bus_mut().port_mut().take_event() {
        c.on_bus_event(status);
    }
}

fn enter_sleep(c: &mut Board) {
    // Tell the core, flush everything, then stop.
    c.prepare_sleep();
    while !c.cmds_sent() {
        pump_bus(c);
        if let Err(e) = c.poll() {
            error!("sound flash: {:?}", e);
        }
    }
    if let Err(e) = c.power_down() {
        error!("flash power-down: {:?}", e);
    }

    // The radio TXE edge wakes us up.
    cortex_m::asm::wfi();

    if let Err(e) = c.wake() {
        error!("flash resume: {:?}", e);
    }
}

/// Visible failure: pulse the radio reset line forever.
fn halt(reset: &mut gpioc::PC9<Output<PushPull>>) -> ! {
    loop {
        reset.set_high();
        reset.set_low();
    }
}

fn arm_rising_edge<P: ExtiPin>(
    pin: &mut P,
    syscfg: &mut pac::SYSCFG,
    exti: &mut pac::EXTI,
    apb2: &mut hal::rcc::APB2,
) {
    pin.make_interrupt_source(syscfg, apb2);
    pin.trigger_on_edge(exti, Edge::Rising);
    pin.enable_interrupt(exti);
}

#[interrupt]
fn EXTI9_5() {
    interrupt::free(|cs| {
        let mut lines = RADIO.borrow(cs).borrow_mut();
        let (Some(lines), Some(rf)) = (lines.as_mut(), RF.borrow(cs).get()) else {
            return;
        };

        if lines.txe.check_interrupt() {
            lines.txe.clear_interrupt_pending_bit();
            rf.lock(|rf| rf.on_txe());
        }
        if lines.spiack.check_interrupt() {
            lines.spiack.clear_interrupt_pending_bit();
            rf.lock(|rf| rf.on_ack());
        }
    });
}

#[interrupt]
fn TIM2() {
    interrupt::free(|cs| {
        let mut audio = AUDIO.borrow(cs).borrow_mut();
        let Some(audio) = audio.as_mut() else {
            return;
        };
        if !audio.clock.clear() {
            return;
        }

        let mic = audio.mic.sample();
        let mut streams = STREAMS.borrow(cs).borrow_mut();
        if let Some(sample) = streams.sample_tick(mic) {
            audio.pwm.write(sample);
        }
        audio.clock.set_reload(streams.rate.rate());
    });
}

#[exception]
fn SysTick() {
    SENSOR_TICK.store(true, Ordering::Release);
}
