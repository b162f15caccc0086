// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Core processor firmware: bus slave to the companion, command execution and status reports.

#![no_main]
#![no_std]

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m::interrupt::{self, Mutex};
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::{entry, exception};
use log::{debug, error, info, LevelFilter};
use panic_halt as _;

use hal::{
    gpio::{gpiod, Output, PushPull},
    pac::{self, interrupt},
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use robolink::config::{bus::CORE_ADDR, FirmwareInfo};
use robolink::fault::FaultState;
use robolink::hw::{stack, CorePins, I2cSlave, IrqCell, Usart, UsartLogger};
use robolink::link::{Actuators, CoreBus, CoreLink};
use robolink::protocol::Record;
use robolink::Shared;

/// Status reports per second.
const STATUS_RATE_HZ: u32 = 10;

// LED commands
const LED_ON: u8 = 0x1A;
const LED_OFF: u8 = 0x1B;
const LED_TOGGLE: u8 = 0x9A;
const LED_SET: u8 = 0xD1;

static BUS: Mutex<Cell<Option<IrqCell<CoreBus<I2cSlave>>>>> = Mutex::new(Cell::new(None));
static FAULTS: FaultState = FaultState::new();
static STATUS_TICK: AtomicBool = AtomicBool::new(false);
static LOGGER: UsartLogger<pac::USART1> = UsartLogger::new(LevelFilter::Info);

/// Eye LEDs. Bit 0 of an LED mask is the left eye, bit 1 the right eye.
struct Eyes {
    left: gpiod::PD9<Output<PushPull>>,
    right: gpiod::PD10<Output<PushPull>>,
    lit: u8,
}

impl Eyes {
    fn set(&mut self, mask: u8, on: bool) {
        if on {
            self.lit |= mask & 0x03;
        } else {
            self.lit &= !mask;
        }
        if self.lit & 0x01 != 0 {
            self.left.set_high();
        } else {
            self.left.set_low();
        }
        if self.lit & 0x02 != 0 {
            self.right.set_high();
        } else {
            self.right.set_low();
        }
    }
}

impl Actuators for Eyes {
    fn execute(&mut self, record: &Record) -> bool {
        match record.opcode() {
            LED_ON => self.set(0x03, true),
            LED_OFF => self.set(0x03, false),
            LED_SET => self.set(record.p1(), record.p2() != 0),
            LED_TOGGLE => {
                let mask = record.p2() & 0x03;
                let lit = self.lit;
                self.set(mask & !lit, true);
                self.set(mask & lit, false);
            }
            other => {
                debug!("no actuator for {:#04x}", other);
                return false;
            }
        }
        true
    }
}

#[entry]
fn main() -> ! {
    stack::paint();

    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();

    let pins = CorePins::new(dp.GPIOA, dp.GPIOB, dp.GPIOD);

    // USART1 (DBG)
    let usart_cfg = Config {
        baud_rate: 115_200.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART1, (pins.usart1.tx, pins.usart1.rx), &clocks, usart_cfg);
    let _ = LOGGER.install(Usart::new(serial));
    info!("core firmware {}", env!("CARGO_PKG_VERSION"));

    // I2C1 slave; the pins only need their alternate function.
    let _i2c_pins = pins.i2c1;
    let bus = IrqCell::new(
        cortex_m::singleton!(
            : Mutex<RefCell<CoreBus<I2cSlave>>> =
                Mutex::new(RefCell::new(CoreBus::new(I2cSlave::i2c1(dp.I2C1, CORE_ADDR))))
        )
        .unwrap(),
    );
    let mut link: CoreLink<I2cSlave, IrqCell<CoreBus<I2cSlave>>> =
        CoreLink::with_shared(bus, FirmwareInfo::current());
    interrupt::free(|cs| BUS.borrow(cs).set(Some(bus)));

    let mut eyes = Eyes {
        left: pins.leds.yellow,
        right: pins.leds.green,
        lit: 0,
    };
    let mut sleep_led = pins.leds.red;

    let mut syst = cp.SYST;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(clocks.sysclk().raw() / STATUS_RATE_HZ - 1);
    syst.clear_current();
    syst.enable_counter();
    syst.enable_interrupt();

    unsafe {
        pac::NVIC::unmask(pac::Interrupt::I2C1_EV);
        pac::NVIC::unmask(pac::Interrupt::I2C1_ER);
    }

    loop {
        if STATUS_TICK.swap(false, Ordering::AcqRel) {
            link.status_tick();
        }
        link.poll(&mut eyes);

        if FAULTS.check_stack(&stack::guard()).is_err() {
            error!("stack overflow, halting");
            halt(&mut sleep_led);
        }

        if link.sleep_requested() && link.cmds_sent() {
            info!("sleeping");
            sleep_led.set_high();
            // The companion's next bus access wakes us up.
            cortex_m::asm::wfi();
            sleep_led.set_low();
            link.wake();
        }
    }
}

/// Visible failure: flicker the red LED forever.
fn halt(led: &mut gpiod::PD8<Output<PushPull>>) -> ! {
    loop {
        led.set_high();
        led.set_low();
    }
}

fn service_bus() {
    interrupt::free(|cs| {
        if let Some(bus) = BUS.borrow(cs).get() {
            bus.lock(|b| {
                while let Some(status) = b.slave_mut().port_mut().status() {
                    b.on_event(status);
                }
            });
        }
    });
}

#[interrupt]
fn I2C1_EV() {
    service_bus();
}

#[interrupt]
fn I2C1_ER() {
    service_bus();
}

#[exception]
fn SysTick() {
    STATUS_TICK.store(true, Ordering::Release);
}
