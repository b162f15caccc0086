// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F777 boards of both processors.

use stm32f7xx_hal::{
    gpio::{
        gpioa, gpiob, gpioc, gpiod, gpioe, Alternate, Analog, Floating, Input, OpenDrain, Output,
        PullUp, PushPull,
    },
    pac,
    prelude::*,
};

/// Companion board pins. Construct this once at startup using:
///
/// ```rust
/// let pins = CompanionPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOC, dp.GPIOD, dp.GPIOE);
/// ```
pub struct CompanionPins {
    pub usart1: Usart1Pins,
    pub flash: FlashPins,
    pub radio: RadioPins,
    pub i2c1: I2c1Pins,
    pub audio: AudioPins,
    pub switches: SwitchPins,
}

/// Core board pins.
pub struct CorePins {
    pub usart1: Usart1Pins,
    pub i2c1: I2c1Pins,
    pub leds: LedPins,
}

pub struct Usart1Pins {
    pub tx: gpioa::PA9<Alternate<7>>,
    pub rx: gpioa::PA10<Alternate<7>>,
}

/// SPI1 to the AT26F004 sound flash
pub struct FlashPins {
    pub sck: gpioa::PA5<Alternate<5>>,
    pub miso: gpioa::PA6<Alternate<5>>,
    pub mosi: gpioa::PA7<Alternate<5>>,
    pub cs: gpioa::PA4<Output<PushPull>>,
}

/// SPI2 to the radio front-end plus its handshake lines
pub struct RadioPins {
    pub sck: gpiob::PB13<Alternate<5>>,
    pub miso: gpiob::PB14<Alternate<5>>,
    pub mosi: gpiob::PB15<Alternate<5>>,
    pub cs: gpiob::PB12<Output<PushPull>>,
    pub txe: gpioc::PC6<Input<Floating>>,    // EXTI6, rising edge
    pub spiack: gpioc::PC7<Input<Floating>>, // EXTI7, rising edge
    pub online: gpioc::PC8<Input<PullUp>>,
    pub reset: gpioc::PC9<Output<PushPull>>,
}

/// I2C1 between the processors
pub struct I2c1Pins {
    pub scl: gpiob::PB8<Alternate<4, OpenDrain>>,
    pub sda: gpiob::PB9<Alternate<4, OpenDrain>>,
}

pub struct AudioPins {
    pub speaker: gpiob::PB4<Alternate<2>>, // TIM3_CH1 (PWM)
    pub mic: gpioc::PC0<Analog>,           // ADC1_IN10
    pub amp_shutdown: gpiod::PD3<Output<PushPull>>,
}

/// Switch inputs PE0..PE7, active low, read together.
pub struct SwitchPins {
    pub pe0: gpioe::PE0<Input<PullUp>>,
    pub pe1: gpioe::PE1<Input<PullUp>>,
    pub pe2: gpioe::PE2<Input<PullUp>>,
    pub pe3: gpioe::PE3<Input<PullUp>>,
    pub pe4: gpioe::PE4<Input<PullUp>>,
    pub pe5: gpioe::PE5<Input<PullUp>>,
    pub pe6: gpioe::PE6<Input<PullUp>>,
    pub pe7: gpioe::PE7<Input<PullUp>>,
}

impl SwitchPins {
    /// Raw levels of PE0..PE7.
    pub fn levels(&self) -> u8 {
        let gpioe = unsafe { &*pac::GPIOE::ptr() };
        gpioe.idr.read().bits() as u8
    }
}

pub struct LedPins {
    pub red: gpiod::PD8<Output<PushPull>>,
    pub yellow: gpiod::PD9<Output<PushPull>>,
    pub green: gpiod::PD10<Output<PushPull>>,
}

impl CompanionPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(
        gpioa: pac::GPIOA,
        gpiob: pac::GPIOB,
        gpioc: pac::GPIOC,
        gpiod: pac::GPIOD,
        gpioe: pac::GPIOE,
    ) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();
        let gpioc = gpioc.split();
        let gpiod = gpiod.split();
        let gpioe = gpioe.split();

        Self {
            usart1: Usart1Pins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            flash: FlashPins {
                sck: gpioa.pa5.into_alternate::<5>(),
                miso: gpioa.pa6.into_alternate::<5>(),
                mosi: gpioa.pa7.into_alternate::<5>(),
                cs: gpioa.pa4.into_push_pull_output(),
            },

            radio: RadioPins {
                sck: gpiob.pb13.into_alternate::<5>(),
                miso: gpiob.pb14.into_alternate::<5>(),
                mosi: gpiob.pb15.into_alternate::<5>(),
                cs: gpiob.pb12.into_push_pull_output(),
                txe: gpioc.pc6.into_floating_input(),
                spiack: gpioc.pc7.into_floating_input(),
                online: gpioc.pc8.into_pull_up_input(),
                reset: gpioc.pc9.into_push_pull_output(),
            },

            i2c1: I2c1Pins {
                scl: gpiob.pb8.into_alternate_open_drain::<4>(),
                sda: gpiob.pb9.into_alternate_open_drain::<4>(),
            },

            audio: AudioPins {
                speaker: gpiob.pb4.into_alternate::<2>(),
                mic: gpioc.pc0.into_analog(),
                amp_shutdown: gpiod.pd3.into_push_pull_output(),
            },

            switches: SwitchPins {
                pe0: gpioe.pe0.into_pull_up_input(),
                pe1: gpioe.pe1.into_pull_up_input(),
                pe2: gpioe.pe2.into_pull_up_input(),
                pe3: gpioe.pe3.into_pull_up_input(),
                pe4: gpioe.pe4.into_pull_up_input(),
                pe5: gpioe.pe5.into_pull_up_input(),
                pe6: gpioe.pe6.into_pull_up_input(),
                pe7: gpioe.pe7.into_pull_up_input(),
            },
        }
    }
}

impl CorePins {
    pub fn new(gpioa: pac::GPIOA, gpiob: pac::GPIOB, gpiod: pac::GPIOD) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();
        let gpiod = gpiod.split();

        Self {
            usart1: Usart1Pins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            i2c1: I2c1Pins {
                scl: gpiob.pb8.into_alternate_open_drain::<4>(),
                sda: gpiob.pb9.into_alternate_open_drain::<4>(),
            },

            leds: LedPins {
                red: gpiod.pd8.into_push_pull_output(),
                yellow: gpiod.pd9.into_push_pull_output(),
                green: gpiod.pd10.into_push_pull_output(),
            },
        }
    }
}
