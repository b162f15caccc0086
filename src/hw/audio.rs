// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Audio path peripherals using direct PAC register access.
//!
//! - `SampleClock`: TIM2 update interrupt at the playback sample rate. The auto-reload value is
//!   the rate chosen by the rate controller.
//! - `SpeakerPwm`: TIM3 channel 1 PWM with an 8-bit period; one speaker sample is one duty value.
//! - `Microphone`: ADC1 single channel, 8-bit, one conversion started per sample tick.

use stm32f7xx_hal::pac;

/// Timer clock divided down to 2 MHz from the 16 MHz reset clock.
const SAMPLE_PRESCALER: u16 = 7;

pub struct SampleClock {
    tim: pac::TIM2,
}

impl SampleClock {
    /// Configure TIM2 and start it with the given reload value.
    pub fn tim2(tim2: pac::TIM2, reload: u8) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());

        let tim = tim2;
        tim.cr1.modify(|_, w| w.cen().clear_bit());
        tim.psc.write(|w| w.psc().bits(SAMPLE_PRESCALER));
        tim.arr.write(|w| w.bits(reload as u32));
        tim.dier.modify(|_, w| w.uie().set_bit());
        tim.cr1.modify(|_, w| w.arpe().set_bit().cen().set_bit());

        Self { tim }
    }

    /// New reload value; takes effect at the next update.
    #[inline]
    pub fn set_reload(&mut self, reload: u8) {
        self.tim.arr.write(|w| w.bits(reload as u32));
    }

    /// Acknowledge the update interrupt. Returns `false` for a spurious entry.
    #[inline]
    pub fn clear(&mut self) -> bool {
        let pending = self.tim.sr.read().uif().bit_is_set();
        self.tim.sr.modify(|_, w| w.uif().clear_bit());
        pending
    }

    pub fn free(self) -> pac::TIM2 {
        self.tim
    }
}

pub struct SpeakerPwm {
    tim: pac::TIM3,
}

impl SpeakerPwm {
    /// Configure TIM3 CH1 as an 8-bit PWM output, idle at mid-scale.
    pub fn tim3(tim3: pac::TIM3) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim3en().set_bit());

        let tim = tim3;
        tim.cr1.modify(|_, w| w.cen().clear_bit());
        tim.psc.write(|w| w.psc().bits(0));
        tim.arr.write(|w| w.bits(0xFF));
        tim.ccr1.write(|w| w.bits(0x80));

        // PWM mode 1 with preload
        tim.ccmr1_output()
            .modify(|_, w| unsafe { w.oc1m().bits(0b110) }.oc1pe().set_bit());
        tim.ccer.modify(|_, w| w.cc1e().set_bit());
        tim.cr1.modify(|_, w| w.arpe().set_bit().cen().set_bit());

        Self { tim }
    }

    #[inline]
    pub fn write(&mut self, sample: u8) {
        self.tim.ccr1.write(|w| w.bits(sample as u32));
    }

    pub fn free(self) -> pac::TIM3 {
        self.tim
    }
}

pub struct Microphone {
    adc: pac::ADC1,
    channel: u8,
}

impl Microphone {
    /// Configure ADC1 for 8-bit software-triggered conversions of `channel`.
    pub fn adc1(adc1: pac::ADC1, channel: u8) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adc1en().set_bit());

        let common = unsafe { &*pac::ADC_COMMON::ptr() };
        // ADC prescaler: PCLK2 / 4
        common.ccr.modify(|_, w| w.adcpre().div4());

        let adc = adc1;
        adc.cr2.modify(|_, w| w.adon().clear_bit());

        // 8-bit, right-aligned, software trigger
        adc.cr1.modify(|_, w| w.res().bits(0b10));
        adc.cr2.modify(|_, w| {
            w.cont().clear_bit();
            w.align().right();
            w.exten().disabled();
            w
        });
        adc.smpr2.modify(|_, w| unsafe { w.bits(0) });

        // Sequence length = 1 conversion
        adc.sqr1.modify(|_, w| w.l().bits(0));
        adc.sqr3.modify(|_, w| unsafe { w.sq1().bits(channel & 0x1F) });

        adc.cr2.modify(|_, w| w.adon().set_bit());

        Self { adc, channel }
    }

    /// Result of the previous conversion, if finished, and start the next one.
    pub fn sample(&mut self) -> Option<u8> {
        let value = if self.adc.sr.read().eoc().bit_is_set() {
            Some(self.adc.dr.read().data().bits() as u8)
        } else {
            None
        };
        self.adc.cr2.modify(|_, w| w.swstart().set_bit());
        value
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn free(self) -> pac::ADC1 {
        self.adc
    }
}
