// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Audio amplifier shutdown line.

use embedded_hal::digital::OutputPin;

/// Mute control used by the command router.
pub trait Amplifier {
    fn mute(&mut self);
    fn unmute(&mut self);
    fn is_muted(&self) -> bool;
}

/// Whether the shutdown input mutes when driven high or low.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActiveLevel {
    High,
    Low,
}

/// Amplifier muted through a GPIO shutdown pin.
pub struct AmpSwitch<PIN: OutputPin> {
    pin: PIN,
    mute_level: ActiveLevel,
    muted: bool,
}

impl<PIN: OutputPin> AmpSwitch<PIN> {
    /// Wrap the shutdown pin; the amplifier starts unmuted.
    pub fn new(pin: PIN, mute_level: ActiveLevel) -> Self {
        let mut amp = Self {
            pin,
            mute_level,
            muted: true,
        };
        amp.set_muted(false);
        amp
    }

    /// Shutdown pin that mutes when pulled low.
    pub fn shutdown_low(pin: PIN) -> Self {
        Self::new(pin, ActiveLevel::Low)
    }

    pub fn set_muted(&mut self, muted: bool) {
        match (self.mute_level, muted) {
            (ActiveLevel::High, true) | (ActiveLevel::Low, false) => self.pin.set_high().ok(),
            (ActiveLevel::High, false) | (ActiveLevel::Low, true) => self.pin.set_low().ok(),
        };
        self.muted = muted;
    }

    pub fn free(self) -> PIN {
        self.pin
    }
}

impl<PIN: OutputPin> Amplifier for AmpSwitch<PIN> {
    #[inline]
    fn mute(&mut self) {
        self.set_muted(true);
    }

    #[inline]
    fn unmute(&mut self) {
        self.set_muted(false);
    }

    #[inline]
    fn is_muted(&self) -> bool {
        self.muted
    }
}
