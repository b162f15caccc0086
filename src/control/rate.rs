// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Playback-rate adaptation for the speaker stream.
//!
//! The radio delivers samples on its own clock while the PWM output consumes them on ours. The
//! controller looks at the speaker queue occupancy every so often and nudges the playback timer
//! reload by one step to keep the queue centered. Works in `no_std` with integer math only.

use crate::config::audio::{
    RATE_HIGH_WATERMARK, RATE_INITIAL, RATE_LOW_WATERMARK, RATE_MAX, RATE_MIN,
    RATE_PRESCALER_RELOAD,
};

/// Step controller driving the playback timer reload.
#[derive(Debug, Clone)]
pub struct RateAdapter {
    /// Current timer reload; smaller plays faster.
    rate: u8,
    prescaler: u8,
    prev_len: u8,
}

impl RateAdapter {
    pub const fn new() -> Self {
        Self {
            rate: RATE_INITIAL,
            prescaler: 0,
            prev_len: 0,
        }
    }

    /// Force a reload value, e.g. when flash playback starts.
    pub fn reset(&mut self, rate: u8) {
        self.rate = rate;
    }

    #[inline]
    pub fn rate(&self) -> u8 {
        self.rate
    }

    /// Called once per received audio frame with the speaker queue occupancy.
    ///
    /// Returns the (possibly unchanged) timer reload.
    pub fn update(&mut self, occupancy: usize) -> u8 {
        self.prescaler = self.prescaler.wrapping_add(1);
        if self.prescaler != 0 {
            return self.rate;
        }
        self.prescaler = RATE_PRESCALER_RELOAD;

        let len = occupancy.min(u8::MAX as usize) as u8;
        let rising = len >= self.prev_len;
        self.prev_len = len;

        if rising && len > RATE_HIGH_WATERMARK {
            self.rate = self.rate.saturating_sub(1);
        }
        if !rising && len < RATE_LOW_WATERMARK {
            self.rate = self.rate.saturating_add(1);
        }
        self.rate = self.rate.clamp(RATE_MIN, RATE_MAX);
        self.rate
    }
}

impl Default for RateAdapter {
    fn default() -> Self {
        Self::new()
    }
}
