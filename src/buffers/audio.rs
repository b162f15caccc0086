// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Audio stream buffers between the radio frames, the sample clock and the sound store.
//!
//! The sample clock interrupt owns this state together with the main loop; see
//! [`crate::shared`].

use super::Fifo;
use crate::config::audio::{MIC_FIFO, SPEAKER_FIFO};
use crate::control::RateAdapter;

/// Speaker and microphone queues, the playback clock and the silence counter that times out
/// recordings.
pub struct AudioStreams {
    /// Radio or flash playback to the PWM output.
    pub speaker: Fifo<SPEAKER_FIFO>,
    /// ADC samples waiting for the next outgoing frame.
    pub mic: Fifo<MIC_FIFO>,
    /// Reload of the sample clock.
    pub rate: RateAdapter,
    silence: u16,
    mic_phase: bool,
    output: bool,
}

impl AudioStreams {
    pub const fn new() -> Self {
        Self {
            speaker: Fifo::new(),
            mic: Fifo::new(),
            rate: RateAdapter::new(),
            silence: 0,
            mic_phase: false,
            output: true,
        }
    }

    /// Deposit received speaker samples. Samples that do not fit are dropped.
    pub fn push_speaker(&mut self, samples: &[u8]) -> usize {
        samples
            .iter()
            .take_while(|&&s| self.speaker.put(s).is_ok())
            .count()
    }

    /// Sample clock tick: return the next speaker sample and take a microphone sample every
    /// other tick. While the output is held the speaker queue is left alone.
    pub fn sample_tick(&mut self, mic: Option<u8>) -> Option<u8> {
        self.mic_phase = !self.mic_phase;
        if self.mic_phase {
            if let Some(sample) = mic {
                let _ = self.mic.put(sample);
            }
        }
        if !self.output {
            return None;
        }
        self.speaker.get()
    }

    /// Stop feeding the speaker; the store drains the queue itself while recording or erasing.
    #[inline]
    pub fn hold_output(&mut self) {
        self.output = false;
    }

    #[inline]
    pub fn release_output(&mut self) {
        self.output = true;
    }

    #[inline]
    pub fn output_held(&self) -> bool {
        !self.output
    }

    /// Restart the silence countdown with `frames` frames.
    #[inline]
    pub fn arm_silence(&mut self, frames: u16) {
        self.silence = frames;
    }

    /// A frame without audio went by.
    #[inline]
    pub fn silent_frame(&mut self) {
        self.silence = self.silence.saturating_sub(1);
    }

    #[inline]
    pub fn silence_expired(&self) -> bool {
        self.silence == 0
    }

    #[inline]
    pub fn silence_left(&self) -> u16 {
        self.silence
    }

    pub fn clear(&mut self) {
        self.speaker.clear();
        self.mic.clear();
    }
}

impl Default for AudioStreams {
    fn default() -> Self {
        Self::new()
    }
}
