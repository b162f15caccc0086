// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-size frame exchanged with the radio front-end once per link period.
//!
//! Layout: `[index, config, command(4), audio(..)]`. Both directions use the same frame length;
//! only the first [`SPEAKER_SAMPLES`] or [`MIC_SAMPLES`] audio bytes are meaningful depending on
//! the direction.

use super::Record;
use crate::config::link::{FRAME_SIZE, MIC_SAMPLES, SPEAKER_SAMPLES};

pub mod offset {
    pub const INDEX: usize = 0;
    pub const CONFIG: usize = 1;
    pub const DATA: usize = 2;
    pub const AUDIO: usize = 6;
}

/// Frame configuration byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFlags {
    raw: u8,
}

impl ConfigFlags {
    pub const CRC_OK: u8 = 1 << 0;
    pub const DATA: u8 = 1 << 1;
    pub const AUDIO: u8 = 1 << 2;
    pub const SECOND_BUFFER: u8 = 1 << 3;
    pub const ACK: u8 = 1 << 4;
    pub const WAKEUP: u8 = 1 << 5;

    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Self { raw }
    }

    #[inline]
    pub fn raw(&self) -> u8 {
        self.raw
    }

    /// CRC checked by the sender.
    #[inline]
    pub fn crc_ok(&self) -> bool {
        (self.raw & Self::CRC_OK) != 0
    }

    /// Toggle bit of the command slot.
    #[inline]
    pub fn data(&self) -> bool {
        (self.raw & Self::DATA) != 0
    }

    /// Audio slot holds samples.
    #[inline]
    pub fn audio(&self) -> bool {
        (self.raw & Self::AUDIO) != 0
    }

    /// Toggle bit acknowledging the peer's command slot.
    #[inline]
    pub fn ack(&self) -> bool {
        (self.raw & Self::ACK) != 0
    }

    /// First frame after the sender woke up.
    #[inline]
    pub fn wakeup(&self) -> bool {
        (self.raw & Self::WAKEUP) != 0
    }

    #[inline]
    pub fn toggle_data(&mut self) {
        self.raw ^= Self::DATA;
    }

    #[inline]
    pub fn toggle_ack(&mut self) {
        self.raw ^= Self::ACK;
    }

    #[inline]
    pub fn set_audio(&mut self, on: bool) {
        self.set(Self::AUDIO, on);
    }

    #[inline]
    pub fn set_wakeup(&mut self, on: bool) {
        self.set(Self::WAKEUP, on);
    }

    fn set(&mut self, mask: u8, on: bool) {
        if on {
            self.raw |= mask;
        } else {
            self.raw &= !mask;
        }
    }
}

/// One frame worth of bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_SIZE],
}

impl Frame {
    pub const fn new() -> Self {
        Self {
            bytes: [0; FRAME_SIZE],
        }
    }

    pub fn from_bytes(bytes: [u8; FRAME_SIZE]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.bytes
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8; FRAME_SIZE] {
        &mut self.bytes
    }

    #[inline]
    pub fn index(&self) -> u8 {
        self.bytes[offset::INDEX]
    }

    #[inline]
    pub fn set_index(&mut self, index: u8) {
        self.bytes[offset::INDEX] = index;
    }

    #[inline]
    pub fn flags(&self) -> ConfigFlags {
        ConfigFlags::from_raw(self.bytes[offset::CONFIG])
    }

    #[inline]
    pub fn set_flags(&mut self, flags: ConfigFlags) {
        self.bytes[offset::CONFIG] = flags.raw();
    }

    pub fn command(&self) -> Record {
        let mut rec = [0u8; Record::SIZE];
        rec.copy_from_slice(&self.bytes[offset::DATA..offset::AUDIO]);
        Record::from_bytes(rec)
    }

    pub fn set_command(&mut self, record: Record) {
        self.bytes[offset::DATA..offset::AUDIO].copy_from_slice(record.as_bytes());
    }

    /// Samples coming from the radio (speaker direction).
    #[inline]
    pub fn speaker_audio(&self) -> &[u8] {
        &self.bytes[offset::AUDIO..offset::AUDIO + SPEAKER_SAMPLES]
    }

    /// Sample slot going to the radio (microphone direction).
    #[inline]
    pub fn mic_audio_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[offset::AUDIO..offset::AUDIO + MIC_SAMPLES]
    }

    #[inline]
    pub fn mic_audio(&self) -> &[u8] {
        &self.bytes[offset::AUDIO..offset::AUDIO + MIC_SAMPLES]
    }

    #[inline]
    pub fn speaker_audio_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[offset::AUDIO..offset::AUDIO + SPEAKER_SAMPLES]
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
