// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Build-time configuration: link geometry, queue sizes, timeouts and firmware identity.

/// Framed radio link.
pub mod link {
    /// Bytes exchanged per frame in each direction.
    pub const FRAME_SIZE: usize = 39;
    /// Speaker samples carried by a frame from the radio.
    pub const SPEAKER_SAMPLES: usize = 33;
    /// Microphone samples carried by a frame to the radio.
    pub const MIC_SAMPLES: usize = 17;
}

/// Two-wire bus between the processors.
pub mod bus {
    /// 7-bit address of the core processor.
    pub const CORE_ADDR: u8 = 0x2A;
}

/// Command queue capacities in bytes.
pub mod queues {
    pub const CORE_OUT: usize = 16;
    pub const RF_OUT: usize = 32;
    pub const CORE_CMD_IN: usize = 32;
    pub const CORE_CMD_OUT: usize = 32;
}

/// Audio stream buffers and playback clock.
pub mod audio {
    pub const SPEAKER_FIFO: usize = 128;
    pub const MIC_FIFO: usize = 64;

    /// Frames to wait for the first sample of a recording.
    pub const RECORD_START_TIMEOUT: u16 = 5000;
    /// Frames of silence that end a recording once samples have arrived.
    pub const RECORD_STOP_TIMEOUT: u16 = 10;

    /// Playback timer reload values; larger is slower.
    pub const RATE_INITIAL: u8 = 250;
    pub const RATE_MIN: u8 = 240;
    pub const RATE_MAX: u8 = 254;
    /// Occupancy above which a rising queue speeds playback up.
    pub const RATE_HIGH_WATERMARK: u8 = 50;
    /// Occupancy below which a falling queue slows playback down.
    pub const RATE_LOW_WATERMARK: u8 = 70;
    /// Prescaler reload after each evaluation (next one 129 frames later).
    pub const RATE_PRESCALER_RELOAD: u8 = 127;
}

/// Companion housekeeping.
pub mod companion {
    /// Sensor ticks with the radio offline before a forced sleep.
    pub const DISCONNECT_TIMEOUT: u16 = 0x1000;
}

/// Sound store geometry on the serial flash.
pub mod store {
    /// Index table header byte at address 0.
    pub const INDEX_MARKER: u8 = 0xFE;
    /// Start of the first clip.
    pub const BASE: u32 = 0x00_0400;
    /// Last programmable address.
    pub const TOP: u32 = 0x07_FFFF;
    /// Erase block size; every clip after the first starts on a block boundary.
    pub const BLOCK_SIZE: u32 = 0x1000;
}

/// Firmware identity reported by the `VERSION`, `REVISION` and `AUTHOR` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareInfo {
    pub major: u8,
    pub minor: u8,
    pub update: u8,
    pub revision: u16,
    pub release_type: u8,
    pub author: u16,
    pub variation: u8,
}

impl FirmwareInfo {
    pub const RELEASE: u8 = 0;
    pub const LOCAL_MODIFICATIONS: u8 = 1;

    /// Identity of this build.
    pub const fn current() -> Self {
        Self {
            major: parse_u8(env!("CARGO_PKG_VERSION_MAJOR")),
            minor: parse_u8(env!("CARGO_PKG_VERSION_MINOR")),
            update: parse_u8(env!("CARGO_PKG_VERSION_PATCH")),
            revision: 0,
            release_type: Self::RELEASE,
            author: 0,
            variation: 0,
        }
    }
}

const fn parse_u8(s: &str) -> u8 {
    let bytes = s.as_bytes();
    let mut value: u8 = 0;
    let mut i = 0;
    while i < bytes.len() {
        value = value.wrapping_mul(10).wrapping_add(bytes[i] - b'0');
        i += 1;
    }
    value
}
