// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command opcodes exchanged between the host, the companion and the core processor.

use super::Record;
use crate::config::FirmwareInfo;

// Identity and version
pub const INFO_TUXCORE: u8 = 0x02;
pub const INFO_TUXAUDIO: u8 = 0x03;
pub const INFO_TUXRF: u8 = 0x04;
pub const INFO_FUXRF: u8 = 0x05;
pub const INFO_FUXUSB: u8 = 0x06;
pub const VERSION: u8 = 0xC8;
pub const REVISION: u8 = 0xC9;
pub const AUTHOR: u8 = 0xCA;

// Audio and sound store
pub const PLAY_SOUND: u8 = 0x90;
pub const STORE_SOUND: u8 = 0x52;
pub const CONFIRM_STORAGE: u8 = 0x53;
pub const ERASE_FLASH: u8 = 0x54;
pub const MUTE: u8 = 0x92;
pub const SOUND_VAR: u8 = 0xCB;
pub const STATUS_AUDIO: u8 = 0xCC;
pub const STATUS_FLASH_PROG: u8 = 0xCD;

// Link management
pub const NULL: u8 = 0x00;
pub const SLEEP: u8 = 0xB7;
pub const SET_ID: u8 = 0xB5;
pub const CONNECT_ID: u8 = 0xB6;
pub const PING: u8 = 0x7F;
pub const PONG: u8 = 0xFF;
pub const COND_RESET: u8 = 0x3E;
pub const GERROR: u8 = 0xF9;

// Status
pub const SEND_AUDIOSENSORS: u8 = 0xF0;
pub const STATUS_SENSORS1: u8 = 0xC1;

/// Processor numbers carried in version and error records.
pub mod cpu {
    pub const CORE: u8 = 0;
    pub const AUDIO: u8 = 1;
}

/// Sleep request flavours (first parameter of `SLEEP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepKind {
    Awake,
    Quick,
    Normal,
    Continue,
    Deep,
    Unknown(u8),
}

impl SleepKind {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => SleepKind::Awake,
            1 => SleepKind::Quick,
            2 => SleepKind::Normal,
            3 => SleepKind::Continue,
            4 => SleepKind::Deep,
            other => SleepKind::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            SleepKind::Awake => 0,
            SleepKind::Quick => 1,
            SleepKind::Normal => 2,
            SleepKind::Continue => 3,
            SleepKind::Deep => 4,
            SleepKind::Unknown(v) => v,
        }
    }
}

/// Sound-store progress reported in `STATUS_FLASH_PROG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FlashStatus {
    Standby = 0,
    InProgress = 1,
    WaitingForConfirmation = 2,
    WriteToc = 3,
    ErasingLastSound = 4,
    FlashFull = 5,
    NoSound = 6,
}

/// The `VERSION`, `REVISION` and `AUTHOR` records describing `cpu`'s firmware.
pub fn identity_records(info: &FirmwareInfo, cpu: u8) -> [Record; 3] {
    let [rev_lsb, rev_msb] = info.revision.to_le_bytes();
    let [id_lsb, id_msb] = info.author.to_le_bytes();
    [
        Record::new(VERSION, (cpu & 0x07) | (info.major << 3), info.minor, info.update),
        Record::new(REVISION, rev_lsb, rev_msb, info.release_type),
        Record::new(AUTHOR, id_lsb, id_msb, info.variation),
    ]
}

/// Decoded form of the records either processor acts on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Null,
    InfoCore,
    InfoAudio,
    /// Identity records the companion echoes straight back to the host.
    Identity,
    PlaySound { clip: u8, level: u8 },
    Mute(bool),
    StoreSound,
    ConfirmStorage(bool),
    EraseFlash,
    ConnectId,
    Sleep { kind: SleepKind, ack: bool },
    Ping { count: u8 },
    Pong { remaining: u8 },
    AudioSensors { switches: SwitchStatus, clip: u8, active: bool },
    CondReset,
    Other(u8),
}

impl Command {
    pub fn decode(record: &Record) -> Self {
        let (p1, p2, p3) = (record.p1(), record.p2(), record.p3());
        match record.opcode() {
            NULL => Command::Null,
            INFO_TUXCORE => Command::InfoCore,
            INFO_TUXAUDIO => Command::InfoAudio,
            AUTHOR | REVISION | VERSION | INFO_FUXRF => Command::Identity,
            PLAY_SOUND => Command::PlaySound { clip: p1, level: p2 },
            MUTE => Command::Mute(p1 != 0),
            STORE_SOUND => Command::StoreSound,
            CONFIRM_STORAGE => Command::ConfirmStorage(p1 != 0),
            ERASE_FLASH => Command::EraseFlash,
            CONNECT_ID => Command::ConnectId,
            SLEEP => Command::Sleep {
                kind: SleepKind::from_u8(p1),
                ack: p2 != 0,
            },
            PING => Command::Ping { count: p1 },
            PONG => Command::Pong { remaining: p1 },
            SEND_AUDIOSENSORS => Command::AudioSensors {
                switches: SwitchStatus::from_raw(p1),
                clip: p2,
                active: p3 != 0,
            },
            COND_RESET => Command::CondReset,
            other => Command::Other(other),
        }
    }
}

/// Switch and link bits reported by the companion in `SEND_AUDIOSENSORS`.
///
/// A set bit means "pressed", "plugged" or "connected".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SwitchStatus {
    raw: u8,
}

impl SwitchStatus {
    pub const LEFT_WING: u8 = 1 << 0;
    pub const RIGHT_WING: u8 = 1 << 1;
    pub const POWER_PLUG: u8 = 1 << 2;
    pub const HEAD: u8 = 1 << 3;
    pub const CHARGER: u8 = 1 << 4;
    pub const RF: u8 = 1 << 5;
    pub const VCC: u8 = 1 << 6;
    pub const MUTE: u8 = 1 << 7;

    /// Pins are read active-low for these inputs; the record carries them inverted.
    pub const INVERTED: u8 = 0x9B;

    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Self { raw }
    }

    /// Build the wire byte from raw pin levels and the radio state.
    pub fn from_pins(pins: u8, rf_online: bool) -> Self {
        let mut raw = pins & !Self::RF;
        if rf_online {
            raw |= Self::RF;
        }
        Self {
            raw: raw ^ Self::INVERTED,
        }
    }

    #[inline]
    pub fn raw(&self) -> u8 {
        self.raw
    }

    #[inline]
    pub fn left_wing(&self) -> bool {
        (self.raw & Self::LEFT_WING) != 0
    }

    #[inline]
    pub fn right_wing(&self) -> bool {
        (self.raw & Self::RIGHT_WING) != 0
    }

    /// Power plug inserted.
    #[inline]
    pub fn power_plug(&self) -> bool {
        (self.raw & Self::POWER_PLUG) != 0
    }

    #[inline]
    pub fn head(&self) -> bool {
        (self.raw & Self::HEAD) != 0
    }

    /// Charger active.
    #[inline]
    pub fn charger(&self) -> bool {
        (self.raw & Self::CHARGER) != 0
    }

    /// Radio connected to the host.
    #[inline]
    pub fn rf(&self) -> bool {
        (self.raw & Self::RF) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_sleep_and_play() {
        assert_eq!(
            Command::decode(&Record::new(SLEEP, 1, 1, 0)),
            Command::Sleep {
                kind: SleepKind::Quick,
                ack: true
            }
        );
        assert_eq!(
            Command::decode(&Record::new(PLAY_SOUND, 4, 2, 0)),
            Command::PlaySound { clip: 4, level: 2 }
        );
        assert_eq!(
            Command::decode(&Record::new(0x40, 3, 0, 0)),
            Command::Other(0x40)
        );
    }

    #[test]
    fn version_record_packs_cpu_and_major() {
        let info = FirmwareInfo {
            major: 0,
            minor: 9,
            update: 4,
            revision: 0x1234,
            release_type: FirmwareInfo::RELEASE,
            author: 0x0201,
            variation: 3,
        };
        let [ver, rev, author] = identity_records(&info, cpu::AUDIO);
        assert_eq!(ver, Record::new(VERSION, 0x01, 9, 4));
        assert_eq!(rev, Record::new(REVISION, 0x34, 0x12, 0));
        assert_eq!(author, Record::new(AUTHOR, 0x01, 0x02, 3));
    }

    #[test]
    fn switch_bits_are_inverted_on_the_wire() {
        // All active-low inputs idle high, radio offline.
        let idle = SwitchStatus::from_pins(0x9B, false);
        assert!(!idle.head());
        assert!(!idle.left_wing());
        assert!(!idle.rf());

        let head_pressed = SwitchStatus::from_pins(0x9B & !SwitchStatus::HEAD, true);
        assert!(head_pressed.head());
        assert!(head_pressed.rf());
    }
}
