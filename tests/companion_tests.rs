// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! End-to-end tests: host frames through the companion and across the bus to the core

mod common;

use common::{core_of, exchange_frame, exchange_frame_with, MemFlash, Recorder, TestCompanion};
use robolink::config::bus::CORE_ADDR;
use robolink::config::companion::DISCONNECT_TIMEOUT;
use robolink::config::link::{MIC_SAMPLES, SPEAKER_SAMPLES};
use robolink::config::store::BASE;
use robolink::protocol::messages;
use robolink::protocol::{FlashStatus, Frame, Handshake, Record};
use robolink::store::{flash_status, StoreControl};
use robolink::Shared;

const LED_ON: u8 = 0x1A;

/// The host end of the radio link.
struct Host {
    hs: Handshake,
    frame: Frame,
    got: Vec<Record>,
    eyes: Recorder,
}

impl Host {
    fn new() -> Self {
        Self {
            hs: Handshake::new(),
            frame: Frame::new(),
            got: Vec::new(),
            eyes: Recorder {
                known: vec![LED_ON],
                ..Recorder::default()
            },
        }
    }

    /// One frame period with the host sending `command` and optional speaker audio. The core
    /// runs one pass of its main loop afterwards. Returns the companion's frame.
    fn step(
        &mut self,
        c: &mut TestCompanion,
        command: Option<Record>,
        audio: Option<&[u8]>,
    ) -> Frame {
        self.step_with(c, command, audio, |_| {})
    }

    /// [`Self::step`], running `between` before the companion's idle pass.
    fn step_with(
        &mut self,
        c: &mut TestCompanion,
        command: Option<Record>,
        audio: Option<&[u8]>,
        between: impl FnMut(&mut TestCompanion),
    ) -> Frame {
        assert!(self.hs.prepare(&mut self.frame, command, audio.is_some()).is_ok());
        if let Some(samples) = audio {
            self.frame.speaker_audio_mut().copy_from_slice(samples);
        }
        let sent = exchange_frame_with(c, self.frame, between);
        if let Some(record) = self.hs.receive(&sent) {
            self.got.push(record);
        }
        core_of(c).poll(&mut self.eyes);
        sent
    }

    fn idle(&mut self, c: &mut TestCompanion, frames: usize) {
        for _ in 0..frames {
            self.step(c, None, None);
        }
    }
}

fn online_companion() -> TestCompanion {
    let mut c = common::companion(MemFlash::formatted(), CORE_ADDR);
    c.queues_mut().set_rf_online(true);
    c
}

#[test]
fn test_host_command_reaches_the_core_actuators() {
    let mut c = online_companion();
    let mut host = Host::new();
    let led = Record::new(LED_ON, 2, 0, 0);

    let sent = host.step(&mut c, Some(led), None);
    // The command is acknowledged in the frame after the one that carried it.
    assert!(!sent.flags().ack());
    let sent = host.step(&mut c, None, None);
    assert!(sent.flags().ack());

    assert_eq!(host.eyes.executed, vec![led]);
}

#[test]
fn test_replayed_frame_does_not_repeat_a_command() {
    let mut c = online_companion();
    let mut host = Host::new();
    let led = Record::new(LED_ON, 2, 0, 0);

    host.step(&mut c, Some(led), None);
    // Same frame again, index unchanged.
    exchange_frame(&mut c, host.frame);
    core_of(&mut c).poll(&mut host.eyes);
    host.idle(&mut c, 3);

    assert_eq!(host.eyes.executed, vec![led]);
}

#[test]
fn test_ping_is_answered_with_pongs() {
    let mut c = online_companion();
    let mut host = Host::new();

    host.step(&mut c, Some(Record::new(messages::PING, 2, 0, 0)), None);
    host.idle(&mut c, 12);

    assert_eq!(
        host.got,
        vec![
            Record::new(messages::PONG, 1, 0, 0),
            Record::new(messages::PONG, 0, 0, 0),
        ]
    );
}

#[test]
fn test_info_request_for_the_core_is_answered_by_the_core() {
    let mut c = online_companion();
    let mut host = Host::new();

    host.step(&mut c, Some(Record::new(messages::INFO_TUXCORE, 0, 0, 0)), None);
    host.idle(&mut c, 12);

    let opcodes: Vec<u8> = host.got.iter().map(|r| r.opcode()).collect();
    assert_eq!(
        opcodes,
        vec![messages::VERSION, messages::REVISION, messages::AUTHOR]
    );
    assert_eq!(host.got[0].p1() & 0x07, messages::cpu::CORE);
}

#[test]
fn test_sensor_report_updates_core_conditions() {
    let mut c = online_companion();
    let mut host = Host::new();

    // Head switch pressed (active low), radio up.
    c.sensors_tick(0xF7, true);
    host.idle(&mut c, 2);

    let core = core_of(&mut c);
    assert!(core.router().conditions().head);
    assert!(core.router().conditions().rf_conn);
    assert!(!core.router().conditions().left_wing);
    assert!(core.router().audio_status().switches.rf());
}

#[test]
fn test_speaker_audio_is_queued_and_mic_audio_sent() {
    let mut c = online_companion();
    let mut host = Host::new();

    let speaker: Vec<u8> = (0..SPEAKER_SAMPLES as u8).collect();
    let mic: Vec<u8> = (100..100 + MIC_SAMPLES as u8).collect();
    // The microphone is sampled every other tick.
    for &s in &mic {
        c.on_sample_tick(Some(s));
        c.on_sample_tick(Some(0));
    }

    host.step(&mut c, None, Some(&speaker));
    let sent = host.step(&mut c, None, None);

    assert!(sent.flags().audio());
    assert_eq!(sent.mic_audio(), &mic[..]);
    let queued: Vec<u8> = std::iter::from_fn(|| c.audio().lock(|a| a.speaker.get())).collect();
    assert_eq!(queued, speaker);
}

#[test]
fn test_recording_over_the_radio() {
    let mut c = online_companion();
    let mut host = Host::new();
    let samples: Vec<u8> = (0..SPEAKER_SAMPLES as u8).map(|i| 0x80 + i).collect();

    host.step(&mut c, Some(Record::new(messages::STORE_SOUND, 0, 0, 0)), None);
    host.idle(&mut c, 1);
    assert!(c.store().is_recording());
    for _ in 0..3 {
        host.step(&mut c, None, Some(&samples));
    }
    host.idle(&mut c, 40);

    assert!(!c.store().is_recording());
    assert_eq!(c.store().catalog().clips, 1);
    assert_eq!(
        host.got.first(),
        Some(&flash_status(FlashStatus::InProgress, 0x00, 0x04))
    );
    assert_eq!(
        host.got.last(),
        Some(&Record::new(messages::SOUND_VAR, 1, 0, 0))
    );
}

/// Record three frames of audio with `ticks` sample clock ticks after each frame. Returns the
/// stored clip.
fn record_with_ticks(ticks: usize) -> Vec<u8> {
    let mut c = online_companion();
    let mut host = Host::new();
    let samples: Vec<u8> = (0..SPEAKER_SAMPLES as u8).map(|i| 0x80 + i).collect();

    host.step(&mut c, Some(Record::new(messages::STORE_SOUND, 0, 0, 0)), None);
    host.idle(&mut c, 1);
    for _ in 0..3 {
        host.step_with(&mut c, None, Some(&samples), |c| {
            for _ in 0..ticks {
                assert_eq!(c.on_sample_tick(Some(0x40)), None);
            }
        });
    }
    host.idle(&mut c, 40);
    assert_eq!(c.store().catalog().clips, 1);

    let end = c.flash_mut().entry(1) as usize;
    c.flash_mut().mem[BASE as usize..end].to_vec()
}

#[test]
fn test_sample_clock_leaves_recorded_audio_alone() {
    let quiet = record_with_ticks(0);
    assert!(!quiet.is_empty());
    assert_eq!(record_with_ticks(SPEAKER_SAMPLES), quiet);
}

#[test]
fn test_core_record_is_forwarded_to_the_host_unchanged() {
    let mut c = online_companion();
    let mut host = Host::new();
    let record = Record::new(LED_ON, 1, 2, 3);
    core_of(&mut c).queue_cmd(record).unwrap();
    host.idle(&mut c, 6);

    assert_eq!(host.got, vec![record]);
}

#[test]
fn test_first_frame_after_wake_is_flagged() {
    let mut c = online_companion();
    let mut host = Host::new();
    assert!(!host.step(&mut c, None, None).flags().wakeup());

    c.wake().unwrap();
    assert!(host.step(&mut c, None, None).flags().wakeup());
    assert!(!host.step(&mut c, None, None).flags().wakeup());
}

#[test]
fn test_mute_from_the_host() {
    let mut c = online_companion();
    let mut host = Host::new();
    host.step(&mut c, Some(Record::new(messages::MUTE, 1, 0, 0)), None);
    assert!(c.amp().muted);
    assert!(host.eyes.executed.is_empty());
}

#[test]
fn test_quick_sleep_handshake() {
    let mut c = online_companion();
    let mut host = Host::new();

    host.step(&mut c, Some(Record::new(messages::SLEEP, 1, 0, 0)), None);
    assert!(c.router().sleep_pending());
    host.idle(&mut c, 6);

    assert_eq!(
        host.got,
        vec![
            Record::new(messages::SLEEP, 1, 1, 0),
            Record::new(messages::SLEEP, 1, 0, 0),
        ]
    );
    assert!(c.ready_to_sleep());

    c.prepare_sleep();
    assert!(!c.cmds_sent());
    host.idle(&mut c, 2);
    assert!(c.cmds_sent());
    assert!(core_of(&mut c).sleep_requested());

    c.power_down().unwrap();
    assert!(c.flash_mut().powered_down);
    c.wake().unwrap();
    assert!(!c.flash_mut().powered_down);
    assert!(!c.router().sleep_pending());
}

#[test]
fn test_long_disconnect_forces_sleep() {
    let mut c = online_companion();
    for _ in 0..DISCONNECT_TIMEOUT - 1 {
        c.sensors_tick(0xFF, false);
    }
    assert!(!c.router().sleep_pending());
    c.sensors_tick(0xFF, false);
    assert!(c.router().sleep_pending());
    assert!(c.check().is_ok());
}
