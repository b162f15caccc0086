// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Sound store tests against an in-memory flash

mod common;

use std::cell::RefCell;

use common::{MemFlash, Sink};
use robolink::buffers::AudioStreams;
use robolink::config::audio::{RATE_INITIAL, RECORD_START_TIMEOUT, RECORD_STOP_TIMEOUT};
use robolink::config::store::{BASE, BLOCK_SIZE};
use robolink::protocol::{messages, FlashStatus, Record};
use robolink::store::{flash_status, Catalog, RecordOutcome, SoundStore, StoreControl};

struct Bench {
    flash: MemFlash,
    store: SoundStore,
    audio: RefCell<AudioStreams>,
    sink: Sink,
}

impl Bench {
    fn new(mut flash: MemFlash) -> Self {
        common::init_logging();
        let store = SoundStore::mount(&mut flash).unwrap();
        Self {
            flash,
            store,
            audio: RefCell::new(AudioStreams::new()),
            sink: Sink::default(),
        }
    }

    fn poll(&mut self) {
        self.store
            .poll(&mut self.flash, &self.audio, &mut self.sink)
            .unwrap();
    }

    fn poll_until_idle(&mut self) {
        for _ in 0..1000 {
            if self.store.is_idle() {
                return;
            }
            self.poll();
        }
        panic!("store never went idle");
    }

    /// Record `samples` as one clip and return the outcome.
    fn record_clip(&mut self, samples: &[u8]) -> Option<RecordOutcome> {
        self.store.record();
        self.poll();
        self.audio.get_mut().push_speaker(samples);
        self.poll();
        self.poll();
        for _ in 0..RECORD_STOP_TIMEOUT {
            self.audio.get_mut().silent_frame();
        }
        self.poll_until_idle();
        self.store.last_outcome()
    }

    fn take_records(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.sink.0)
    }
}

fn ramp(start: u8, n: u8) -> Vec<u8> {
    (0..n).map(|i| start + i).collect()
}

#[test]
fn test_first_clip_starts_at_base_and_keeps_every_other_sample() {
    let mut bench = Bench::new(MemFlash::formatted());
    let outcome = bench.record_clip(&ramp(100, 20));
    assert_eq!(outcome, Some(RecordOutcome::Stored { clip: 1 }));

    let base = BASE as usize;
    assert_eq!(bench.flash.mem[base], 100);
    let stored: Vec<u8> = bench.flash.mem[base + 1..base + 11].to_vec();
    assert_eq!(stored, vec![101, 103, 105, 107, 109, 111, 113, 115, 117, 119]);
    assert_eq!(bench.flash.entry(0), BASE);
    assert_eq!(bench.flash.entry(1), BASE + 10);

    assert_eq!(
        bench.take_records(),
        vec![
            flash_status(FlashStatus::InProgress, 0x00, 0x04),
            flash_status(FlashStatus::WaitingForConfirmation, 0, 0),
            flash_status(FlashStatus::WriteToc, 0, 0),
            flash_status(FlashStatus::Standby, 0, 0),
            Record::new(messages::SOUND_VAR, 1, 0, 0),
        ]
    );
    assert_eq!(bench.store.catalog(), Catalog { clips: 1, last_block: 0 });
}

#[test]
fn test_sample_clock_does_not_eat_samples_being_recorded() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.store.record();
    bench.poll();
    assert!(bench.audio.get_mut().output_held());
    bench.audio.get_mut().push_speaker(&ramp(100, 20));
    for _ in 0..8 {
        assert_eq!(bench.audio.get_mut().sample_tick(Some(0x80)), None);
    }
    bench.poll();
    bench.poll();
    for _ in 0..RECORD_STOP_TIMEOUT {
        bench.audio.get_mut().silent_frame();
        bench.audio.get_mut().sample_tick(None);
    }
    bench.poll_until_idle();

    assert_eq!(bench.store.last_outcome(), Some(RecordOutcome::Stored { clip: 1 }));
    let base = BASE as usize;
    assert_eq!(bench.flash.mem[base], 100);
    let stored: Vec<u8> = bench.flash.mem[base + 1..base + 11].to_vec();
    assert_eq!(stored, vec![101, 103, 105, 107, 109, 111, 113, 115, 117, 119]);
    assert!(!bench.audio.get_mut().output_held());
}

#[test]
fn test_second_clip_starts_on_the_next_block() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.record_clip(&ramp(10, 8));
    bench.take_records();

    let outcome = bench.record_clip(&ramp(50, 8));
    assert_eq!(outcome, Some(RecordOutcome::Stored { clip: 2 }));

    let records = bench.take_records();
    assert_eq!(records[0], flash_status(FlashStatus::InProgress, 0x00, 0x10));
    assert_eq!(bench.flash.mem[BLOCK_SIZE as usize], 50);
    assert_eq!(bench.flash.entry(2), BLOCK_SIZE + 4);
    assert_eq!(bench.store.catalog(), Catalog { clips: 2, last_block: 1 });
}

#[test]
fn test_playback_streams_each_sample_twice() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.record_clip(&ramp(100, 20));
    bench.take_records();
    bench.audio.get_mut().rate.reset(245);

    bench.store.play(1, 0);
    bench.poll();
    assert!(bench.store.is_playing());
    assert_eq!(bench.store.playing_clip(), 1);
    assert_eq!(bench.audio.get_mut().rate.rate(), RATE_INITIAL);

    bench.poll_until_idle();
    assert_eq!(
        bench.take_records(),
        vec![
            Record::new(messages::STATUS_AUDIO, 1, 0, 0),
            Record::new(messages::STATUS_AUDIO, 0, 0, 0),
        ]
    );

    let mut played = Vec::new();
    while let Some(s) = bench.audio.get_mut().speaker.get() {
        played.push(s);
    }
    let expected: Vec<u8> = [100, 101, 103, 105, 107, 109, 111, 113, 115, 117]
        .iter()
        .flat_map(|&s| [s, s])
        .collect();
    assert_eq!(played, expected);
}

#[test]
fn test_playback_level_attenuates() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.record_clip(&[0x80, 0x40, 0x40, 0x40]);

    // Levels above seven behave like seven.
    bench.store.play(1, 9);
    bench.poll_until_idle();
    let played: Vec<u8> = std::iter::from_fn(|| bench.audio.get_mut().speaker.get()).collect();
    assert_eq!(played, vec![1, 1, 0, 0]);
}

#[test]
fn test_second_clip_plays_from_its_block() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.record_clip(&ramp(10, 8));
    bench.record_clip(&ramp(50, 8));
    bench.take_records();

    bench.store.play(2, 0);
    bench.poll_until_idle();
    let played: Vec<u8> = std::iter::from_fn(|| bench.audio.get_mut().speaker.get()).collect();
    assert_eq!(played, vec![50, 50, 51, 51, 53, 53, 55, 55]);
}

#[test]
fn test_missing_clip_is_ignored() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.record_clip(&ramp(10, 8));
    bench.take_records();

    for clip in [0, 2, 200] {
        bench.store.play(clip, 0);
        bench.poll();
        assert!(bench.store.is_idle());
    }
    assert!(bench.take_records().is_empty());
    assert!(bench.audio.get_mut().speaker.is_empty());
}

#[test]
fn test_full_flash_refuses_to_record() {
    let mut flash = MemFlash::formatted();
    flash.set_entry(1, 0x07_F800);
    let mut bench = Bench::new(flash);
    assert_eq!(bench.store.catalog(), Catalog { clips: 1, last_block: 0x7F });

    bench.store.record();
    bench.poll_until_idle();
    assert_eq!(bench.store.last_outcome(), Some(RecordOutcome::FlashFull));
    assert_eq!(
        bench.take_records(),
        vec![
            flash_status(FlashStatus::FlashFull, 0, 0),
            flash_status(FlashStatus::Standby, 0, 0),
            Record::new(messages::SOUND_VAR, 1, 0x7F, 0),
        ]
    );
}

#[test]
fn test_recording_without_sound_times_out() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.store.record();
    for _ in 0..3 {
        bench.poll();
    }
    assert!(bench.store.is_recording());

    for _ in 0..RECORD_START_TIMEOUT {
        bench.audio.get_mut().silent_frame();
    }
    bench.poll_until_idle();

    assert_eq!(bench.store.last_outcome(), Some(RecordOutcome::NoSound));
    let records = bench.take_records();
    assert!(records.contains(&flash_status(FlashStatus::NoSound, 0, 0)));
    assert_eq!(records.last(), Some(&Record::new(messages::SOUND_VAR, 0, 0, 0)));
    assert_eq!(bench.flash.entry(1), 0xFF_FFFF);
}

#[test]
fn test_recording_takes_over_from_playback() {
    // One clip longer than the speaker queue.
    let mut flash = MemFlash::formatted();
    flash.set_entry(1, BASE + 0x1000);
    let mut bench = Bench::new(flash);

    bench.store.play(1, 0);
    bench.poll();
    bench.poll();
    assert!(bench.store.is_playing());

    bench.store.record();
    bench.poll();
    assert!(!bench.store.is_playing());
    assert!(bench.store.is_recording());
    // Aborted playback ends without a STATUS_AUDIO report.
    assert_eq!(
        bench.take_records(),
        vec![Record::new(messages::STATUS_AUDIO, 1, 0, 0)]
    );
}

#[test]
fn test_erase_reformats_the_index() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.record_clip(&ramp(10, 8));
    bench.take_records();

    bench.store.erase();
    assert!(bench.store.is_erasing());
    bench.poll_until_idle();

    assert_eq!(bench.flash.erases, 1);
    assert_eq!(bench.flash.mem[0], 0xFE);
    assert_eq!(bench.flash.entry(0), BASE);
    assert_eq!(bench.flash.entry(1), 0xFF_FFFF);
    assert_eq!(bench.store.catalog(), Catalog::default());
    assert_eq!(
        bench.take_records(),
        vec![
            flash_status(FlashStatus::Standby, 0, 0),
            Record::new(messages::SOUND_VAR, 0, 0, 0),
        ]
    );
}

#[test]
fn test_erase_waits_for_playback_to_finish() {
    let mut bench = Bench::new(MemFlash::formatted());
    bench.record_clip(&ramp(10, 8));
    bench.take_records();

    bench.store.play(1, 0);
    bench.store.erase();
    bench.poll();
    assert_eq!(bench.flash.erases, 0);
    bench.poll_until_idle();
    assert_eq!(bench.flash.erases, 1);
}

#[test]
fn test_catalog_of_unformatted_and_stored_flash() {
    let mut blank = MemFlash::blank();
    assert_eq!(Catalog::load(&mut blank).unwrap(), Catalog::default());

    let mut flash = MemFlash::formatted();
    flash.set_entry(1, BASE + 0x100);
    flash.set_entry(2, 0x00_2345);
    flash.set_entry(3, 0x01_0010);
    assert_eq!(
        Catalog::load(&mut flash).unwrap(),
        Catalog {
            clips: 3,
            last_block: 0x10
        }
    );
}
