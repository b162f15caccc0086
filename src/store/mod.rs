// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Non-volatile sound store: recording, playback and erase of audio clips on the serial flash.
//!
//! All work happens in [`SoundStore::poll`], one bounded step per call, so the main loop keeps
//! servicing the links between steps. Flash accesses run outside the audio lock; only sample
//! transfers and flag updates take it. The speaker output is held from the start of a recording
//! or an erase until it ends.

pub mod index;
pub mod player;
pub mod recorder;

pub use index::Catalog;
pub use player::Player;
pub use recorder::{RecordOutcome, RecordStage, Recorder};

use log::{debug, info};

use crate::buffers::AudioStreams;
use crate::drivers::SerialFlash;
use crate::protocol::{messages, FlashStatus, Record, RecordSink};
use crate::shared::Shared;

/// `STATUS_FLASH_PROG` record.
pub fn flash_status(status: FlashStatus, p2: u8, p3: u8) -> Record {
    Record::new(messages::STATUS_FLASH_PROG, status as u8, p2, p3)
}

/// `SOUND_VAR` record.
pub fn sound_var(catalog: &Catalog) -> Record {
    Record::new(messages::SOUND_VAR, catalog.clips, catalog.last_block, 0)
}

/// Requests the command router can make of the store.
pub trait StoreControl {
    fn is_playing(&self) -> bool;
    fn is_recording(&self) -> bool;
    /// Queue a clip for playback.
    fn play(&mut self, clip: u8, level: u8);
    /// Stop any playback and start a recording session.
    fn record(&mut self);
    /// Erase the whole flash and write an empty index.
    fn erase(&mut self);
    /// Host answer to `WAITING_FOR_CONFIRMATION`.
    fn confirm(&mut self, keep: bool);
    fn catalog(&self) -> Catalog;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Erase {
    Idle,
    Requested,
    Erasing,
}

pub struct SoundStore {
    catalog: Catalog,
    recorder: Recorder,
    recording: bool,
    player: Player,
    erase: Erase,
    last_outcome: Option<RecordOutcome>,
}

impl SoundStore {
    /// Read the index table and build the store.
    pub fn mount<F: SerialFlash>(flash: &mut F) -> Result<Self, F::Error> {
        let catalog = Catalog::load(flash)?;
        info!("sound store: {} clips, last block {}", catalog.clips, catalog.last_block);
        Ok(Self {
            catalog,
            recorder: Recorder::new(),
            recording: false,
            player: Player::new(),
            erase: Erase::Idle,
            last_outcome: None,
        })
    }

    /// Clip being played, 0 when idle.
    #[inline]
    pub fn playing_clip(&self) -> u8 {
        self.player.clip()
    }

    #[inline]
    pub fn is_erasing(&self) -> bool {
        self.erase != Erase::Idle
    }

    /// Nothing in progress.
    pub fn is_idle(&self) -> bool {
        !self.recording && !self.player.is_active() && !self.is_erasing()
    }

    #[inline]
    pub fn recording_stage(&self) -> Option<RecordStage> {
        self.recording.then(|| self.recorder.stage())
    }

    /// Outcome of the last finished recording session.
    #[inline]
    pub fn last_outcome(&self) -> Option<RecordOutcome> {
        self.last_outcome
    }

    /// Run one step of whatever is in progress.
    pub fn poll<F, A, S>(
        &mut self,
        flash: &mut F,
        audio: &A,
        sink: &mut S,
    ) -> Result<(), F::Error>
    where
        F: SerialFlash,
        A: Shared<AudioStreams>,
        S: RecordSink,
    {
        if self.erase == Erase::Erasing {
            return self.erase_step(flash, audio, sink);
        }

        if self.recording {
            if self.player.is_active() {
                return self.player.step(flash, &self.catalog, audio, sink);
            }
            if let Some(outcome) = self.recorder.step(flash, &mut self.catalog, audio, sink)? {
                self.recording = false;
                self.last_outcome = Some(outcome);
            }
            return Ok(());
        }

        if self.player.is_active() {
            return self.player.step(flash, &self.catalog, audio, sink);
        }

        if self.erase == Erase::Requested {
            return self.erase_step(flash, audio, sink);
        }
        Ok(())
    }

    fn erase_step<F, A, S>(
        &mut self,
        flash: &mut F,
        audio: &A,
        sink: &mut S,
    ) -> Result<(), F::Error>
    where
        F: SerialFlash,
        A: Shared<AudioStreams>,
        S: RecordSink,
    {
        match self.erase {
            Erase::Requested => {
                audio.lock(|a| a.hold_output());
                info!("erasing sound flash");
                flash.erase_chip()?;
                self.erase = Erase::Erasing;
            }
            Erase::Erasing => {
                if !flash.is_busy()? {
                    index::format(flash)?;
                    self.catalog = Catalog::default();
                    self.erase = Erase::Idle;
                    audio.lock(|a| a.release_output());
                    info!("sound flash erased");
                    sink.push(flash_status(FlashStatus::Standby, 0, 0));
                    sink.push(sound_var(&self.catalog));
                }
            }
            Erase::Idle => {}
        }
        Ok(())
    }
}

impl StoreControl for SoundStore {
    fn is_playing(&self) -> bool {
        self.player.is_active()
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn play(&mut self, clip: u8, level: u8) {
        self.player.request(clip, level);
    }

    fn record(&mut self) {
        if self.recording {
            return;
        }
        self.player.abort();
        self.recorder = Recorder::new();
        self.recording = true;
    }

    fn erase(&mut self) {
        if self.erase == Erase::Idle {
            self.erase = Erase::Requested;
        }
    }

    fn confirm(&mut self, keep: bool) {
        // Clips are indexed as soon as programming ends; a discard is not acted on.
        debug!("storage confirmation: keep = {}", keep);
    }

    fn catalog(&self) -> Catalog {
        self.catalog
    }
}
