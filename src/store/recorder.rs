// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Recording session: streams speaker samples from the radio into a new clip.
//!
//! One stage runs per call to [`Recorder::step`]:
//!
//! | Stage | Action |
//! | ----- | ------ |
//! | `DetectIndices` | find the start of the new clip, refuse if the flash is full |
//! | `Init` | open sequential programming with the first sample |
//! | `Programming` | store every other queued sample until silence or the top of flash |
//! | `AwaitConfirmation` | passes straight through |
//! | `WriteIndex` | append the end address to the index table |
//! | `End` | recount the clips and report standby |

use log::{debug, info, warn};

use super::index::{self, Catalog};
use super::{flash_status, sound_var};
use crate::buffers::AudioStreams;
use crate::config::audio::{RECORD_START_TIMEOUT, RECORD_STOP_TIMEOUT};
use crate::config::store::{BASE, TOP};
use crate::drivers::{Address, SerialFlash};
use crate::protocol::{FlashStatus, RecordSink};
use crate::shared::Shared;

/// Sample written when recording starts before any audio arrived.
const SILENCE: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    DetectIndices,
    Init,
    Programming,
    AwaitConfirmation,
    WriteIndex,
    End,
}

/// How a recording session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Clip stored; `clip` is the clip count after the session.
    Stored { clip: u8 },
    FlashFull,
    /// No sample arrived before the start timeout.
    NoSound,
}

pub struct Recorder {
    stage: RecordStage,
    addr: Address,
    first_block: u8,
    stored: bool,
    streaming: bool,
    outcome: Option<RecordOutcome>,
}

impl Recorder {
    pub const fn new() -> Self {
        Self {
            stage: RecordStage::DetectIndices,
            addr: Address::new(BASE),
            first_block: 0,
            stored: false,
            streaming: false,
            outcome: None,
        }
    }

    #[inline]
    pub fn stage(&self) -> RecordStage {
        self.stage
    }

    /// Working address: the next byte to program.
    #[inline]
    pub fn address(&self) -> Address {
        self.addr
    }

    /// Run the current stage. Returns the outcome once the session is over; the recorder is then
    /// ready for a new session.
    pub fn step<F, A, S>(
        &mut self,
        flash: &mut F,
        catalog: &mut Catalog,
        audio: &A,
        sink: &mut S,
    ) -> Result<Option<RecordOutcome>, F::Error>
    where
        F: SerialFlash,
        A: Shared<AudioStreams>,
        S: RecordSink,
    {
        match self.stage {
            RecordStage::DetectIndices => {
                if catalog.clips == 0 {
                    self.addr = Address::new(BASE);
                    self.first_block = 0;
                } else {
                    self.addr = index::read_entry(flash, catalog.clips)?.next_block();
                    self.first_block = self.addr.block();
                }
                audio.lock(|a| {
                    a.hold_output();
                    a.speaker.clear();
                    a.arm_silence(RECORD_START_TIMEOUT);
                });

                if self.addr.value() > TOP {
                    warn!("sound flash full");
                    self.outcome = Some(RecordOutcome::FlashFull);
                    sink.push(flash_status(FlashStatus::FlashFull, 0, 0));
                    self.stage = RecordStage::End;
                } else {
                    let [hi, mid, _] = self.addr.to_bytes();
                    info!("recording clip {} at {:#08x}", catalog.clips.wrapping_add(1), self.addr.value());
                    sink.push(flash_status(FlashStatus::InProgress, hi, mid));
                    self.stage = RecordStage::Init;
                }
            }

            RecordStage::Init => {
                let first = audio.lock(|a| a.speaker.get()).unwrap_or(SILENCE);
                flash.begin_sequential(self.addr, first)?;
                self.stored = false;
                self.streaming = true;
                self.stage = RecordStage::Programming;
            }

            RecordStage::Programming => {
                if self.streaming {
                    self.program_samples(flash, audio)?;
                } else {
                    flash.write_disable()?;
                    if self.stored {
                        catalog.last_block = self.addr.block();
                        let blocks = catalog.last_block.wrapping_sub(self.first_block);
                        sink.push(flash_status(FlashStatus::WaitingForConfirmation, blocks, 0));
                        self.stage = RecordStage::AwaitConfirmation;
                    } else {
                        debug!("recording timed out without sound");
                        self.outcome = Some(RecordOutcome::NoSound);
                        sink.push(flash_status(FlashStatus::NoSound, 0, 0));
                        self.stage = RecordStage::End;
                    }
                }
            }

            // The host's answer is not waited for; a discard leaves the clip indexed.
            RecordStage::AwaitConfirmation => self.stage = RecordStage::WriteIndex,

            RecordStage::WriteIndex => {
                sink.push(flash_status(FlashStatus::WriteToc, 0, 0));
                catalog.clips = catalog.clips.saturating_add(1);
                index::write_entry(flash, catalog.clips, self.addr)?;
                catalog.last_block = self.addr.block();
                self.stage = RecordStage::End;
            }

            RecordStage::End => {
                catalog.clips = index::count_clips(flash)?;
                audio.lock(|a| a.release_output());
                sink.push(flash_status(FlashStatus::Standby, 0, 0));
                sink.push(sound_var(catalog));
                self.stage = RecordStage::DetectIndices;
                let outcome = self
                    .outcome
                    .take()
                    .unwrap_or(RecordOutcome::Stored { clip: catalog.clips });
                info!("recording finished: {:?}", outcome);
                return Ok(Some(outcome));
            }
        }
        Ok(None)
    }

    /// Drain queued samples into the flash, keeping one out of two.
    fn program_samples<F, A>(&mut self, flash: &mut F, audio: &A) -> Result<(), F::Error>
    where
        F: SerialFlash,
        A: Shared<AudioStreams>,
    {
        loop {
            let next = audio.lock(|a| {
                let sample = a.speaker.get()?;
                let _ = a.speaker.get();
                a.arm_silence(RECORD_STOP_TIMEOUT);
                Some(sample)
            });
            let Some(sample) = next else {
                break;
            };

            self.stored = true;
            flash.program_next(sample)?;
            self.addr = self.addr.offset(1);
            if self.addr.value() == TOP {
                self.streaming = false;
                return Ok(());
            }
            flash.wait_ready()?;
        }
        if audio.lock(|a| a.silence_expired()) {
            self.streaming = false;
        }
        Ok(())
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
