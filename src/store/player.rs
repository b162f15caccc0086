// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Clip playback from flash into the speaker queue.

use log::{debug, warn};

use super::index::{self, Catalog};
use crate::buffers::AudioStreams;
use crate::config::audio::{RATE_INITIAL, SPEAKER_FIFO};
use crate::config::store::TOP;
use crate::drivers::{Address, SerialFlash};
use crate::protocol::{messages, Record, RecordSink};
use crate::shared::Shared;

/// Largest useful attenuation shift.
const MAX_LEVEL: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Pending { clip: u8, level: u8 },
    Streaming { clip: u8, addr: Address, end: Address, level: u8 },
    Stopping,
}

pub struct Player {
    state: State,
}

impl Player {
    pub const fn new() -> Self {
        Self { state: State::Idle }
    }

    /// A clip is queued or playing.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    /// Clip number being played, 0 when idle.
    pub fn clip(&self) -> u8 {
        match self.state {
            State::Pending { clip, .. } | State::Streaming { clip, .. } => clip,
            _ => 0,
        }
    }

    /// Queue clip `clip` at attenuation `level` (right shift of each sample).
    pub fn request(&mut self, clip: u8, level: u8) {
        self.state = State::Pending {
            clip,
            level: level.min(MAX_LEVEL),
        };
    }

    /// Stop without reporting, e.g. when a recording takes over.
    pub fn abort(&mut self) {
        self.state = match self.state {
            State::Streaming { .. } => State::Stopping,
            _ => State::Idle,
        };
    }

    pub fn step<F, A, S>(
        &mut self,
        flash: &mut F,
        catalog: &Catalog,
        audio: &A,
        sink: &mut S,
    ) -> Result<(), F::Error>
    where
        F: SerialFlash,
        A: Shared<AudioStreams>,
        S: RecordSink,
    {
        match self.state {
            State::Idle => {}

            State::Pending { clip, level } => {
                match index::clip_range(flash, catalog.clips, clip)? {
                    Some((start, end)) => {
                        debug!("playing clip {} [{:#08x}, {:#08x})", clip, start.value(), end.value());
                        flash.begin_read(start)?;
                        audio.lock(|a| {
                            a.speaker.clear();
                            a.rate.reset(RATE_INITIAL);
                        });
                        sink.push(Record::new(messages::STATUS_AUDIO, clip, 0, 0));
                        self.state = State::Streaming {
                            clip,
                            addr: start,
                            end,
                            level,
                        };
                    }
                    None => {
                        debug!("clip {} rejected, {} stored", clip, catalog.clips);
                        self.state = State::Idle;
                    }
                }
            }

            State::Streaming {
                clip,
                mut addr,
                end,
                level,
            } => {
                // The sample clock only frees room, so what fits now still fits below.
                let room = audio.lock(|a| a.speaker.room());
                let mut buf = [0u8; SPEAKER_FIFO];
                let mut filled = 0;
                let mut done = false;
                while room - filled >= 2 {
                    let sample = flash.read_next()? >> level;
                    // Each stored sample plays twice.
                    buf[filled] = sample;
                    buf[filled + 1] = sample;
                    filled += 2;

                    addr = addr.offset(1);
                    if addr.value() > TOP || addr == end {
                        done = true;
                        break;
                    }
                }
                if filled > 0 && audio.lock(|a| a.speaker.put_slice(&buf[..filled])).is_err() {
                    warn!("speaker queue overrun, {} samples dropped", filled);
                }
                if done {
                    flash.end_read()?;
                    sink.push(Record::new(messages::STATUS_AUDIO, 0, 0, 0));
                    self.state = State::Idle;
                } else {
                    self.state = State::Streaming {
                        clip,
                        addr,
                        end,
                        level,
                    };
                }
            }

            State::Stopping => {
                flash.end_read()?;
                self.state = State::Idle;
            }
        }
        Ok(())
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}
