// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command router of the companion processor.
//!
//! Every record, whether it came from the host over the radio or from the core over the bus,
//! goes through [`Router::route`]. Records the companion handles itself are consumed; the rest
//! are forwarded to the other side by the caller.

use log::{debug, info};

use super::CommandQueues;
use crate::config::FirmwareInfo;
use crate::drivers::Amplifier;
use crate::protocol::messages::{self, cpu, identity_records};
use crate::protocol::{Command, Record, SleepKind};
use crate::store::{sound_var, StoreControl};

/// What the caller does with a routed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Pass the record on to the other processor (or the host).
    Forward,
    /// The record was consumed here.
    Handled,
    /// A quick sleep was accepted. The outbound queues were reset and the sleep records queued;
    /// the caller must also clear the command slot of the outgoing frame.
    Sleep,
}

/// Counts pongs lost on the bus between the core and the companion.
#[derive(Debug, Clone, Copy, Default)]
struct PongTracker {
    expected: u8,
    missed: u8,
}

impl PongTracker {
    /// Returns the number of pongs missed so far in this ping sequence.
    fn observe(&mut self, remaining: u8) -> u8 {
        let previous = self.expected;
        self.expected = previous.wrapping_sub(1);
        if previous < remaining {
            // A new ping sequence.
            self.expected = remaining;
            self.missed = 0;
        } else {
            self.missed = self.missed.wrapping_add(self.expected.wrapping_sub(remaining));
            self.expected = remaining;
        }
        self.missed
    }
}

pub struct Router {
    info: FirmwareInfo,
    sleep_pending: bool,
    pongs: PongTracker,
}

impl Router {
    pub fn new(info: FirmwareInfo) -> Self {
        Self {
            info,
            sleep_pending: false,
            pongs: PongTracker::default(),
        }
    }

    /// A quick sleep was accepted and not yet carried out.
    #[inline]
    pub fn sleep_pending(&self) -> bool {
        self.sleep_pending
    }

    /// Back from sleep: traffic flows again.
    pub fn wake(&mut self) {
        self.sleep_pending = false;
    }

    /// Act on `record`. Forwarded records may have been rewritten in place.
    pub fn route<S, A>(
        &mut self,
        record: &mut Record,
        queues: &mut CommandQueues,
        store: &mut S,
        amp: &mut A,
    ) -> Route
    where
        S: StoreControl,
        A: Amplifier,
    {
        // Nothing gets through once sleep is decided.
        if self.sleep_pending {
            return Route::Handled;
        }

        match Command::decode(record) {
            Command::Null => {}

            Command::InfoAudio => {
                for r in identity_records(&self.info, cpu::AUDIO) {
                    queues.queue_rf(r);
                }
                queues.queue_rf(sound_var(&store.catalog()));
            }

            Command::PlaySound { clip, level } => {
                if store.is_playing() || store.is_recording() {
                    debug!("play {} dropped, store busy", clip);
                } else {
                    store.play(clip, level);
                }
            }

            Command::Mute(true) => amp.mute(),
            Command::Mute(false) => amp.unmute(),

            Command::StoreSound => store.record(),
            Command::EraseFlash => store.erase(),
            Command::ConfirmStorage(keep) => store.confirm(keep),

            Command::ConnectId => {
                // The echo replaces one pending status.
                let _ = queues.pop_rf();
                queues.queue_rf(*record);
            }

            Command::Sleep {
                kind: SleepKind::Quick,
                ..
            } => {
                info!("quick sleep requested");
                self.sleep_pending = true;
                queues.clear();
                queues.queue_rf(Record::new(messages::SLEEP, SleepKind::Quick.as_u8(), 1, 0));
                queues.queue_rf(Record::new(messages::SLEEP, SleepKind::Quick.as_u8(), 0, 0));
                return Route::Sleep;
            }
            Command::Sleep { .. } => {}

            Command::Identity => {
                queues.queue_rf(*record);
            }

            Command::Pong { remaining } => {
                let missed = self.pongs.observe(remaining);
                record.set_p2(missed);
                return Route::Forward;
            }

            _ => return Route::Forward,
        }
        Route::Handled
    }
}
