// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Outbound command queues of the companion processor.

use crate::buffers::{Fifo, FifoError};
use crate::config::queues::{CORE_OUT, RF_OUT};
use crate::protocol::{messages, Record, RecordSink};

/// Records waiting for the core (over the bus) and for the host (over the radio).
#[derive(Debug, Default)]
pub struct CommandQueues {
    core_out: Fifo<CORE_OUT>,
    rf_out: Fifo<RF_OUT>,
    rf_online: bool,
}

impl CommandQueues {
    pub const fn new() -> Self {
        Self {
            core_out: Fifo::new(),
            rf_out: Fifo::new(),
            rf_online: false,
        }
    }

    /// Track the radio online line.
    #[inline]
    pub fn set_rf_online(&mut self, online: bool) {
        self.rf_online = online;
    }

    #[inline]
    pub fn rf_online(&self) -> bool {
        self.rf_online
    }

    /// Queue a record for the core. Returns `false` when there is no room for it.
    pub fn queue_core(&mut self, record: Record) -> bool {
        self.core_out.put_record(record).is_ok()
    }

    /// Queue a record for the host.
    ///
    /// Everything but `SLEEP` is dropped while the radio is offline. Returns `false` when the
    /// record was dropped or did not fit.
    pub fn queue_rf(&mut self, record: Record) -> bool {
        if !self.rf_online && record.opcode() != messages::SLEEP {
            return false;
        }
        self.rf_out.put_record(record).is_ok()
    }

    /// Next record for the core. A partial record is discarded.
    pub fn pop_core(&mut self) -> Result<Record, FifoError> {
        self.core_out.get_record()
    }

    /// Next record for the outgoing frame, only when a whole one is queued.
    pub fn pop_rf(&mut self) -> Option<Record> {
        if self.rf_out.len() < Record::SIZE {
            return None;
        }
        self.rf_out.get_record().ok()
    }

    /// A bus read may be started: its answer is guaranteed a slot toward the host.
    #[inline]
    pub fn rf_has_room(&self) -> bool {
        self.rf_out.has_record_room()
    }

    #[inline]
    pub fn core_pending(&self) -> bool {
        !self.core_out.is_empty()
    }

    #[inline]
    pub fn rf_pending(&self) -> bool {
        !self.rf_out.is_empty()
    }

    pub fn clear(&mut self) {
        self.core_out.clear();
        self.rf_out.clear();
    }

    pub fn core_queue(&self) -> &Fifo<CORE_OUT> {
        &self.core_out
    }

    pub fn rf_queue(&self) -> &Fifo<RF_OUT> {
        &self.rf_out
    }
}

impl RecordSink for CommandQueues {
    fn push(&mut self, record: Record) {
        self.queue_rf(record);
    }
}
