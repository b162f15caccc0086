// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Link error codes and the last-error register.
//!
//! Protocol errors never stop the firmware: the offending record is dropped, the code is latched
//! here and the core reports it to the host in a `GERROR` record.

use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::protocol::{messages, Record};

/// Error codes carried in the third byte of a `GERROR` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkError {
    None = 0,
    /// Inbound command queue had no room for a received record.
    CmdInOverflow = 1,
    /// A partial record was found in the inbound command queue.
    CmdInEmpty = 2,
    /// Outbound queue underflow while the master was reading.
    CmdOutEmpty = 3,
    /// Outbound command queue refused a record.
    CmdOutFull = 4,
    /// A bus write did not carry exactly one record.
    InvalidReceiveLength = 5,
    /// Outgoing buffer overflow.
    OutBufOverflow = 6,
}

impl LinkError {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => LinkError::CmdInOverflow,
            2 => LinkError::CmdInEmpty,
            3 => LinkError::CmdOutEmpty,
            4 => LinkError::CmdOutFull,
            5 => LinkError::InvalidReceiveLength,
            6 => LinkError::OutBufOverflow,
            _ => LinkError::None,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LinkError::None => "no error",
            LinkError::CmdInOverflow => "command input buffer overflow",
            LinkError::CmdInEmpty => "command input buffer empty",
            LinkError::CmdOutEmpty => "command output buffer empty",
            LinkError::CmdOutFull => "command output buffer full",
            LinkError::InvalidReceiveLength => "invalid receive length",
            LinkError::OutBufOverflow => "output buffer overflow",
        };
        f.write_str(text)
    }
}

/// Last-error register, writable from interrupt context.
pub struct ErrorLog {
    last: AtomicU8,
    count: AtomicU32,
}

impl ErrorLog {
    pub const fn new() -> Self {
        Self {
            last: AtomicU8::new(0),
            count: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn record(&self, error: LinkError) {
        self.last.store(error as u8, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn last(&self) -> LinkError {
        LinkError::from_u8(self.last.load(Ordering::Acquire))
    }

    /// Number of errors since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Take the latched error, leaving `None` behind.
    pub fn take(&self) -> Option<LinkError> {
        match LinkError::from_u8(self.last.swap(0, Ordering::AcqRel)) {
            LinkError::None => None,
            e => Some(e),
        }
    }

    /// `GERROR` status record for `cpu`, or `None` when nothing is latched.
    pub fn take_status_record(&self, cpu: u8) -> Option<Record> {
        self.take()
            .map(|e| Record::new(messages::GERROR, cpu, e as u8, 0))
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new()
    }
}
