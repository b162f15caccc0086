// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! The 4-byte command record carried by both inter-processor links.
//!
//! Byte 0 is the opcode. Its two most-significant bits give the number of meaningful parameter
//! bytes (0..=3); the remaining parameter bytes are reserved and zero.

use core::fmt;

#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct Record([u8; Record::SIZE]);

impl Record {
    /// Wire size of a record.
    pub const SIZE: usize = 4;

    /// The idle record a slave returns when it has nothing to say.
    pub const NULL: Record = Record([0; Record::SIZE]);

    #[inline]
    pub const fn new(opcode: u8, p1: u8, p2: u8, p3: u8) -> Self {
        Self([opcode, p1, p2, p3])
    }

    #[inline]
    pub const fn from_bytes(bytes: [u8; Record::SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a record from exactly four bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; Record::SIZE] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; Record::SIZE] {
        &self.0
    }

    #[inline]
    pub fn into_bytes(self) -> [u8; Record::SIZE] {
        self.0
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn p1(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn p2(&self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub fn p3(&self) -> u8 {
        self.0[3]
    }

    #[inline]
    pub fn set_p2(&mut self, value: u8) {
        self.0[2] = value;
    }

    /// Number of meaningful parameters, from the opcode's two high bits.
    #[inline]
    pub fn param_count(&self) -> usize {
        (self.0[0] >> 6) as usize
    }

    /// The meaningful parameter bytes.
    pub fn params(&self) -> &[u8] {
        &self.0[1..1 + self.param_count()]
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0[0] == 0
    }
}

impl From<[u8; Record::SIZE]> for Record {
    fn from(bytes: [u8; Record::SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:02X} {:02X} {:02X} {:02X}]",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Destination for status and reply records produced while handling another record.
pub trait RecordSink {
    fn push(&mut self, record: Record);
}
