// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-capacity byte FIFO shared between an interrupt handler and the main loop.
//!
//! The two indices run freely over the whole `u8` range and are masked on access, so the
//! occupancy is always `in - out` (mod 256). Keeping the capacity a power of two no larger than
//! 128 keeps "full" and "empty" distinguishable after wrap-around.
//!
//! Single-byte `put`/`get` from one side need no locking. Whole command records go through
//! [`Fifo::put_record`] / [`Fifo::get_record`], which are all-or-nothing; when the other side of
//! the queue lives in an ISR, call them inside a critical section.

use crate::protocol::Record;

use core::fmt;

/// Queue operation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoError {
    /// Not enough room for the write; nothing was stored.
    Full,
    /// Nothing to read.
    Empty,
    /// Fewer bytes than a whole record were queued. The partial record is discarded.
    Truncated,
}

impl fmt::Display for FifoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FifoError::Full => f.write_str("fifo full"),
            FifoError::Empty => f.write_str("fifo empty"),
            FifoError::Truncated => f.write_str("truncated record in fifo"),
        }
    }
}

/// Ring buffer of `N` bytes. `N` must be a power of two and at most 128.
pub struct Fifo<const N: usize> {
    buf: [u8; N],
    inp: u8,
    out: u8,
}

impl<const N: usize> Fifo<N> {
    const MASK: u8 = {
        assert!(N.is_power_of_two(), "FIFO capacity must be a power of two");
        assert!(N <= 128, "FIFO capacity must fit free-running u8 indices");
        (N - 1) as u8
    };

    /// Create an empty FIFO.
    pub const fn new() -> Self {
        let _ = Self::MASK;
        Self {
            buf: [0; N],
            inp: 0,
            out: 0,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes waiting.
    #[inline]
    pub fn len(&self) -> usize {
        self.inp.wrapping_sub(self.out) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inp == self.out
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Free space in bytes.
    #[inline]
    pub fn room(&self) -> usize {
        N.saturating_sub(self.len())
    }

    /// Store one byte. A full queue rejects the write and keeps its contents.
    pub fn put(&mut self, byte: u8) -> Result<(), FifoError> {
        if self.is_full() {
            return Err(FifoError::Full);
        }
        self.buf[(self.inp & Self::MASK) as usize] = byte;
        self.inp = self.inp.wrapping_add(1);
        Ok(())
    }

    /// Take the oldest byte.
    pub fn get(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buf[(self.out & Self::MASK) as usize];
        self.out = self.out.wrapping_add(1);
        Some(byte)
    }

    /// Look at the oldest byte without removing it.
    pub fn peek(&self) -> Option<u8> {
        (!self.is_empty()).then(|| self.buf[(self.out & Self::MASK) as usize])
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.inp = 0;
        self.out = 0;
    }

    /// Store all of `bytes` or none of them.
    pub fn put_slice(&mut self, bytes: &[u8]) -> Result<(), FifoError> {
        if bytes.len() > self.room() {
            return Err(FifoError::Full);
        }
        for &b in bytes {
            self.buf[(self.inp & Self::MASK) as usize] = b;
            self.inp = self.inp.wrapping_add(1);
        }
        Ok(())
    }

    /// Fill `dst` completely from the queue, or leave the queue untouched.
    pub fn get_slice(&mut self, dst: &mut [u8]) -> Result<(), FifoError> {
        if self.len() < dst.len() {
            return Err(FifoError::Empty);
        }
        for b in dst.iter_mut() {
            *b = self.buf[(self.out & Self::MASK) as usize];
            self.out = self.out.wrapping_add(1);
        }
        Ok(())
    }

    /// Queue a whole 4-byte command record.
    #[inline]
    pub fn put_record(&mut self, record: Record) -> Result<(), FifoError> {
        self.put_slice(record.as_bytes())
    }

    /// Dequeue a whole 4-byte command record.
    pub fn get_record(&mut self) -> Result<Record, FifoError> {
        let mut bytes = [0u8; Record::SIZE];
        match self.len() {
            0 => Err(FifoError::Empty),
            n if n < Record::SIZE => {
                self.clear();
                Err(FifoError::Truncated)
            }
            _ => {
                self.get_slice(&mut bytes)?;
                Ok(Record::from_bytes(bytes))
            }
        }
    }

    /// Room for at least one more whole record.
    #[inline]
    pub fn has_record_room(&self) -> bool {
        self.room() >= Record::SIZE
    }

    /// Index sanity check: occupancy can never exceed the capacity.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.len() <= N
    }
}

impl<const N: usize> Default for Fifo<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for Fifo<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fifo")
            .field("capacity", &N)
            .field("len", &self.len())
            .finish()
    }
}
