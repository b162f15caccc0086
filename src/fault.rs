// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Consistency guard.
//!
//! Unlike link errors, a failed consistency check means shared state can no longer be trusted.
//! The fault is latched and the firmware parks in a visible failure loop.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::buffers::Fifo;

/// Fill byte of the stack guard band.
pub const STACK_PAINT: u8 = 0x5F;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    None = 0,
    /// Stack canary overwritten.
    StackCorruption = 1,
    /// Queue indices describe more bytes than the queue holds.
    QueueCorruption = 2,
}

impl FaultCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::StackCorruption,
            2 => FaultCode::QueueCorruption,
            _ => FaultCode::None,
        }
    }
}

/// Latched fault flag shared between interrupt handlers and the main loop.
pub struct FaultState {
    active: AtomicBool,
    code: AtomicU8,
}

impl FaultState {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
        }
    }

    /// Latch `code`. The first fault wins.
    pub fn raise(&self, code: FaultCode) {
        if !self.active.swap(true, Ordering::AcqRel) {
            self.code.store(code as u8, Ordering::Release);
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Check a queue and latch `QueueCorruption` if its indices are out of range.
    pub fn check_queue<const N: usize>(&self, queue: &Fifo<N>) -> Result<(), FaultCode> {
        if queue.is_consistent() {
            Ok(())
        } else {
            self.raise(FaultCode::QueueCorruption);
            Err(FaultCode::QueueCorruption)
        }
    }

    /// Check that the stack guard band still holds its paint.
    pub fn check_stack(&self, guard: &[u8]) -> Result<(), FaultCode> {
        if guard.iter().all(|&b| b == STACK_PAINT) {
            Ok(())
        } else {
            self.raise(FaultCode::StackCorruption);
            Err(FaultCode::StackCorruption)
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}
