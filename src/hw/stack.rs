// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Painted guard band between the statics and the stack.
//!
//! The stack grows down from the top of RAM towards `cortex_m_rt::heap_start()`. The first
//! [`GUARD_LEN`] bytes above that address are painted at boot; a stack deep enough to reach
//! them overwrites the paint.

use core::ptr;

use crate::fault::STACK_PAINT;

pub const GUARD_LEN: usize = 32;

/// Paint the guard band. Call once, early in `main`.
pub fn paint() {
    let base = cortex_m_rt::heap_start() as *mut u8;
    for i in 0..GUARD_LEN {
        // SAFETY: no heap is in use; the bytes above `heap_start` are free RAM until the
        // stack reaches them.
        unsafe { ptr::write_volatile(base.add(i), STACK_PAINT) };
    }
}

/// Current content of the guard band.
pub fn guard() -> [u8; GUARD_LEN] {
    let base = cortex_m_rt::heap_start() as *const u8;
    let mut band = [0u8; GUARD_LEN];
    for (i, b) in band.iter_mut().enumerate() {
        // SAFETY: see `paint`.
        *b = unsafe { ptr::read_volatile(base.add(i)) };
    }
    band
}
