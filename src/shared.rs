// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! State shared between the main loop and interrupt handlers.
//!
//! Main-loop code reaches interrupt-owned state only through [`Shared::lock`]. Each closure
//! moves a record or a slice of samples, or flips a flag; flash, bus and logging work stay
//! outside it. On the MCU the lock is a critical section (`hw::IrqCell`); on the host a plain
//! [`RefCell`] stands in.

use core::cell::RefCell;

/// Exclusive access to a `T` that interrupt handlers also touch.
pub trait Shared<T> {
    fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

/// Single execution context: nothing can preempt the borrow.
impl<T> Shared<T> for RefCell<T> {
    #[inline]
    fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.borrow_mut())
    }
}
