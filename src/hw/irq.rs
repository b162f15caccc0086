// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Critical-section cells for state owned by interrupt handlers.

use core::cell::RefCell;

use cortex_m::interrupt::{self, Mutex};

use crate::shared::Shared;

/// Handle to a `'static` cell. Copies of it go to the main loop and the interrupt handlers.
pub struct IrqCell<T: 'static> {
    cell: &'static Mutex<RefCell<T>>,
}

impl<T> IrqCell<T> {
    pub const fn new(cell: &'static Mutex<RefCell<T>>) -> Self {
        Self { cell }
    }
}

impl<T> Clone for IrqCell<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IrqCell<T> {}

impl<T> Shared<T> for IrqCell<T> {
    #[inline]
    fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        interrupt::free(|cs| f(&mut self.cell.borrow(cs).borrow_mut()))
    }
}
