// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Debug USART and the `log` backend on top of it.
//!
//! [`UsartLogger`] owns the port once installed; every `log` macro then ends up as one
//! `[LEVEL] message` line on the debug terminal, CRLF-terminated. The port is locked for one
//! byte at a time and the wait for room happens with interrupts enabled, so lines logged from
//! an interrupt handler may land inside a main-loop line. To watch it from the host:
//!
//! ```text
//! $ screen /dev/tty.usbmodem* 115200
//! ```

use core::cell::RefCell;
use core::fmt::{self, Write as _};

use cortex_m::interrupt::{self, Mutex};
use log::{LevelFilter, Log, Metadata, SetLoggerError};
use nb::block;

use stm32f7xx_hal::{
    prelude::*,
    serial::{Instance, Pins, Serial, Tx},
};

pub struct Usart<U: Instance> {
    tx: Tx<U>,
}

impl<U: Instance> Usart<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, _rx) = serial.split();
        Self { tx }
    }

    /// Queue `b` unless the transmitter is full. A transmit error drops the byte.
    #[inline]
    pub fn try_write_byte(&mut self, b: u8) -> bool {
        !matches!(self.tx.write(b), Err(nb::Error::WouldBlock))
    }

    /// Block until the hardware TX FIFO/drain is flushed.
    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(self.tx.flush());
    }
}

/// Formatter target that takes the port lock once per byte.
struct Locked<'a, U: Instance>(&'a Mutex<RefCell<Option<Usart<U>>>>);

impl<U: Instance> fmt::Write for Locked<'_, U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &b in s.as_bytes() {
            loop {
                let sent = interrupt::free(|cs| match self.0.borrow(cs).borrow_mut().as_mut() {
                    Some(usart) => usart.try_write_byte(b),
                    None => true,
                });
                if sent {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// `log` backend writing one CRLF-terminated line per message.
pub struct UsartLogger<U: Instance> {
    usart: Mutex<RefCell<Option<Usart<U>>>>,
    level: LevelFilter,
}

impl<U: Instance> UsartLogger<U> {
    pub const fn new(level: LevelFilter) -> Self {
        Self {
            usart: Mutex::new(RefCell::new(None)),
            level,
        }
    }

    /// Hand over the port and register as the global logger.
    pub fn install(&'static self, usart: Usart<U>) -> Result<(), SetLoggerError>
    where
        Usart<U>: Send,
    {
        interrupt::free(|cs| {
            self.usart.borrow(cs).replace(Some(usart));
        });
        log::set_logger(self)?;
        log::set_max_level(self.level);
        Ok(())
    }
}

impl<U: Instance> Log for UsartLogger<U>
where
    Usart<U>: Send,
{
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = write!(
            Locked(&self.usart),
            "[{}] {}\r\n",
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {
        interrupt::free(|cs| {
            if let Some(usart) = self.usart.borrow(cs).borrow_mut().as_mut() {
                usart.flush();
            }
        });
    }
}
