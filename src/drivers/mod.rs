// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Device and link drivers. Each one reaches the MCU through a small trait so the same state
//! machines run on the target and in host tests.

pub mod amplifier;
pub mod at26f004;
pub mod rf_link;
pub mod serial_flash;
pub mod twi;
pub mod twi_i2c;

pub use amplifier::{AmpSwitch, Amplifier};
pub use at26f004::At26f004;
pub use rf_link::{FramePort, RfLink};
pub use serial_flash::{Address, SerialFlash};
pub use twi::{
    BusError, BusMaster, BusMessage, BusSlave, BusState, SlaveHandler, TwiPort, TwiStatus,
};
pub use twi_i2c::BlockingTwi;
