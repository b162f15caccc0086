// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! MCU-level wrappers for the STM32F777.

pub mod audio;
pub mod i2c;
pub mod irq;
pub mod pins;
pub mod rf;
pub mod spi;
pub mod stack;
pub mod usart;

pub use audio::{Microphone, SampleClock, SpeakerPwm};
pub use i2c::I2cSlave;
pub use irq::IrqCell;
pub use pins::{CompanionPins, CorePins};
pub use rf::RfPort;
pub use spi::{ChipSelect, SpiBus, SpiError};
pub use usart::{Usart, UsartLogger};
