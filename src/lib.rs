// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Robolink Firmware
//!
//! Firmware components for a two-processor robot toy: a *core* processor that drives the
//! actuators and a *companion* processor that bridges the core, the radio front-end and the
//! audio path. Both target an STM32F777 MCU.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`buffers`] | Byte FIFOs and the speaker/microphone stream buffers |
//! | [`protocol`] | 4-byte command records, opcodes, radio frames and the toggle-bit handshake |
//! | [`drivers`] | Bus master/slave, radio frame link, serial flash (AT26F004), amplifier |
//! | [`control`] | Playback rate adaptation |
//! | [`store`] | Sound clip recording, playback and erase on the serial flash |
//! | [`link`] | Command queues and routers of both processors |
//! | [`config`] | Build-time constants and firmware identity |
//! | [`error`], [`fault`] | Error codes, error log and latched faults |
//! | [`shared`] | Lock seam for state the interrupt handlers own |
//! | `hw` | MCU-level wrappers around USART, SPI, I2C, pins and critical sections (`firmware` feature) |
//!
//! Everything except `hw` is hardware independent and tested on the host.
//!
//! ## Getting Started
//!
//! Run the host tests:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash a board:
//!
//! ```bash
//! cargo run --release --features firmware --bin companion
//! cargo run --release --features firmware --bin core
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod buffers;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod fault;
pub mod link;
pub mod protocol;
pub mod shared;
pub mod store;

pub use shared::Shared;

#[cfg(feature = "firmware")]
pub mod hw;
