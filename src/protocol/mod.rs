// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Wire formats shared by the bus link and the framed radio link.

pub mod frame;
pub mod handshake;
pub mod messages;
pub mod record;

pub use frame::{ConfigFlags, Frame};
pub use handshake::Handshake;
pub use messages::{Command, FlashStatus, SleepKind, SwitchStatus};
pub use record::{Record, RecordSink};
