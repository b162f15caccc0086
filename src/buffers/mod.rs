// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

pub mod audio;
pub mod fifo;

pub use audio::AudioStreams;
pub use fifo::{Fifo, FifoError};
