// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

pub mod rate;

pub use rate::RateAdapter;
