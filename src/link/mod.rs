// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command plumbing between the host, the companion and the core.

pub mod companion;
pub mod core_link;
pub mod queues;
pub mod router;

pub use companion::Companion;
pub use core_link::{
    Actuators, AudioStatus, Conditions, CoreBus, CoreLink, CoreQueues, CoreRouter,
};
pub use queues::CommandQueues;
pub use router::{Route, Router};
