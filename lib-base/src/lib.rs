// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

mod config;
mod context;
mod error;
mod hotplug;
mod poller;
mod reactor;
mod registry;
mod uinput;

pub use config::*;
pub use context::*;
pub use error::*;
pub use hotplug::*;
pub use poller::*;
pub use reactor::*;
pub use registry::*;
pub use uinput::*;
