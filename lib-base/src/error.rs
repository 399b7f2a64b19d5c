// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use std::io;
use std::path::PathBuf;
use wiimote_hid::HidError;

/// Errors raised while bridging controllers to virtual gamepads
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Maximum number of connected Wiimotes reached ({0})")]
    RegistryFull(usize),

    #[error("Device {vendor_id:04x}:{product_id:04x} at {path} is not a Wiimote")]
    Unsupported {
        path: PathBuf,
        vendor_id: u16,
        product_id: u16,
    },

    #[error(transparent)]
    Hid(#[from] HidError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
