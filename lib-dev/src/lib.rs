// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

//! # Wiimote HID Protocol Library
//!
//! This library speaks the Wii Remote's raw HID protocol, including:
//! - Input report decoding (core buttons, status, register replies, extensions)
//! - Output command frames (LEDs, reporting mode, register read/write)
//! - The extension decryption and identification handshake
//! - A bounded per-connection command queue
//! - Non-blocking hidraw transport and device enumeration

pub mod constants;
pub mod handshake;
pub mod hid_commands;
pub mod hid_device;
pub mod input_reports;
pub mod queue;
pub mod state;

// Re-export commonly used types
pub use constants::*;
pub use handshake::process_report;
pub use hid_commands::{
    HidInReport, HidOutCommand, HidOutputCommand, ReadRegister, RequestStatus, SetLeds,
    SetReportMode, WriteRegister,
};
pub use hid_device::{enumerate_devices, DeviceInfo, HidError, HidTransport, HidrawDevice};
pub use input_reports::{InputReport, ProtocolError};
pub use queue::{CommandQueue, Frame, FrameError, QueueError};
pub use state::{
    ClassicControllerState, CoreButtons, ExtensionPhase, NunchuckState, StatusFlags,
    WiimoteState,
};
