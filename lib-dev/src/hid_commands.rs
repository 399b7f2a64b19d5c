// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use crate::constants::*;
use crate::queue::{Frame, FrameError};
use std::fmt;

/// Identifiers for incoming HID reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HidInReport {
    StatusReply = 0x20,
    ReadRegisterReply = 0x21,
    Acknowledge = 0x22,
    CoreButtons = 0x30,
    CoreAccel = 0x31,
    CoreExt8 = 0x32,
    CoreAccelIr12 = 0x33,
    CoreExt19 = 0x34,
    CoreAccelExt16 = 0x35,
    CoreIr10Ext9 = 0x36,
    CoreAccelIr10Ext6 = 0x37,
    Ext21 = 0x3D,
}

impl TryFrom<u8> for HidInReport {
    type Error = u8;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0x20 => Ok(HidInReport::StatusReply),
            0x21 => Ok(HidInReport::ReadRegisterReply),
            0x22 => Ok(HidInReport::Acknowledge),
            0x30 => Ok(HidInReport::CoreButtons),
            0x31 => Ok(HidInReport::CoreAccel),
            0x32 => Ok(HidInReport::CoreExt8),
            0x33 => Ok(HidInReport::CoreAccelIr12),
            0x34 => Ok(HidInReport::CoreExt19),
            0x35 => Ok(HidInReport::CoreAccelExt16),
            0x36 => Ok(HidInReport::CoreIr10Ext9),
            0x37 => Ok(HidInReport::CoreAccelIr10Ext6),
            0x3D => Ok(HidInReport::Ext21),
            other => Err(other),
        }
    }
}

/// Identifiers for outgoing HID reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HidOutCommand {
    SetLeds = 0x11,
    ReportMode = 0x12,
    StatusRequest = 0x15,
    WriteRegister = 0x16,
    ReadRegister = 0x17,
}

/// Base trait for HID output commands
pub trait HidOutputCommand: fmt::Debug {
    fn to_buffer(&self) -> Vec<u8>;

    fn to_frame(&self) -> Result<Frame, FrameError> {
        Frame::new(&self.to_buffer())
    }
}

/// Player LED command
#[derive(Debug, Clone)]
pub struct SetLeds {
    mask: u8,
}

impl SetLeds {
    /// Raw LED mask, LED1 is bit 4
    pub fn new(mask: u8) -> Self {
        Self { mask: mask & 0xF0 }
    }

    /// Light the LED matching a registry slot (slot 0 → LED1)
    pub fn for_slot(slot: usize) -> Self {
        Self::new(0x10u8.checked_shl(slot as u32).unwrap_or(0))
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }
}

impl HidOutputCommand for SetLeds {
    fn to_buffer(&self) -> Vec<u8> {
        vec![HidOutCommand::SetLeds as u8, self.mask]
    }
}

impl fmt::Display for SetLeds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SetLeds {{ mask: {:#04x} }}", self.mask)
    }
}

/// Data reporting mode command
#[derive(Debug, Clone)]
pub struct SetReportMode {
    continuous: bool,
    mode: u8,
}

impl SetReportMode {
    pub fn new(mode: u8) -> Self {
        Self {
            continuous: false,
            mode,
        }
    }

    pub fn continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }
}

impl Default for SetReportMode {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_MODE)
    }
}

impl HidOutputCommand for SetReportMode {
    fn to_buffer(&self) -> Vec<u8> {
        let flags = if self.continuous { 0x04 } else { 0x00 };
        vec![HidOutCommand::ReportMode as u8, flags, self.mode]
    }
}

impl fmt::Display for SetReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SetReportMode {{ mode: {:#04x}, continuous: {} }}",
            self.mode, self.continuous
        )
    }
}

/// Status information request
#[derive(Debug, Clone, Default)]
pub struct RequestStatus;

impl HidOutputCommand for RequestStatus {
    fn to_buffer(&self) -> Vec<u8> {
        vec![HidOutCommand::StatusRequest as u8, 0x00]
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestStatus")
    }
}

/// Register write, up to 16 bytes of payload
#[derive(Debug, Clone)]
pub struct WriteRegister {
    space: u8,
    address: u32,
    data: [u8; 16],
    size: u8,
}

impl WriteRegister {
    /// Payload beyond 16 bytes is truncated
    pub fn new(space: u8, address: u32, data: &[u8]) -> Self {
        let size = data.len().min(16);
        let mut buf = [0u8; 16];
        buf[..size].copy_from_slice(&data[..size]);
        Self {
            space,
            address: address & 0x00FF_FFFF,
            data: buf,
            size: size as u8,
        }
    }

    /// Write a single byte into the control registers
    pub fn register(address: u32, value: u8) -> Self {
        Self::new(ADDRESS_SPACE_REGISTERS, address, &[value])
    }

    pub fn decrypt_phase1() -> Self {
        Self::register(REG_EXT_DECRYPT_1, EXT_DECRYPT_1_VALUE)
    }

    pub fn decrypt_phase2() -> Self {
        Self::register(REG_EXT_DECRYPT_2, EXT_DECRYPT_2_VALUE)
    }

    pub fn classic_data_format() -> Self {
        Self::register(REG_EXT_DATA_FORMAT, CLASSIC_DATA_FORMAT)
    }
}

impl HidOutputCommand for WriteRegister {
    fn to_buffer(&self) -> Vec<u8> {
        let addr = self.address.to_be_bytes();
        let mut buffer = Vec::with_capacity(22);
        buffer.push(HidOutCommand::WriteRegister as u8);
        buffer.push(self.space);
        buffer.extend_from_slice(&addr[1..]);
        buffer.push(self.size);
        buffer.extend_from_slice(&self.data);
        buffer
    }
}

impl fmt::Display for WriteRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WriteRegister {{ address: {:#08x}, data: {:02x?} }}",
            self.address,
            &self.data[..self.size as usize]
        )
    }
}

/// Register read
#[derive(Debug, Clone)]
pub struct ReadRegister {
    space: u8,
    address: u32,
    size: u16,
}

impl ReadRegister {
    pub fn new(space: u8, address: u32, size: u16) -> Self {
        Self {
            space,
            address: address & 0x00FF_FFFF,
            size,
        }
    }

    pub fn extension_signature() -> Self {
        Self::new(ADDRESS_SPACE_REGISTERS, REG_EXT_SIGNATURE, EXT_SIGNATURE_SIZE)
    }

    pub fn classic_data_format() -> Self {
        Self::new(ADDRESS_SPACE_REGISTERS, REG_EXT_DATA_FORMAT, 1)
    }
}

impl HidOutputCommand for ReadRegister {
    fn to_buffer(&self) -> Vec<u8> {
        let addr = self.address.to_be_bytes();
        let mut buffer = Vec::with_capacity(7);
        buffer.push(HidOutCommand::ReadRegister as u8);
        buffer.push(self.space);
        buffer.extend_from_slice(&addr[1..]);
        buffer.extend_from_slice(&self.size.to_be_bytes());
        buffer
    }
}

impl fmt::Display for ReadRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReadRegister {{ address: {:#08x}, size: {} }}",
            self.address, self.size
        )
    }
}
