// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

//! Stateless decoding of Wiimote input reports.
//!
//! [`InputReport::parse`] only looks at the bytes; it never touches a
//! [`WiimoteState`]. The extension decoders below write into the nested
//! extension state and are selected by the current [`ExtensionPhase`].

use crate::constants::{
    ANALOG_MAX, READ_ERROR_NONEXISTENT, READ_ERROR_WRITE_ONLY, TRIGGER_MAX,
};
use crate::hid_commands::HidInReport;
use crate::state::{
    ClassicControllerState, CoreButtons, ExtensionPhase, NunchuckState, StatusFlags,
    WiimoteState,
};
use std::fmt;

/// Number of extension bytes the decoders consume
pub const EXTENSION_PAYLOAD_SIZE: usize = 6;

/// Errors that can occur when parsing input reports
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty report")]
    Empty,

    #[error("Invalid length for report {report:#04x}: expected at least {expected}, got {actual}")]
    InvalidLength {
        report: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Unrecognized report type: {0:#04x}")]
    UnknownReport(u8),

    #[error("Attempted reading write-only register {0:#06x}")]
    WriteOnlyRegister(u16),

    #[error("Attempted reading nonexistent register {0:#06x}")]
    NonexistentRegister(u16),

    #[error("Reading register {offset:#06x} failed with error {code}")]
    ReadFailed { offset: u16, code: u8 },

    #[error("Classic Controller data format {0:#04x} not supported")]
    UnsupportedDataFormat(u8),
}

impl ProtocolError {
    /// The report was valid and its core buttons were applied; only the
    /// extension bytes could not be decoded.
    pub fn core_state_applied(&self) -> bool {
        matches!(self, ProtocolError::UnsupportedDataFormat(_))
    }
}

/// Status information reply (0x20)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReply {
    pub buttons: CoreButtons,
    pub flags: StatusFlags,
    pub battery: u8,
}

/// Register read reply (0x21)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReply<'a> {
    pub buttons: CoreButtons,
    pub size: usize,
    /// Low 16 bits of the register address
    pub offset: u16,
    pub data: &'a [u8],
}

/// Output report acknowledgement (0x22)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledge {
    pub buttons: CoreButtons,
    pub command: u8,
    pub error: u8,
}

/// A parsed input report, borrowing its payload from the read buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputReport<'a> {
    /// Button data, any accelerometer/IR payload skipped
    Buttons(CoreButtons),
    /// Button data followed by extension bytes
    ButtonsExtension {
        buttons: CoreButtons,
        extension: &'a [u8],
    },
    /// Extension bytes only
    Extension(&'a [u8]),
    Status(StatusReply),
    ReadReply(ReadReply<'a>),
    Acknowledge(Acknowledge),
}

fn require(buffer: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if buffer.len() < expected {
        return Err(ProtocolError::InvalidLength {
            report: buffer[0],
            expected,
            actual: buffer.len(),
        });
    }
    Ok(())
}

fn core_buttons(buffer: &[u8]) -> CoreButtons {
    CoreButtons::from_bytes([buffer[1], buffer[2]])
}

/// Slice the extension area, at least [`EXTENSION_PAYLOAD_SIZE`] bytes long
fn extension_area(buffer: &[u8], offset: usize, size: usize) -> Result<&[u8], ProtocolError> {
    require(buffer, offset + EXTENSION_PAYLOAD_SIZE)?;
    let end = (offset + size).min(buffer.len());
    Ok(&buffer[offset..end])
}

impl<'a> InputReport<'a> {
    /// Parse a raw report; the first byte selects the layout
    pub fn parse(buffer: &'a [u8]) -> Result<Self, ProtocolError> {
        let first = *buffer.first().ok_or(ProtocolError::Empty)?;
        let report = HidInReport::try_from(first).map_err(ProtocolError::UnknownReport)?;

        match report {
            HidInReport::CoreButtons | HidInReport::CoreAccel | HidInReport::CoreAccelIr12 => {
                require(buffer, 3)?;
                Ok(InputReport::Buttons(core_buttons(buffer)))
            }
            HidInReport::CoreExt8 => Self::with_extension(buffer, 3, 8),
            HidInReport::CoreExt19 => Self::with_extension(buffer, 3, 19),
            HidInReport::CoreAccelExt16 => Self::with_extension(buffer, 6, 16),
            HidInReport::CoreIr10Ext9 => Self::with_extension(buffer, 13, 9),
            HidInReport::CoreAccelIr10Ext6 => Self::with_extension(buffer, 16, 6),
            HidInReport::Ext21 => Ok(InputReport::Extension(extension_area(buffer, 1, 21)?)),
            HidInReport::StatusReply => {
                require(buffer, 7)?;
                Ok(InputReport::Status(StatusReply {
                    buttons: core_buttons(buffer),
                    flags: StatusFlags::new(buffer[3]),
                    battery: buffer[6],
                }))
            }
            HidInReport::ReadRegisterReply => Self::read_reply(buffer),
            HidInReport::Acknowledge => {
                require(buffer, 5)?;
                Ok(InputReport::Acknowledge(Acknowledge {
                    buttons: core_buttons(buffer),
                    command: buffer[3],
                    error: buffer[4],
                }))
            }
        }
    }

    fn with_extension(buffer: &'a [u8], offset: usize, size: usize) -> Result<Self, ProtocolError> {
        let extension = extension_area(buffer, offset, size)?;
        Ok(InputReport::ButtonsExtension {
            buttons: core_buttons(buffer),
            extension,
        })
    }

    fn read_reply(buffer: &'a [u8]) -> Result<Self, ProtocolError> {
        require(buffer, 6)?;
        let error = buffer[3] & 0x0F;
        let size = ((buffer[3] >> 4) & 0x0F) as usize + 1;
        let offset = u16::from_be_bytes([buffer[4], buffer[5]]);

        match error {
            0 => {}
            READ_ERROR_WRITE_ONLY => return Err(ProtocolError::WriteOnlyRegister(offset)),
            READ_ERROR_NONEXISTENT => return Err(ProtocolError::NonexistentRegister(offset)),
            code => return Err(ProtocolError::ReadFailed { offset, code }),
        }

        require(buffer, 6 + size)?;
        Ok(InputReport::ReadReply(ReadReply {
            buttons: core_buttons(buffer),
            size,
            offset,
            data: &buffer[6..6 + size],
        }))
    }

    /// Core buttons carried by the report, if any
    pub fn buttons(&self) -> Option<CoreButtons> {
        match self {
            InputReport::Buttons(buttons) => Some(*buttons),
            InputReport::ButtonsExtension { buttons, .. } => Some(*buttons),
            InputReport::Extension(_) => None,
            InputReport::Status(status) => Some(status.buttons),
            InputReport::ReadReply(reply) => Some(reply.buttons),
            InputReport::Acknowledge(ack) => Some(ack.buttons),
        }
    }
}

impl fmt::Display for InputReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputReport::Buttons(b) => write!(f, "Buttons {{ {:#06x} }}", b.bits()),
            InputReport::ButtonsExtension { buttons, extension } => write!(
                f,
                "Buttons {{ {:#06x} }} Extension {{ {:02x?} }}",
                buttons.bits(),
                extension
            ),
            InputReport::Extension(extension) => write!(f, "Extension {{ {:02x?} }}", extension),
            InputReport::Status(s) => write!(
                f,
                "Status {{ flags: {:#04x}, battery: {} }}",
                s.flags.bits(),
                s.battery
            ),
            InputReport::ReadReply(r) => write!(
                f,
                "ReadReply {{ offset: {:#06x}, size: {}, data: {:02x?} }}",
                r.offset, r.size, r.data
            ),
            InputReport::Acknowledge(a) => write!(
                f,
                "Acknowledge {{ command: {:#04x}, error: {:#04x} }}",
                a.command, a.error
            ),
        }
    }
}

fn rescale(value: u8, max_in: u16, max_out: u16) -> u16 {
    (u32::from(value) * u32::from(max_out) / u32::from(max_in)) as u16
}

fn active_low(byte: u8, bit: u8) -> bool {
    (byte >> bit) & 1 == 0
}

/// Decode 6 nunchuck bytes
pub fn decode_nunchuck(ext: &[u8], nunchuck: &mut NunchuckState) {
    nunchuck.stick_x = rescale(ext[0], 255, ANALOG_MAX);
    nunchuck.stick_y = rescale(ext[1], 255, ANALOG_MAX);
    nunchuck.z = active_low(ext[5], 0);
    nunchuck.c = active_low(ext[5], 1);
}

/// Decode 6 classic controller bytes; only data format 1 is understood
pub fn decode_classic_controller(
    ext: &[u8],
    classic: &mut ClassicControllerState,
) -> Result<(), ProtocolError> {
    if classic.data_format != 1 {
        return Err(ProtocolError::UnsupportedDataFormat(classic.data_format));
    }

    let rx = (ext[2] & 0x80) >> 7 | (ext[1] & 0xC0) >> 5 | (ext[0] & 0xC0) >> 3;
    let lt = (ext[3] & 0xE0) >> 5 | (ext[2] & 0x60) >> 2;

    classic.left_x = rescale(ext[0] & 0x3F, 63, ANALOG_MAX);
    classic.left_y = rescale(ext[1] & 0x3F, 63, ANALOG_MAX);
    classic.right_x = rescale(rx, 31, ANALOG_MAX);
    classic.right_y = rescale(ext[2] & 0x1F, 31, ANALOG_MAX);
    classic.left_trigger = rescale(lt, 31, TRIGGER_MAX);
    classic.right_trigger = rescale(ext[3] & 0x1F, 31, TRIGGER_MAX);

    classic.dpad_right = active_low(ext[4], 7);
    classic.dpad_down = active_low(ext[4], 6);
    classic.lt_click = active_low(ext[4], 5);
    classic.minus = active_low(ext[4], 4);
    classic.home = active_low(ext[4], 3);
    classic.plus = active_low(ext[4], 2);
    classic.rt_click = active_low(ext[4], 1);

    classic.zl = active_low(ext[5], 7);
    classic.b = active_low(ext[5], 6);
    classic.y = active_low(ext[5], 5);
    classic.a = active_low(ext[5], 4);
    classic.x = active_low(ext[5], 3);
    classic.zr = active_low(ext[5], 2);
    classic.dpad_left = active_low(ext[5], 1);
    classic.dpad_up = active_low(ext[5], 0);
    Ok(())
}

/// Decode extension bytes according to the current phase
pub fn decode_extension(ext: &[u8], state: &mut WiimoteState) -> Result<(), ProtocolError> {
    if ext.len() < EXTENSION_PAYLOAD_SIZE {
        return Err(ProtocolError::InvalidLength {
            report: 0,
            expected: EXTENSION_PAYLOAD_SIZE,
            actual: ext.len(),
        });
    }
    // Bytes seen mid-handshake are still encrypted.
    if state.extension.is_pending() {
        return Ok(());
    }
    match state.extension {
        ExtensionPhase::Nunchuck => {
            decode_nunchuck(ext, &mut state.nunchuck);
            Ok(())
        }
        ExtensionPhase::ClassicController => decode_classic_controller(ext, &mut state.classic),
        _ => Ok(()),
    }
}
