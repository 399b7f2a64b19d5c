// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use crate::constants::ANALOG_CENTER;
use std::fmt;

/// Core button bitfield, `(byte1 << 8) | byte2` of the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreButtons(u16);

impl CoreButtons {
    pub const LEFT: u16 = 0x0100;
    pub const RIGHT: u16 = 0x0200;
    pub const DOWN: u16 = 0x0400;
    pub const UP: u16 = 0x0800;
    pub const PLUS: u16 = 0x1000;
    pub const TWO: u16 = 0x0001;
    pub const ONE: u16 = 0x0002;
    pub const B: u16 = 0x0004;
    pub const A: u16 = 0x0008;
    pub const MINUS: u16 = 0x0010;
    pub const HOME: u16 = 0x0080;

    const MASK: u16 = 0x1F9F;

    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes) & Self::MASK)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_pressed(&self, button: u16) -> bool {
        self.0 & button != 0
    }

    pub fn left(&self) -> bool {
        self.is_pressed(Self::LEFT)
    }

    pub fn right(&self) -> bool {
        self.is_pressed(Self::RIGHT)
    }

    pub fn down(&self) -> bool {
        self.is_pressed(Self::DOWN)
    }

    pub fn up(&self) -> bool {
        self.is_pressed(Self::UP)
    }

    pub fn plus(&self) -> bool {
        self.is_pressed(Self::PLUS)
    }

    pub fn two(&self) -> bool {
        self.is_pressed(Self::TWO)
    }

    pub fn one(&self) -> bool {
        self.is_pressed(Self::ONE)
    }

    pub fn b(&self) -> bool {
        self.is_pressed(Self::B)
    }

    pub fn a(&self) -> bool {
        self.is_pressed(Self::A)
    }

    pub fn minus(&self) -> bool {
        self.is_pressed(Self::MINUS)
    }

    pub fn home(&self) -> bool {
        self.is_pressed(Self::HOME)
    }
}

/// Flags byte of the status reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const BATTERY_LOW: u8 = 0x01;
    pub const EXTENSION_CONNECTED: u8 = 0x02;
    pub const SPEAKER_ENABLED: u8 = 0x04;
    pub const IR_ENABLED: u8 = 0x08;

    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn battery_low(&self) -> bool {
        self.0 & Self::BATTERY_LOW != 0
    }

    pub fn extension_connected(&self) -> bool {
        self.0 & Self::EXTENSION_CONNECTED != 0
    }

    pub fn speaker_enabled(&self) -> bool {
        self.0 & Self::SPEAKER_ENABLED != 0
    }

    pub fn ir_enabled(&self) -> bool {
        self.0 & Self::IR_ENABLED != 0
    }

    /// Player LEDs currently lit, LED1 in bit 0
    pub fn leds(&self) -> u8 {
        self.0 >> 4
    }
}

/// Where the extension port currently stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtensionPhase {
    #[default]
    None,
    AwaitingDecrypt1,
    AwaitingDecrypt2,
    Decrypted,
    Unknown,
    Nunchuck,
    ClassicController,
}

impl ExtensionPhase {
    /// True while the handshake is still in flight
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ExtensionPhase::AwaitingDecrypt1
                | ExtensionPhase::AwaitingDecrypt2
                | ExtensionPhase::Decrypted
        )
    }
}

impl fmt::Display for ExtensionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionPhase::None => write!(f, "None"),
            ExtensionPhase::AwaitingDecrypt1 => write!(f, "Awaiting decryption (1/2)"),
            ExtensionPhase::AwaitingDecrypt2 => write!(f, "Awaiting decryption (2/2)"),
            ExtensionPhase::Decrypted => write!(f, "Decrypted"),
            ExtensionPhase::Unknown => write!(f, "Unknown"),
            ExtensionPhase::Nunchuck => write!(f, "Nunchuck"),
            ExtensionPhase::ClassicController => write!(f, "Classic Controller"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NunchuckState {
    pub stick_x: u16,
    pub stick_y: u16,
    pub c: bool,
    pub z: bool,
}

impl Default for NunchuckState {
    fn default() -> Self {
        Self {
            stick_x: ANALOG_CENTER,
            stick_y: ANALOG_CENTER,
            c: false,
            z: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicControllerState {
    /// Data format reported by the extension, 0 until known
    pub data_format: u8,
    pub left_x: u16,
    pub left_y: u16,
    pub right_x: u16,
    pub right_y: u16,
    pub left_trigger: u16,
    pub right_trigger: u16,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub minus: bool,
    pub plus: bool,
    pub home: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub lt_click: bool,
    pub rt_click: bool,
    pub zl: bool,
    pub zr: bool,
}

impl Default for ClassicControllerState {
    fn default() -> Self {
        Self {
            data_format: 0,
            left_x: ANALOG_CENTER,
            left_y: ANALOG_CENTER,
            right_x: ANALOG_CENTER,
            right_y: ANALOG_CENTER,
            left_trigger: 0,
            right_trigger: 0,
            a: false,
            b: false,
            x: false,
            y: false,
            minus: false,
            plus: false,
            home: false,
            dpad_up: false,
            dpad_down: false,
            dpad_left: false,
            dpad_right: false,
            lt_click: false,
            rt_click: false,
            zl: false,
            zr: false,
        }
    }
}

/// Everything decoded so far for one controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WiimoteState {
    pub buttons: CoreButtons,
    pub battery: u8,
    pub status_flags: StatusFlags,
    pub extension: ExtensionPhase,
    pub nunchuck: NunchuckState,
    pub classic: ClassicControllerState,
    /// Set once the first status reply has been seen
    pub initialized: bool,
}

impl WiimoteState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything learned about the extension
    pub fn reset_extension(&mut self) {
        self.extension = ExtensionPhase::None;
        self.nunchuck = NunchuckState::default();
        self.classic = ClassicControllerState::default();
    }
}

impl fmt::Display for WiimoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wiimote {{ buttons: {:#06x}, battery: {}, extension: {} }}",
            self.buttons.bits(),
            self.battery,
            self.extension
        )
    }
}
