// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

//! Virtual gamepad output through `/dev/uinput`.
//!
//! [`events_for`] turns a decoded [`WiimoteState`] into evdev events and is
//! independent of the kernel interface. [`UinputDevice`] creates one virtual
//! pad and writes those events to it.

use crate::config::VirtualDeviceConfig;
use crate::error::BridgeError;
use log::{debug, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use wiimote_hid::{ExtensionPhase, WiimoteState, ANALOG_CENTER, ANALOG_MAX, TRIGGER_MAX};

pub const UINPUT_PATH: &str = "/dev/uinput";

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;
pub const SYN_REPORT: u16 = 0x00;

pub const BTN_SOUTH: u16 = 0x130;
pub const BTN_EAST: u16 = 0x131;
pub const BTN_NORTH: u16 = 0x133;
pub const BTN_WEST: u16 = 0x134;
pub const BTN_TL: u16 = 0x136;
pub const BTN_TR: u16 = 0x137;
pub const BTN_TL2: u16 = 0x138;
pub const BTN_TR2: u16 = 0x139;
pub const BTN_SELECT: u16 = 0x13a;
pub const BTN_START: u16 = 0x13b;
pub const BTN_MODE: u16 = 0x13c;
pub const BTN_DPAD_UP: u16 = 0x220;
pub const BTN_DPAD_DOWN: u16 = 0x221;
pub const BTN_DPAD_LEFT: u16 = 0x222;
pub const BTN_DPAD_RIGHT: u16 = 0x223;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_RX: u16 = 0x03;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;

const BUS_USB: u16 = 0x03;
const UINPUT_MAX_NAME_SIZE: usize = 80;

const KEYS: [u16; 15] = [
    BTN_SOUTH,
    BTN_EAST,
    BTN_NORTH,
    BTN_WEST,
    BTN_TL,
    BTN_TR,
    BTN_TL2,
    BTN_TR2,
    BTN_SELECT,
    BTN_START,
    BTN_MODE,
    BTN_DPAD_UP,
    BTN_DPAD_DOWN,
    BTN_DPAD_LEFT,
    BTN_DPAD_RIGHT,
];

const AXES: [(u16, u16); 6] = [
    (ABS_X, ANALOG_MAX),
    (ABS_Y, ANALOG_MAX),
    (ABS_RX, ANALOG_MAX),
    (ABS_RY, ANALOG_MAX),
    (ABS_Z, TRIGGER_MAX),
    (ABS_RZ, TRIGGER_MAX),
];

/// A single evdev event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamepadEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl GamepadEvent {
    fn key(code: u16, pressed: bool) -> Self {
        Self {
            kind: EV_KEY,
            code,
            value: i32::from(pressed),
        }
    }

    fn abs(code: u16, value: u16) -> Self {
        Self {
            kind: EV_ABS,
            code,
            value: i32::from(value),
        }
    }

    fn sync() -> Self {
        Self {
            kind: EV_SYN,
            code: SYN_REPORT,
            value: 0,
        }
    }
}

/// Sticks report up as the high value, evdev wants up as the low one
fn invert(value: u16) -> u16 {
    ANALOG_MAX.saturating_sub(value)
}

/// Translate a decoded state into one full evdev frame, ending with `SYN_REPORT`
pub fn events_for(state: &WiimoteState) -> Vec<GamepadEvent> {
    let core = state.buttons;
    let classic = match state.extension {
        ExtensionPhase::ClassicController => Some(&state.classic),
        _ => None,
    };
    let nunchuck = match state.extension {
        ExtensionPhase::Nunchuck => Some(&state.nunchuck),
        _ => None,
    };
    // Absent extensions read as released buttons.
    let cc = classic.copied().unwrap_or_default();
    let nc = nunchuck.copied().unwrap_or_default();

    let mut events = vec![
        GamepadEvent::key(BTN_SOUTH, core.a() || cc.a),
        GamepadEvent::key(BTN_EAST, core.b() || cc.b),
        GamepadEvent::key(BTN_WEST, core.one() || cc.y),
        GamepadEvent::key(BTN_NORTH, core.two() || cc.x),
        GamepadEvent::key(BTN_DPAD_UP, core.up() || cc.dpad_up),
        GamepadEvent::key(BTN_DPAD_DOWN, core.down() || cc.dpad_down),
        GamepadEvent::key(BTN_DPAD_LEFT, core.left() || cc.dpad_left),
        GamepadEvent::key(BTN_DPAD_RIGHT, core.right() || cc.dpad_right),
        GamepadEvent::key(BTN_START, core.plus() || cc.plus),
        GamepadEvent::key(BTN_SELECT, core.minus() || cc.minus),
        GamepadEvent::key(BTN_MODE, core.home() || cc.home),
        GamepadEvent::key(BTN_TL, nc.c || cc.lt_click),
        GamepadEvent::key(BTN_TL2, nc.z || cc.zl),
        GamepadEvent::key(BTN_TR, cc.rt_click),
        GamepadEvent::key(BTN_TR2, cc.zr),
    ];

    let (x, y, rx, ry, z, rz) = match (nunchuck, classic) {
        (Some(n), _) => (
            n.stick_x,
            invert(n.stick_y),
            ANALOG_CENTER,
            ANALOG_CENTER,
            0,
            0,
        ),
        (None, Some(c)) => (
            c.left_x,
            invert(c.left_y),
            c.right_x,
            invert(c.right_y),
            c.left_trigger,
            c.right_trigger,
        ),
        (None, None) => (ANALOG_CENTER, ANALOG_CENTER, ANALOG_CENTER, ANALOG_CENTER, 0, 0),
    };
    events.extend([
        GamepadEvent::abs(ABS_X, x),
        GamepadEvent::abs(ABS_Y, y),
        GamepadEvent::abs(ABS_RX, rx),
        GamepadEvent::abs(ABS_RY, ry),
        GamepadEvent::abs(ABS_Z, z),
        GamepadEvent::abs(ABS_RZ, rz),
    ]);
    events.push(GamepadEvent::sync());
    events
}

/// Consumer of decoded controller state
pub trait OutputSink {
    fn emit(&mut self, state: &WiimoteState) -> io::Result<()>;
}

/// Fail early when the uinput node is missing or not writable
pub fn check_uinput_access(path: &Path) -> Result<(), BridgeError> {
    if fs::metadata(path).is_err() {
        return Err(BridgeError::Setup(format!(
            "{} not found. Is the uinput module loaded?",
            path.display()
        )));
    }
    OpenOptions::new().write(true).open(path).map_err(|e| {
        BridgeError::Setup(format!(
            "No write access to {} ({}). Add a udev rule or run as root.",
            path.display(),
            e
        ))
    })?;
    Ok(())
}

#[repr(C)]
#[derive(Clone, Copy)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct UinputSetup {
    id: InputId,
    name: [u8; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct InputAbsinfo {
    value: i32,
    minimum: i32,
    maximum: i32,
    fuzz: i32,
    flat: i32,
    resolution: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct UinputAbsSetup {
    code: u16,
    absinfo: InputAbsinfo,
}

#[repr(C)]
struct InputEvent {
    time: libc::timeval,
    kind: u16,
    code: u16,
    value: i32,
}

const UINPUT_IOCTL_BASE: u8 = b'U';
const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;

const fn ioc(direction: u32, nr: u8, size: usize) -> libc::c_ulong {
    ((direction << 30) | ((UINPUT_IOCTL_BASE as u32) << 8) | (nr as u32) | ((size as u32) << 16))
        as libc::c_ulong
}

const UI_DEV_CREATE: libc::c_ulong = ioc(IOC_NONE, 1, 0);
const UI_DEV_DESTROY: libc::c_ulong = ioc(IOC_NONE, 2, 0);
const UI_DEV_SETUP: libc::c_ulong = ioc(IOC_WRITE, 3, std::mem::size_of::<UinputSetup>());
const UI_ABS_SETUP: libc::c_ulong = ioc(IOC_WRITE, 4, std::mem::size_of::<UinputAbsSetup>());
const UI_SET_EVBIT: libc::c_ulong = ioc(IOC_WRITE, 100, std::mem::size_of::<libc::c_int>());
const UI_SET_KEYBIT: libc::c_ulong = ioc(IOC_WRITE, 101, std::mem::size_of::<libc::c_int>());
const UI_SET_ABSBIT: libc::c_ulong = ioc(IOC_WRITE, 103, std::mem::size_of::<libc::c_int>());

/// One virtual gamepad, destroyed when dropped
#[derive(Debug)]
pub struct UinputDevice {
    file: File,
    name: String,
}

impl UinputDevice {
    pub fn create(path: &Path, settings: &VirtualDeviceConfig) -> Result<Self, BridgeError> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| BridgeError::Setup(format!("open {}: {}", path.display(), e)))?;
        let device = Self {
            file,
            name: settings.name.clone(),
        };

        device.ioctl_value("UI_SET_EVBIT", UI_SET_EVBIT, EV_KEY)?;
        device.ioctl_value("UI_SET_EVBIT", UI_SET_EVBIT, EV_ABS)?;
        for key in KEYS {
            device.ioctl_value("UI_SET_KEYBIT", UI_SET_KEYBIT, key)?;
        }
        for (axis, maximum) in AXES {
            device.ioctl_value("UI_SET_ABSBIT", UI_SET_ABSBIT, axis)?;
            let mut abs_setup = UinputAbsSetup {
                code: axis,
                absinfo: InputAbsinfo {
                    minimum: 0,
                    maximum: i32::from(maximum),
                    ..Default::default()
                },
            };
            device.ioctl_ptr("UI_ABS_SETUP", UI_ABS_SETUP, &mut abs_setup)?;
        }

        let mut setup = UinputSetup {
            id: InputId {
                bustype: BUS_USB,
                vendor: settings.vendor_id,
                product: settings.product_id,
                version: 1,
            },
            name: [0; UINPUT_MAX_NAME_SIZE],
            ff_effects_max: 0,
        };
        let name = settings.name.as_bytes();
        let len = name.len().min(UINPUT_MAX_NAME_SIZE - 1);
        setup.name[..len].copy_from_slice(&name[..len]);
        device.ioctl_ptr("UI_DEV_SETUP", UI_DEV_SETUP, &mut setup)?;

        // SAFETY: UI_DEV_CREATE takes no argument.
        if unsafe { libc::ioctl(device.file.as_raw_fd(), UI_DEV_CREATE) } < 0 {
            return Err(device.ioctl_error("UI_DEV_CREATE"));
        }
        info!("Created virtual gamepad \"{}\"", device.name);
        Ok(device)
    }

    fn ioctl_error(&self, request: &str) -> BridgeError {
        BridgeError::Setup(format!(
            "ioctl {} on uinput failed: {}",
            request,
            io::Error::last_os_error()
        ))
    }

    fn ioctl_value(
        &self,
        request: &str,
        code: libc::c_ulong,
        value: u16,
    ) -> Result<(), BridgeError> {
        // SAFETY: the UI_SET_*BIT requests take a plain int argument.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), code, libc::c_int::from(value)) };
        if rc < 0 {
            return Err(self.ioctl_error(request));
        }
        Ok(())
    }

    fn ioctl_ptr<T>(&self, request: &str, code: libc::c_ulong, arg: &mut T) -> Result<(), BridgeError> {
        // SAFETY: code encodes size_of::<T>() and arg points to a live, repr(C) T.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), code, arg as *mut T) };
        if rc < 0 {
            return Err(self.ioctl_error(request));
        }
        Ok(())
    }
}

impl OutputSink for UinputDevice {
    fn emit(&mut self, state: &WiimoteState) -> io::Result<()> {
        let events = events_for(state);
        let mut buffer = Vec::with_capacity(events.len() * std::mem::size_of::<InputEvent>());
        for event in &events {
            let raw = InputEvent {
                time: libc::timeval {
                    tv_sec: 0,
                    tv_usec: 0,
                },
                kind: event.kind,
                code: event.code,
                value: event.value,
            };
            // SAFETY: InputEvent is repr(C) plain data; the slice covers exactly one value.
            let bytes = unsafe {
                std::slice::from_raw_parts(
                    &raw as *const InputEvent as *const u8,
                    std::mem::size_of::<InputEvent>(),
                )
            };
            buffer.extend_from_slice(bytes);
        }
        self.file.write_all(&buffer)?;
        debug!("Emitted {} events to \"{}\"", events.len(), self.name);
        Ok(())
    }
}

impl Drop for UinputDevice {
    fn drop(&mut self) {
        // SAFETY: UI_DEV_DESTROY takes no argument.
        if unsafe { libc::ioctl(self.file.as_raw_fd(), UI_DEV_DESTROY) } < 0 {
            warn!(
                "Failed to destroy virtual gamepad \"{}\": {}",
                self.name,
                io::Error::last_os_error()
            );
        } else {
            info!("Destroyed virtual gamepad \"{}\"", self.name);
        }
    }
}
