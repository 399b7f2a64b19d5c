// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use log::{debug, warn};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;
use wiimote_hid::HidrawDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugAction {
    Add,
    Remove,
}

/// A hidraw node appearing or disappearing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotplugEvent {
    pub action: HotplugAction,
    pub path: PathBuf,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Source of hot-plug notifications, polled for readability by the reactor
pub trait HotplugSource: AsRawFd {
    /// Pull one pending event, `None` if there is nothing relevant
    fn receive(&mut self) -> Option<HotplugEvent>;
}

/// Parse a `HID_ID` property such as `0005:0000057E:00000306`
pub fn parse_hid_id(value: &str) -> Option<(u16, u16)> {
    let mut parts = value.trim().split(':');
    let _bus = parts.next()?;
    let vendor = u32::from_str_radix(parts.next()?, 16).ok()?;
    let product = u32::from_str_radix(parts.next()?, 16).ok()?;
    Some((u16::try_from(vendor).ok()?, u16::try_from(product).ok()?))
}

/// udev monitor restricted to the `hidraw` subsystem
pub struct UdevMonitor<'a> {
    socket: libudev::MonitorSocket,
    _context: std::marker::PhantomData<&'a libudev::Context>,
}

impl<'a> UdevMonitor<'a> {
    pub fn new(context: &'a libudev::Context) -> libudev::Result<Self> {
        let mut monitor = libudev::Monitor::new(context)?;
        monitor.match_subsystem("hidraw")?;
        let socket = monitor.listen()?;
        Ok(Self {
            socket,
            _context: std::marker::PhantomData,
        })
    }
}

fn device_ids(device: &libudev::Device) -> Option<(u16, u16)> {
    let mut parent = device.parent();
    while let Some(current) = parent {
        if let Some(id) = current.property_value("HID_ID") {
            return parse_hid_id(&id.to_string_lossy());
        }
        parent = current.parent();
    }
    None
}

impl HotplugSource for UdevMonitor<'_> {
    fn receive(&mut self) -> Option<HotplugEvent> {
        let event = self.socket.receive_event()?;
        let action = match event.event_type() {
            libudev::EventType::Add => HotplugAction::Add,
            libudev::EventType::Remove => HotplugAction::Remove,
            other => {
                debug!("Ignoring udev {:?} event", other);
                return None;
            }
        };
        let device = event.device();
        let path = device.devnode()?.to_path_buf();

        let ids = device_ids(device).or_else(|| {
            // The parent may already be gone; asking the node itself still works on add.
            if action == HotplugAction::Add {
                HidrawDevice::open(&path)
                    .and_then(|d| d.info())
                    .map(|info| (info.vendor_id, info.product_id))
                    .map_err(|e| warn!("Cannot identify {}: {}", path.display(), e))
                    .ok()
            } else {
                None
            }
        });
        let (vendor_id, product_id) = ids.unwrap_or((0, 0));

        debug!(
            "udev {:?} {} ({:04x}:{:04x})",
            action,
            path.display(),
            vendor_id,
            product_id
        );
        Some(HotplugEvent {
            action,
            path,
            vendor_id,
            product_id,
        })
    }
}

impl AsRawFd for UdevMonitor<'_> {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hid_id() {
        assert_eq!(parse_hid_id("0005:0000057E:00000306"), Some((0x057E, 0x0306)));
        assert_eq!(parse_hid_id("0005:0000057e:00000330\n"), Some((0x057E, 0x0330)));
    }

    #[test]
    fn test_parse_hid_id_rejects_garbage() {
        assert_eq!(parse_hid_id(""), None);
        assert_eq!(parse_hid_id("0005:057E"), None);
        assert_eq!(parse_hid_id("0005:0001057E:00000306"), None);
        assert_eq!(parse_hid_id("0005:zzzz:0306"), None);
    }
}
