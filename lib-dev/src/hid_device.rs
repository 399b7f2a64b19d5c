// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use hidapi::HidApi;
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Device identification information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Errors that can occur with HID operations
#[derive(Debug, thiserror::Error)]
pub enum HidError {
    #[error("Failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("ioctl {request} failed on {path}: {source}")]
    Ioctl {
        request: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("HID API error: {0}")]
    HidApiError(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A non-blocking raw HID channel
///
/// `send` and `recv` never block; an empty channel surfaces as
/// [`io::ErrorKind::WouldBlock`].
pub trait HidTransport: AsRawFd {
    fn send(&mut self, report: &[u8]) -> io::Result<usize>;

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    fn path(&self) -> &Path;
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct HidrawDevInfo {
    bustype: u32,
    vendor: i16,
    product: i16,
}

const HIDRAW_IOCTL_TYPE: u8 = b'H';
const HIDIOC_NR_GRRAWINFO: u8 = 0x03;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;
const IOC_READ: u32 = 2;

const fn ior<T>(kind: u8, nr: u8) -> libc::c_ulong {
    ((IOC_READ << IOC_DIRSHIFT)
        | ((kind as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | ((std::mem::size_of::<T>() as u32) << IOC_SIZESHIFT)) as libc::c_ulong
}

const HIDIOCGRAWINFO: libc::c_ulong = ior::<HidrawDevInfo>(HIDRAW_IOCTL_TYPE, HIDIOC_NR_GRRAWINFO);

/// A `/dev/hidrawN` node opened read/write and non-blocking
#[derive(Debug)]
pub struct HidrawDevice {
    file: File,
    path: PathBuf,
}

impl HidrawDevice {
    pub fn open(path: &Path) -> Result<Self, HidError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| HidError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Opened {} (fd {})", path.display(), file.as_raw_fd());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Query vendor and product id through HIDIOCGRAWINFO
    pub fn info(&self) -> Result<DeviceInfo, HidError> {
        let mut raw_info = HidrawDevInfo::default();
        // SAFETY: HIDIOCGRAWINFO fills a struct hidraw_devinfo, which HidrawDevInfo mirrors.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), HIDIOCGRAWINFO, &mut raw_info) };
        if rc < 0 {
            return Err(HidError::Ioctl {
                request: "HIDIOCGRAWINFO",
                path: self.path.clone(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(DeviceInfo {
            path: self.path.clone(),
            vendor_id: u16::from_ne_bytes(raw_info.vendor.to_ne_bytes()),
            product_id: u16::from_ne_bytes(raw_info.product.to_ne_bytes()),
        })
    }
}

impl HidTransport for HidrawDevice {
    fn send(&mut self, report: &[u8]) -> io::Result<usize> {
        debug!("HID TX {}: {:02x?}", self.path.display(), report);
        self.file.write(report)
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let size = self.file.read(buffer)?;
        debug!("HID RX {}: {:02x?}", self.path.display(), &buffer[..size]);
        Ok(size)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRawFd for HidrawDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// List the hidraw nodes currently present for the given (vendor, product) pairs
pub fn enumerate_devices(ids: &[(u16, u16)]) -> Result<Vec<DeviceInfo>, HidError> {
    let api = HidApi::new().map_err(|e| HidError::HidApiError(e.to_string()))?;

    let mut devices: Vec<DeviceInfo> = Vec::new();
    for device_info in api.device_list() {
        let ids_match = ids
            .iter()
            .any(|(vid, pid)| *vid == device_info.vendor_id() && *pid == device_info.product_id());
        if !ids_match {
            continue;
        }
        let path = PathBuf::from(device_info.path().to_string_lossy().into_owned());
        // hidapi lists one entry per interface/usage; a hidraw node is enough once.
        if devices.iter().any(|d| d.path == path) {
            continue;
        }
        info!(
            "Found device {:04x}:{:04x} at {}",
            device_info.vendor_id(),
            device_info.product_id(),
            path.display()
        );
        devices.push(DeviceInfo {
            path,
            vendor_id: device_info.vendor_id(),
            product_id: device_info.product_id(),
        });
    }
    Ok(devices)
}
