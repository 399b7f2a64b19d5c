// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

//! The event loop.
//!
//! One thread waits on the hot-plug source, an optional waker and every
//! connected controller. Each readiness notification is handled to completion
//! before the next one, so contexts are never touched concurrently.

use crate::config::{Config, VirtualDeviceConfig};
use crate::context::{Context, ReadOutcome};
use crate::error::BridgeError;
use crate::hotplug::{HotplugAction, HotplugSource};
use crate::poller::{Event, Interest, Poller, Waker};
use crate::registry::{Registry, MAX_WIIMOTES};
use crate::uinput::{OutputSink, UinputDevice};
use log::{debug, error, info, warn};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiimote_hid::{DeviceInfo, HidTransport, HidrawDevice};

pub const HOTPLUG_TOKEN: u64 = u64::MAX;
pub const WAKER_TOKEN: u64 = u64::MAX - 1;

/// Opens transports and creates sinks for newly attached controllers
pub trait Backend {
    type Transport: HidTransport;
    type Sink: OutputSink;

    fn open(&mut self, path: &Path) -> Result<Self::Transport, BridgeError>;

    fn create_sink(&mut self, slot: usize) -> Result<Self::Sink, BridgeError>;
}

/// hidraw transports and uinput gamepads
pub struct LinuxBackend {
    uinput_path: PathBuf,
    virtual_device: VirtualDeviceConfig,
}

impl LinuxBackend {
    pub fn new(uinput_path: impl Into<PathBuf>, virtual_device: VirtualDeviceConfig) -> Self {
        Self {
            uinput_path: uinput_path.into(),
            virtual_device,
        }
    }
}

impl Backend for LinuxBackend {
    type Transport = HidrawDevice;
    type Sink = UinputDevice;

    fn open(&mut self, path: &Path) -> Result<HidrawDevice, BridgeError> {
        Ok(HidrawDevice::open(path)?)
    }

    fn create_sink(&mut self, slot: usize) -> Result<UinputDevice, BridgeError> {
        debug!("Creating virtual gamepad for slot {}", slot);
        UinputDevice::create(&self.uinput_path, &self.virtual_device)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorSettings {
    pub device_ids: Vec<(u16, u16)>,
    pub poll_timeout: Duration,
    pub max_events: usize,
    pub continuous_reporting: bool,
}

impl From<&Config> for ReactorSettings {
    fn from(config: &Config) -> Self {
        Self {
            device_ids: config.device_ids(),
            poll_timeout: config.reactor.poll_timeout(),
            max_events: config.reactor.max_events,
            continuous_reporting: config.reactor.continuous_reporting,
        }
    }
}

impl Default for ReactorSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

pub struct Reactor<P: Poller, B: Backend, H: HotplugSource> {
    poller: P,
    backend: B,
    hotplug: H,
    waker: Option<Arc<Waker>>,
    registry: Registry<B::Transport, B::Sink>,
    settings: ReactorSettings,
}

impl<P: Poller, B: Backend, H: HotplugSource> Reactor<P, B, H> {
    pub fn new(
        mut poller: P,
        backend: B,
        hotplug: H,
        settings: ReactorSettings,
    ) -> Result<Self, BridgeError> {
        poller.add(hotplug.as_raw_fd(), HOTPLUG_TOKEN, Interest::READABLE)?;
        info!("Hot-plug monitor added to poller");
        Ok(Self {
            poller,
            backend,
            hotplug,
            waker: None,
            registry: Registry::new(),
            settings,
        })
    }

    /// Let another thread interrupt [`Reactor::run`] through `waker`
    pub fn with_waker(mut self, waker: Arc<Waker>) -> Result<Self, BridgeError> {
        self.poller
            .add(waker.as_raw_fd(), WAKER_TOKEN, Interest::READABLE)?;
        self.waker = Some(waker);
        Ok(self)
    }

    pub fn registry(&self) -> &Registry<B::Transport, B::Sink> {
        &self.registry
    }

    pub fn context(&self, slot: usize) -> Option<&Context<B::Transport, B::Sink>> {
        self.registry.get(slot)
    }

    fn is_supported(&self, vendor_id: u16, product_id: u16) -> bool {
        self.settings
            .device_ids
            .iter()
            .any(|(vid, pid)| *vid == vendor_id && *pid == product_id)
    }

    /// Offer every device found at startup to the attach path
    pub fn attach_present(&mut self, devices: &[DeviceInfo]) {
        for device in devices {
            if let Err(e) = self.attach(&device.path, device.vendor_id, device.product_id) {
                warn!("Not bridging {}: {}", device.path.display(), e);
            }
        }
    }

    /// Register a controller and queue its bring-up commands
    pub fn attach(
        &mut self,
        path: &Path,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<usize, BridgeError> {
        if !self.is_supported(vendor_id, product_id) {
            return Err(BridgeError::Unsupported {
                path: path.to_path_buf(),
                vendor_id,
                product_id,
            });
        }
        if let Some(slot) = self.registry.find_by_path(path) {
            debug!("{} is already bridged (slot {})", path.display(), slot);
            return Ok(slot);
        }

        let poller = &mut self.poller;
        let backend = &mut self.backend;
        let continuous = self.settings.continuous_reporting;
        let slot = self.registry.insert_with(|slot| {
            let transport = backend.open(path)?;
            poller.add(transport.as_raw_fd(), slot as u64, Interest::READ_WRITE_EDGE)?;
            let sink = match backend.create_sink(slot) {
                Ok(sink) => sink,
                Err(e) => {
                    if let Err(e) = poller.delete(transport.as_raw_fd()) {
                        warn!("Failed to deregister {}: {}", path.display(), e);
                    }
                    return Err(e);
                }
            };
            let mut context = Context::new(slot, transport, sink);
            context.enqueue_bring_up(continuous);
            Ok(context)
        })?;

        info!(
            "Wiimote {:04x}:{:04x} connected at {} (slot {})",
            vendor_id,
            product_id,
            path.display(),
            slot
        );
        Ok(slot)
    }

    /// Tear down a slot: sink first, then the poller registration, then the descriptor
    pub fn destroy(&mut self, slot: usize) {
        let Some(context) = self.registry.remove(slot) else {
            return;
        };
        let path = context.path().to_path_buf();
        let (transport, sink) = context.into_parts();
        drop(sink);
        if let Err(e) = self.poller.delete(transport.as_raw_fd()) {
            warn!("Failed to deregister {}: {}", path.display(), e);
        }
        drop(transport);
        info!("Wiimote at {} disconnected (slot {})", path.display(), slot);
    }

    fn handle_hotplug(&mut self) {
        let Some(event) = self.hotplug.receive() else {
            return;
        };
        info!("Hot-plug event: {:?} {}", event.action, event.path.display());
        match event.action {
            HotplugAction::Add => {
                match self.attach(&event.path, event.vendor_id, event.product_id) {
                    Ok(_) => {}
                    Err(e @ BridgeError::Unsupported { .. }) => debug!("{}", e),
                    Err(e @ BridgeError::RegistryFull(_)) => warn!("{}", e),
                    Err(e) => error!("Failed to attach {}: {}", event.path.display(), e),
                }
            }
            HotplugAction::Remove => match self.registry.find_by_path(&event.path) {
                Some(slot) => self.destroy(slot),
                None => debug!("{} was not bridged", event.path.display()),
            },
        }
    }

    fn handle_device(&mut self, event: Event) {
        let Ok(slot) = usize::try_from(event.token) else {
            return;
        };
        let Some(context) = self.registry.get_mut(slot) else {
            debug!("Event for vacant slot {}", slot);
            return;
        };

        if event.error || event.hangup {
            error!("Error on {}, disconnecting", context.path().display());
            self.destroy(slot);
            return;
        }

        if event.writable {
            context.writable = true;
        }
        context.drain_queue();

        if event.readable && context.read_reports() == ReadOutcome::Closed {
            self.destroy(slot);
        }
    }

    /// Handle a single readiness notification
    pub fn dispatch(&mut self, event: Event) {
        match event.token {
            HOTPLUG_TOKEN => self.handle_hotplug(),
            WAKER_TOKEN => {
                if let Some(waker) = &self.waker {
                    if let Err(e) = waker.reset() {
                        warn!("Failed to reset waker: {}", e);
                    }
                }
            }
            _ => self.handle_device(event),
        }
    }

    /// Wait once and dispatch whatever became ready
    pub fn poll_once(&mut self, events: &mut Vec<Event>) -> Result<usize, BridgeError> {
        let count = self
            .poller
            .wait(events, self.settings.max_events, self.settings.poll_timeout)?;
        for event in events.iter() {
            self.dispatch(*event);
        }
        Ok(count)
    }

    /// Run until `running` is cleared, then release every controller
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), BridgeError> {
        let mut events = Vec::with_capacity(self.settings.max_events);
        let result = loop {
            if !running.load(Ordering::SeqCst) {
                break Ok(());
            }
            if let Err(e) = self.poll_once(&mut events) {
                error!("Poller wait failed: {}", e);
                break Err(e);
            }
        };
        self.shutdown();
        result
    }

    /// Destroy every remaining context in slot order
    pub fn shutdown(&mut self) {
        for slot in 0..MAX_WIIMOTES {
            self.destroy(slot);
        }
    }
}
