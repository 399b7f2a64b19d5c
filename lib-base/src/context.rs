// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use crate::uinput::OutputSink;
use log::{debug, error, info, warn};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use wiimote_hid::{
    process_report, CommandQueue, HidOutputCommand, HidTransport, RequestStatus, SetLeds,
    SetReportMode, WiimoteState, READ_BUFFER_SIZE,
};

/// Result of draining the readable side of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// No more data for now
    Drained,
    /// End of stream or a hard error; the connection must be torn down
    Closed,
}

/// Everything owned by one connected controller
pub struct Context<T: HidTransport, S: OutputSink> {
    pub slot: usize,
    pub path: PathBuf,
    /// Set on a writable notification, cleared when a send would block
    pub writable: bool,
    pub state: WiimoteState,
    pub queue: CommandQueue,
    sink: S,
    transport: T,
}

impl<T: HidTransport, S: OutputSink> Context<T, S> {
    pub fn new(slot: usize, transport: T, sink: S) -> Self {
        Self {
            slot,
            path: transport.path().to_path_buf(),
            writable: false,
            state: WiimoteState::new(),
            queue: CommandQueue::new(),
            sink,
            transport,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fd(&self) -> RawFd {
        self.transport.as_raw_fd()
    }

    /// Player LED for the slot, extension reporting mode, then a status request
    pub fn enqueue_bring_up(&mut self, continuous: bool) {
        let leds = SetLeds::for_slot(self.slot);
        let mode = SetReportMode::default().continuous(continuous);
        let commands: [&dyn HidOutputCommand; 3] = [&leds, &mode, &RequestStatus];

        for command in commands {
            match command.to_frame() {
                Ok(frame) => {
                    if let Err(e) = self.queue.enqueue(frame) {
                        warn!("{}: {}, dropping {:?}", self.path.display(), e, command);
                    }
                }
                Err(e) => error!("Cannot build {:?}: {}", command, e),
            }
        }
    }

    /// Send queued frames in order while the descriptor accepts them
    pub fn drain_queue(&mut self) {
        while self.writable {
            let Some(frame) = self.queue.peek() else {
                break;
            };
            match self.transport.send(frame.as_bytes()) {
                Ok(written) if written == frame.len() => match self.queue.dequeue() {
                    Ok(sent) => debug!("Sent {:?} to {}", sent, self.path.display()),
                    Err(e) => {
                        error!("{}: {}", self.path.display(), e);
                        break;
                    }
                },
                Ok(written) => {
                    error!(
                        "Short write to {} ({} of {} bytes), keeping frame",
                        self.path.display(),
                        written,
                        frame.len()
                    );
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    debug!("{} not ready for writing", self.path.display());
                    self.writable = false;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Failed to write to {}: {}", self.path.display(), e);
                    break;
                }
            }
        }
    }

    /// Read and decode reports until the descriptor runs dry
    pub fn read_reports(&mut self) -> ReadOutcome {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            match self.transport.recv(&mut buffer) {
                Ok(0) => {
                    info!("End of stream on {}", self.path.display());
                    return ReadOutcome::Closed;
                }
                Ok(size) => {
                    if let Err(e) =
                        process_report(&buffer[..size], &mut self.state, &mut self.queue)
                    {
                        error!("Failed to handle report from {}: {}", self.path.display(), e);
                        // Core buttons still count when only the extension part failed.
                        if !e.core_state_applied() {
                            continue;
                        }
                    }
                    if let Err(e) = self.sink.emit(&self.state) {
                        error!("Failed to emit state for {}: {}", self.path.display(), e);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return ReadOutcome::Drained,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Failed to read from {}: {}", self.path.display(), e);
                    return ReadOutcome::Closed;
                }
            }
        }
    }

    /// Split into transport and sink so they can be released in order
    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.sink)
    }
}
