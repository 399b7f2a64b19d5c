// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

//! Readiness multiplexing over epoll, plus an eventfd used to interrupt a wait.

use std::fmt;
use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

/// Which readiness changes a descriptor is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub readable: bool,
    pub writable: bool,
    pub edge_triggered: bool,
}

impl Interest {
    /// Level-triggered read readiness
    pub const READABLE: Interest = Interest {
        readable: true,
        writable: false,
        edge_triggered: false,
    };

    /// Edge-triggered read and write readiness
    pub const READ_WRITE_EDGE: Interest = Interest {
        readable: true,
        writable: true,
        edge_triggered: true,
    };
}

/// One readiness notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Event {
    pub token: u64,
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
    pub hangup: bool,
}

pub trait Poller {
    fn add(&mut self, fd: RawFd, token: u64, interest: Interest) -> io::Result<()>;

    fn delete(&mut self, fd: RawFd) -> io::Result<()>;

    /// Block until at least one registered descriptor is ready or `timeout` passes.
    ///
    /// `events` is cleared first. An interrupted wait yields zero events.
    fn wait(
        &mut self,
        events: &mut Vec<Event>,
        max_events: usize,
        timeout: Duration,
    ) -> io::Result<usize>;
}

fn cvt(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

pub struct Epoll {
    fd: OwnedFd,
    /// Kernel-side event buffer, grown to the largest `max_events` seen
    buffer: Vec<libc::epoll_event>,
}

impl Epoll {
    pub fn new() -> io::Result<Self> {
        // SAFETY: epoll_create1 has no memory preconditions.
        let fd = cvt(unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) })?;
        // SAFETY: fd was just returned by the kernel and is owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self {
            fd,
            buffer: Vec::new(),
        })
    }
}

impl fmt::Debug for Epoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Epoll")
            .field("fd", &self.fd)
            .field("buffer", &self.buffer.len())
            .finish()
    }
}

impl Poller for Epoll {
    fn add(&mut self, fd: RawFd, token: u64, interest: Interest) -> io::Result<()> {
        let mut flags = 0u32;
        if interest.readable {
            flags |= libc::EPOLLIN as u32;
        }
        if interest.writable {
            flags |= libc::EPOLLOUT as u32;
        }
        if interest.edge_triggered {
            flags |= libc::EPOLLET as u32;
        }
        let mut event = libc::epoll_event {
            events: flags,
            u64: token,
        };
        // SAFETY: event is a valid epoll_event for the duration of the call.
        cvt(unsafe { libc::epoll_ctl(self.fd.as_raw_fd(), libc::EPOLL_CTL_ADD, fd, &mut event) })?;
        Ok(())
    }

    fn delete(&mut self, fd: RawFd) -> io::Result<()> {
        // SAFETY: a null event pointer is allowed for EPOLL_CTL_DEL.
        cvt(unsafe {
            libc::epoll_ctl(
                self.fd.as_raw_fd(),
                libc::EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            )
        })?;
        Ok(())
    }

    fn wait(
        &mut self,
        events: &mut Vec<Event>,
        max_events: usize,
        timeout: Duration,
    ) -> io::Result<usize> {
        events.clear();
        let max_events = max_events.max(1);
        if self.buffer.len() < max_events {
            self.buffer
                .resize(max_events, libc::epoll_event { events: 0, u64: 0 });
        }
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: buffer holds at least max_events initialised entries.
        let rc = unsafe {
            libc::epoll_wait(
                self.fd.as_raw_fd(),
                self.buffer.as_mut_ptr(),
                max_events as libc::c_int,
                timeout_ms,
            )
        };
        let count = match cvt(rc) {
            Ok(count) => count as usize,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(e) => return Err(e),
        };

        for entry in &self.buffer[..count] {
            let flags = entry.events;
            let token = entry.u64;
            events.push(Event {
                token,
                readable: flags & libc::EPOLLIN as u32 != 0,
                writable: flags & libc::EPOLLOUT as u32 != 0,
                error: flags & libc::EPOLLERR as u32 != 0,
                hangup: flags & libc::EPOLLHUP as u32 != 0,
            });
        }
        Ok(count)
    }
}

/// Counter descriptor that becomes readable once [`Waker::wake`] is called
#[derive(Debug)]
pub struct Waker {
    fd: OwnedFd,
}

impl Waker {
    pub fn new() -> io::Result<Self> {
        // SAFETY: eventfd has no memory preconditions.
        let fd = cvt(unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) })?;
        // SAFETY: fd was just returned by the kernel and is owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self { fd })
    }

    pub fn wake(&self) -> io::Result<()> {
        let value: u64 = 1;
        // SAFETY: writes exactly 8 bytes from a live u64.
        let rc = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                &value as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Consume pending wake-ups so the descriptor stops being readable
    pub fn reset(&self) -> io::Result<()> {
        let mut value: u64 = 0;
        // SAFETY: reads exactly 8 bytes into a live u64.
        let rc = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &mut value as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::WouldBlock {
                return Err(err);
            }
        }
        Ok(())
    }
}

impl AsRawFd for Waker {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
