// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

//! Bounded outbound command queue.
//!
//! Every connection owns one [`CommandQueue`]. Frames are appended by the protocol
//! handlers while a batch of input is processed and drained by the reactor on the
//! next writable notification, so both ends always run on the same thread.

use crate::constants::{MAX_FRAME_SIZE, QUEUE_CAPACITY};
use std::fmt;

/// Errors raised when building a frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Frame too long: {len} bytes (max {max})", max = MAX_FRAME_SIZE)]
    TooLong { len: usize },
}

/// Errors raised by queue operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Command queue full")]
    Full,

    #[error("Command queue empty")]
    Empty,
}

/// A single outbound report, stored inline
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; MAX_FRAME_SIZE],
    len: usize,
}

impl Frame {
    pub fn new(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(FrameError::TooLong { len: bytes.len() });
        }
        let mut buf = [0u8; MAX_FRAME_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            buf,
            len: bytes.len(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Report id (first byte) of the frame
    pub fn report_id(&self) -> Option<u8> {
        self.as_bytes().first().copied()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:02x?})", self.as_bytes())
    }
}

/// Fixed-capacity FIFO of frames backed by a ring buffer
#[derive(Clone)]
pub struct CommandQueue {
    frames: [Frame; QUEUE_CAPACITY],
    head: usize,
    tail: usize,
    count: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        let empty = Frame {
            buf: [0u8; MAX_FRAME_SIZE],
            len: 0,
        };
        Self {
            frames: [empty; QUEUE_CAPACITY],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Append a frame at the tail
    pub fn enqueue(&mut self, frame: Frame) -> Result<(), QueueError> {
        if self.count == QUEUE_CAPACITY {
            return Err(QueueError::Full);
        }
        self.frames[self.tail] = frame;
        self.tail = (self.tail + 1) % QUEUE_CAPACITY;
        self.count += 1;
        Ok(())
    }

    /// Remove and return the head frame
    pub fn dequeue(&mut self) -> Result<Frame, QueueError> {
        if self.count == 0 {
            return Err(QueueError::Empty);
        }
        let frame = self.frames[self.head];
        self.head = (self.head + 1) % QUEUE_CAPACITY;
        self.count -= 1;
        Ok(frame)
    }

    /// Head frame without removing it
    pub fn peek(&self) -> Option<&Frame> {
        if self.count == 0 {
            None
        } else {
            Some(&self.frames[self.head])
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == QUEUE_CAPACITY
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Iterate over the queued frames in FIFO order
    pub fn iter(&self) -> impl Iterator<Item = &Frame> + '_ {
        (0..self.count).map(move |i| &self.frames[(self.head + i) % QUEUE_CAPACITY])
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
