// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use crate::context::Context;
use crate::error::BridgeError;
use crate::uinput::OutputSink;
use std::path::Path;
use wiimote_hid::HidTransport;

/// Maximum number of controllers bridged at the same time
pub const MAX_WIIMOTES: usize = 4;

/// Fixed set of connection slots; the slot index doubles as the player number
pub struct Registry<T: HidTransport, S: OutputSink> {
    slots: [Option<Context<T, S>>; MAX_WIIMOTES],
}

impl<T: HidTransport, S: OutputSink> Registry<T, S> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Lowest vacant slot
    pub fn free_slot(&self) -> Result<usize, BridgeError> {
        self.slots
            .iter()
            .position(Option::is_none)
            .ok_or(BridgeError::RegistryFull(MAX_WIIMOTES))
    }

    /// Build a context for the lowest vacant slot and store it.
    ///
    /// Nothing is stored when the registry is full or `build` fails.
    pub fn insert_with<F>(&mut self, build: F) -> Result<usize, BridgeError>
    where
        F: FnOnce(usize) -> Result<Context<T, S>, BridgeError>,
    {
        let slot = self.free_slot()?;
        let context = build(slot)?;
        self.slots[slot] = Some(context);
        Ok(slot)
    }

    pub fn get(&self, slot: usize) -> Option<&Context<T, S>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Context<T, S>> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Vacate a slot, handing its context back to the caller
    pub fn remove(&mut self, slot: usize) -> Option<Context<T, S>> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|ctx| ctx.path() == path))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free_slot().is_err()
    }

    /// Occupied slot indices in ascending order
    pub fn occupied(&self) -> Vec<usize> {
        (0..MAX_WIIMOTES).filter(|slot| self.slots[*slot].is_some()).collect()
    }
}

impl<T: HidTransport, S: OutputSink> Default for Registry<T, S> {
    fn default() -> Self {
        Self::new()
    }
}
