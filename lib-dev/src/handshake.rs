// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

//! Extension handshake.
//!
//! An extension plugged into the expansion port has to be unlocked with two
//! register writes before its 6-byte signature can be read back:
//!
//! ```text
//! None --status(ext)--> AwaitingDecrypt1 --ack--> AwaitingDecrypt2 --ack--> Decrypted
//! Decrypted --signature--> Nunchuck | ClassicController | Unknown
//! any --status(no ext)--> None
//! ```
//!
//! A write acknowledged with an error leaves the phase where it is. The handshake
//! restarts on the next detach/attach cycle.

use crate::constants::{
    CLASSIC_CONTROLLER_SIGNATURE, CLASSIC_DATA_FORMAT, EXT_SIGNATURE_SIZE, NUNCHUCK_SIGNATURE,
    REG_EXT_DATA_FORMAT, REG_EXT_SIGNATURE,
};
use crate::hid_commands::{HidOutCommand, HidOutputCommand, ReadRegister, WriteRegister};
use crate::input_reports::{
    decode_extension, Acknowledge, InputReport, ProtocolError, ReadReply, StatusReply,
};
use crate::queue::CommandQueue;
use crate::state::{ExtensionPhase, WiimoteState};
use log::{debug, error, info, warn};
use std::fmt;

const SIGNATURE_OFFSET: u16 = (REG_EXT_SIGNATURE & 0xFFFF) as u16;
const DATA_FORMAT_OFFSET: u16 = (REG_EXT_DATA_FORMAT & 0xFFFF) as u16;

/// Decode one raw report into `state`, queueing any follow-up commands.
///
/// On error nothing in `state` has been changed, except for the core buttons
/// of a report whose extension part could not be decoded.
pub fn process_report(
    buffer: &[u8],
    state: &mut WiimoteState,
    queue: &mut CommandQueue,
) -> Result<(), ProtocolError> {
    let report = InputReport::parse(buffer)?;

    match report {
        InputReport::Buttons(buttons) => {
            state.buttons = buttons;
            Ok(())
        }
        InputReport::ButtonsExtension { buttons, extension } => {
            state.buttons = buttons;
            decode_extension(extension, state)
        }
        InputReport::Extension(extension) => decode_extension(extension, state),
        InputReport::Status(status) => {
            handle_status(status, state, queue);
            Ok(())
        }
        InputReport::Acknowledge(ack) => {
            handle_acknowledge(ack, state, queue);
            Ok(())
        }
        InputReport::ReadReply(reply) => {
            handle_read_reply(reply, state, queue);
            Ok(())
        }
    }
}

/// Queue a command, logging when it has to be dropped
fn enqueue<C: HidOutputCommand + fmt::Display>(queue: &mut CommandQueue, command: C) -> bool {
    let frame = match command.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            error!("Cannot build {}: {}", command, e);
            return false;
        }
    };
    match queue.enqueue(frame) {
        Ok(()) => {
            debug!("Enqueued {}", command);
            true
        }
        Err(e) => {
            warn!("{}, dropping {}", e, command);
            false
        }
    }
}

fn handle_status(status: StatusReply, state: &mut WiimoteState, queue: &mut CommandQueue) {
    state.initialized = true;
    state.buttons = status.buttons;
    state.status_flags = status.flags;
    state.battery = status.battery;
    debug!(
        "Status: battery {}{}, LEDs {:#03x}, speaker {}, IR {}",
        status.battery,
        if status.flags.battery_low() { " (low)" } else { "" },
        status.flags.leds(),
        if status.flags.speaker_enabled() { "on" } else { "off" },
        if status.flags.ir_enabled() { "on" } else { "off" },
    );

    if status.flags.extension_connected() {
        if state.extension == ExtensionPhase::None {
            info!("Connection to extension detected");
            if enqueue(queue, WriteRegister::decrypt_phase1()) {
                state.extension = ExtensionPhase::AwaitingDecrypt1;
                info!("Started extension decryption process");
            } else {
                error!("Failed to enqueue extension decryption request");
            }
        }
    } else if state.extension != ExtensionPhase::None {
        info!("Disconnection from extension detected ({})", state.extension);
        state.reset_extension();
    }
}

fn handle_acknowledge(ack: Acknowledge, state: &mut WiimoteState, queue: &mut CommandQueue) {
    state.buttons = ack.buttons;

    if ack.error != 0 {
        error!(
            "Wiimote sent error {:#04x} for command {:#04x} (extension: {})",
            ack.error, ack.command, state.extension
        );
        return;
    }
    if ack.command != HidOutCommand::WriteRegister as u8 {
        return;
    }

    match state.extension {
        ExtensionPhase::AwaitingDecrypt1 => {
            info!("Extension decryption phase 1 write acknowledged");
            if enqueue(queue, WriteRegister::decrypt_phase2()) {
                state.extension = ExtensionPhase::AwaitingDecrypt2;
            } else {
                error!("Failed to enqueue extension decryption phase 2 write");
            }
        }
        ExtensionPhase::AwaitingDecrypt2 => {
            info!("Extension decryption phase 2 write acknowledged");
            if enqueue(queue, ReadRegister::extension_signature()) {
                state.extension = ExtensionPhase::Decrypted;
            } else {
                error!("Failed to enqueue extension detection read");
            }
        }
        ExtensionPhase::ClassicController if state.classic.data_format == 0 => {
            info!("Classic Controller data format write acknowledged");
            state.classic.data_format = CLASSIC_DATA_FORMAT;
            enqueue(queue, ReadRegister::classic_data_format());
        }
        _ => debug!("Write acknowledged (extension: {})", state.extension),
    }
}

fn handle_read_reply(reply: ReadReply<'_>, state: &mut WiimoteState, queue: &mut CommandQueue) {
    state.buttons = reply.buttons;

    if reply.offset == SIGNATURE_OFFSET
        && reply.size == EXT_SIGNATURE_SIZE as usize
        && state.extension == ExtensionPhase::Decrypted
    {
        let signature = reply
            .data
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        info!("Extension signature: {:012x}", signature);

        match signature {
            NUNCHUCK_SIGNATURE => {
                info!("Nunchuck extension detected");
                state.extension = ExtensionPhase::Nunchuck;
            }
            CLASSIC_CONTROLLER_SIGNATURE => {
                info!("Classic Controller extension detected");
                if enqueue(queue, WriteRegister::classic_data_format()) {
                    state.extension = ExtensionPhase::ClassicController;
                } else {
                    error!("Failed to enqueue Classic Controller data format write");
                }
            }
            _ => {
                warn!("Unknown extension detected. Signature: {:012x}", signature);
                state.extension = ExtensionPhase::Unknown;
            }
        }
    } else if reply.offset == DATA_FORMAT_OFFSET
        && reply.size == 1
        && state.extension == ExtensionPhase::ClassicController
    {
        state.classic.data_format = reply.data[0];
        info!("Classic Controller data format set to {:#04x}", reply.data[0]);
    } else {
        debug!(
            "Ignoring read reply for register {:#06x} (extension: {})",
            reply.offset, state.extension
        );
    }
}
