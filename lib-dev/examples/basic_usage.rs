// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use std::io;
use std::time::Duration;
use wiimote_hid::{
    enumerate_devices, process_report, CommandQueue, HidOutputCommand, HidTransport, HidrawDevice,
    RequestStatus, SetLeds, SetReportMode, WiimoteState, READ_BUFFER_SIZE, WIIMOTE_PLUS_PRODUCT_ID,
    WIIMOTE_PRODUCT_ID, WIIMOTE_VENDOR_ID,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let ids = [
        (WIIMOTE_VENDOR_ID, WIIMOTE_PRODUCT_ID),
        (WIIMOTE_VENDOR_ID, WIIMOTE_PLUS_PRODUCT_ID),
    ];
    let Some(info) = enumerate_devices(&ids)?.into_iter().next() else {
        println!("No Wiimote found");
        return Ok(());
    };
    println!("Using {}", info.path.display());

    let mut device = HidrawDevice::open(&info.path)?;
    let mut state = WiimoteState::new();
    let mut queue = CommandQueue::new();

    // Player 1 LED, buttons plus extension, then a status request
    let leds = SetLeds::for_slot(0);
    let mode = SetReportMode::default();
    let bring_up: [&dyn HidOutputCommand; 3] = [&leds, &mode, &RequestStatus];
    for command in bring_up {
        queue.enqueue(command.to_frame()?)?;
    }

    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
        // The device is non-blocking, so retry a frame until it goes out.
        while let Some(frame) = queue.peek() {
            match device.send(frame.as_bytes()) {
                Ok(_) => {
                    queue.dequeue()?;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        match device.recv(&mut buffer) {
            Ok(0) => {
                println!("Device disconnected");
                return Ok(());
            }
            Ok(size) => match process_report(&buffer[..size], &mut state, &mut queue) {
                Ok(()) => println!("{}", state),
                Err(e) => eprintln!("Failed to decode report: {}", e),
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(e) => return Err(e.into()),
        }
    }
}
