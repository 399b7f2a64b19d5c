// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use wiimote_hid::*;

fn status(flags: u8) -> Vec<u8> {
    vec![0x20, 0x00, 0x00, flags, 0x00, 0x00, 0xA0]
}

fn write_ack(error: u8) -> Vec<u8> {
    vec![0x22, 0x00, 0x00, 0x16, error]
}

fn read_reply(offset: u16, data: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0x21, 0x00, 0x00, ((data.len() as u8 - 1) << 4)];
    buffer.extend(offset.to_be_bytes());
    buffer.extend(data);
    buffer.resize(22, 0);
    buffer
}

fn drain(queue: &mut CommandQueue) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    while let Ok(frame) = queue.dequeue() {
        frames.push(frame.as_bytes().to_vec());
    }
    frames
}

fn run(reports: &[Vec<u8>], state: &mut WiimoteState, queue: &mut CommandQueue) {
    for report in reports {
        process_report(report, state, queue).unwrap();
    }
}

    #[test]
    fn test_status_starts_decryption() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();

        process_report(&status(0x12), &mut state, &mut queue).unwrap();

        assert!(state.initialized);
        assert_eq!(state.battery, 0xA0);
        assert_eq!(state.extension, ExtensionPhase::AwaitingDecrypt1);
        assert_eq!(
            drain(&mut queue),
            vec![WriteRegister::decrypt_phase1().to_buffer()]
        );
    }

    #[test]
    fn test_repeated_status_does_not_restart() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();

        run(&[status(0x02), status(0x02)], &mut state, &mut queue);

        assert_eq!(state.extension, ExtensionPhase::AwaitingDecrypt1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_status_without_extension_stays_idle() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();

        process_report(&status(0x10), &mut state, &mut queue).unwrap();

        assert_eq!(state.extension, ExtensionPhase::None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_detach_resets_from_any_phase() {
        let phases = [
            ExtensionPhase::AwaitingDecrypt1,
            ExtensionPhase::AwaitingDecrypt2,
            ExtensionPhase::Decrypted,
            ExtensionPhase::Unknown,
            ExtensionPhase::Nunchuck,
            ExtensionPhase::ClassicController,
        ];
        for phase in phases {
            let mut state = WiimoteState::new();
            let mut queue = CommandQueue::new();
            state.extension = phase;
            state.nunchuck.z = true;
            state.classic.data_format = 1;

            process_report(&status(0x00), &mut state, &mut queue).unwrap();

            assert_eq!(state.extension, ExtensionPhase::None, "from {:?}", phase);
            assert_eq!(state.nunchuck, NunchuckState::default());
            assert_eq!(state.classic, ClassicControllerState::default());
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_decryption_ack_chain() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();

        process_report(&status(0x02), &mut state, &mut queue).unwrap();
        drain(&mut queue);

        process_report(&write_ack(0), &mut state, &mut queue).unwrap();
        assert_eq!(state.extension, ExtensionPhase::AwaitingDecrypt2);
        assert_eq!(
            drain(&mut queue),
            vec![WriteRegister::decrypt_phase2().to_buffer()]
        );

        process_report(&write_ack(0), &mut state, &mut queue).unwrap();
        assert_eq!(state.extension, ExtensionPhase::Decrypted);
        assert_eq!(
            drain(&mut queue),
            vec![ReadRegister::extension_signature().to_buffer()]
        );
    }

    #[test]
    fn test_nunchuck_identified() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.extension = ExtensionPhase::Decrypted;

        let reply = read_reply(0x00FA, &[0x00, 0x00, 0xA4, 0x20, 0x00, 0x00]);
        process_report(&reply, &mut state, &mut queue).unwrap();

        assert_eq!(state.extension, ExtensionPhase::Nunchuck);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_classic_controller_identified() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.extension = ExtensionPhase::Decrypted;

        let reply = read_reply(0x00FA, &[0x00, 0x00, 0xA4, 0x20, 0x01, 0x01]);
        process_report(&reply, &mut state, &mut queue).unwrap();

        assert_eq!(state.extension, ExtensionPhase::ClassicController);
        assert_eq!(
            drain(&mut queue),
            vec![WriteRegister::classic_data_format().to_buffer()]
        );
    }

    #[test]
    fn test_classic_controller_data_format_confirmed() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.extension = ExtensionPhase::ClassicController;

        process_report(&write_ack(0), &mut state, &mut queue).unwrap();
        assert_eq!(state.classic.data_format, 1);
        assert_eq!(
            drain(&mut queue),
            vec![ReadRegister::classic_data_format().to_buffer()]
        );

        process_report(&read_reply(0x00FE, &[0x03]), &mut state, &mut queue).unwrap();
        assert_eq!(state.classic.data_format, 3);

        // Reports in an unsupported format are rejected without touching the sticks.
        let report = [0x32, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0, 0];
        assert_eq!(
            process_report(&report, &mut state, &mut queue),
            Err(ProtocolError::UnsupportedDataFormat(3))
        );
        assert_eq!(state.classic.left_x, ANALOG_CENTER);
    }

    #[test]
    fn test_unknown_extension() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.extension = ExtensionPhase::Decrypted;

        let reply = read_reply(0x00FA, &[0x01, 0x00, 0xA4, 0x20, 0x01, 0x03]);
        process_report(&reply, &mut state, &mut queue).unwrap();

        assert_eq!(state.extension, ExtensionPhase::Unknown);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_signature_ignored_outside_decrypted() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.extension = ExtensionPhase::AwaitingDecrypt2;

        let reply = read_reply(0x00FA, &[0x00, 0x00, 0xA4, 0x20, 0x00, 0x00]);
        process_report(&reply, &mut state, &mut queue).unwrap();

        assert_eq!(state.extension, ExtensionPhase::AwaitingDecrypt2);
    }

    #[test]
    fn test_ack_error_does_not_advance() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.extension = ExtensionPhase::AwaitingDecrypt1;

        process_report(&write_ack(0x04), &mut state, &mut queue).unwrap();

        assert_eq!(state.extension, ExtensionPhase::AwaitingDecrypt1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ack_for_other_command_ignored() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.extension = ExtensionPhase::AwaitingDecrypt1;

        process_report(&[0x22, 0x00, 0x00, 0x11, 0x00], &mut state, &mut queue).unwrap();

        assert_eq!(state.extension, ExtensionPhase::AwaitingDecrypt1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_does_not_advance() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        let filler = RequestStatus.to_frame().unwrap();
        while !queue.is_full() {
            queue.enqueue(filler).unwrap();
        }

        process_report(&status(0x02), &mut state, &mut queue).unwrap();
        assert_eq!(state.extension, ExtensionPhase::None);
        assert_eq!(queue.len(), QUEUE_CAPACITY);

        state.extension = ExtensionPhase::AwaitingDecrypt1;
        process_report(&write_ack(0), &mut state, &mut queue).unwrap();
        assert_eq!(state.extension, ExtensionPhase::AwaitingDecrypt1);
        assert!(queue.iter().all(|f| *f == filler));
    }

    #[test]
    fn test_nunchuck_report_end_to_end() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.extension = ExtensionPhase::Nunchuck;

        let report = [0x32, 0x00, 0x08, 128, 64, 0, 0, 0, 0xFC, 0, 0];
        process_report(&report, &mut state, &mut queue).unwrap();

        assert!(state.buttons.a());
        assert_eq!(state.nunchuck.stick_x, 513);
        assert_eq!(state.nunchuck.stick_y, 256);
        assert!(state.nunchuck.z);
        assert!(state.nunchuck.c);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_nunchuck_handshake() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();

        run(
            &[
                status(0x12),
                write_ack(0),
                write_ack(0),
                read_reply(0x00FA, &[0x00, 0x00, 0xA4, 0x20, 0x00, 0x00]),
            ],
            &mut state,
            &mut queue,
        );

        assert_eq!(state.extension, ExtensionPhase::Nunchuck);
        assert_eq!(queue.len(), 3);

        process_report(&status(0x10), &mut state, &mut queue).unwrap();
        assert_eq!(state.extension, ExtensionPhase::None);
    }

    #[test]
    fn test_decode_error_keeps_state() {
        let mut state = WiimoteState::new();
        let mut queue = CommandQueue::new();
        state.battery = 42;

        assert!(process_report(&[0x20, 0x00], &mut state, &mut queue).is_err());
        assert!(process_report(&[0x99], &mut state, &mut queue).is_err());

        assert_eq!(state.battery, 42);
        assert!(!state.initialized);
    }
