// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use wiimote_hid::input_reports::*;
use wiimote_hid::state::*;

    #[test]
    fn test_core_buttons() {
        let buffer = [0x30, 0x18, 0x88];
        let report = InputReport::parse(&buffer).unwrap();

        let buttons = report.buttons().unwrap();
        assert!(buttons.up());
        assert!(buttons.plus());
        assert!(buttons.a());
        assert!(buttons.home());
        assert!(!buttons.b());
        assert!(!buttons.left());
    }

    #[test]
    fn test_core_buttons_mask_unknown_bits() {
        let buffer = [0x30, 0xE0, 0x60];
        let report = InputReport::parse(&buffer).unwrap();

        assert_eq!(report.buttons().unwrap().bits(), 0);
    }

    #[test]
    fn test_accel_reports_decode_buttons_only() {
        let accel = [0x31, 0x00, 0x04, 0x80, 0x80, 0x80];
        let accel_ir = {
            let mut b = vec![0x33, 0x01, 0x00];
            b.extend([0u8; 15]);
            b
        };

        assert_eq!(
            InputReport::parse(&accel).unwrap(),
            InputReport::Buttons(CoreButtons::from_bytes([0x00, 0x04]))
        );
        assert!(InputReport::parse(&accel_ir).unwrap().buttons().unwrap().left());
    }

    #[test]
    fn test_core_ext8_offsets() {
        let buffer = [0x32, 0x00, 0x08, 1, 2, 3, 4, 5, 6, 7, 8];
        let report = InputReport::parse(&buffer).unwrap();

        match report {
            InputReport::ButtonsExtension { buttons, extension } => {
                assert!(buttons.a());
                assert_eq!(extension, &[1, 2, 3, 4, 5, 6, 7, 8]);
            }
            _ => panic!("Expected ButtonsExtension"),
        }
    }

    #[test]
    fn test_core_ir_ext_offsets() {
        let mut ir10ext9 = vec![0x36, 0x00, 0x00];
        ir10ext9.extend([0xEE; 10]);
        ir10ext9.extend([9, 8, 7, 6, 5, 4, 3, 2, 1]);

        let mut accir10ext6 = vec![0x37, 0x00, 0x00];
        accir10ext6.extend([0xEE; 13]);
        accir10ext6.extend([1, 2, 3, 4, 5, 6]);

        match InputReport::parse(&ir10ext9).unwrap() {
            InputReport::ButtonsExtension { extension, .. } => {
                assert_eq!(extension, &[9, 8, 7, 6, 5, 4, 3, 2, 1])
            }
            _ => panic!("Expected ButtonsExtension"),
        }
        match InputReport::parse(&accir10ext6).unwrap() {
            InputReport::ButtonsExtension { extension, .. } => {
                assert_eq!(extension, &[1, 2, 3, 4, 5, 6])
            }
            _ => panic!("Expected ButtonsExtension"),
        }
    }

    #[test]
    fn test_ext21_has_no_buttons() {
        let mut buffer = vec![0x3D];
        buffer.extend(0..21u8);
        let report = InputReport::parse(&buffer).unwrap();

        assert!(report.buttons().is_none());
        match report {
            InputReport::Extension(extension) => assert_eq!(extension.len(), 21),
            _ => panic!("Expected Extension"),
        }
    }

    #[test]
    fn test_status_reply() {
        let buffer = [0x20, 0x00, 0x00, 0x12, 0x00, 0x00, 0xC8];
        let report = InputReport::parse(&buffer).unwrap();

        match report {
            InputReport::Status(status) => {
                assert!(status.flags.extension_connected());
                assert!(!status.flags.battery_low());
                assert_eq!(status.flags.leds(), 0x01);
                assert!(!status.flags.speaker_enabled());
                assert!(!status.flags.ir_enabled());
                assert_eq!(status.battery, 0xC8);
            }
            _ => panic!("Expected Status"),
        }
    }

    #[test]
    fn test_read_reply_fields() {
        let mut buffer = vec![0x21, 0x00, 0x00, 0x50, 0x00, 0xFA];
        buffer.extend([0x00, 0x00, 0xA4, 0x20, 0x00, 0x00]);
        buffer.extend([0u8; 10]);

        match InputReport::parse(&buffer).unwrap() {
            InputReport::ReadReply(reply) => {
                assert_eq!(reply.size, 6);
                assert_eq!(reply.offset, 0x00FA);
                assert_eq!(reply.data, &[0x00, 0x00, 0xA4, 0x20, 0x00, 0x00]);
            }
            _ => panic!("Expected ReadReply"),
        }
    }

    #[test]
    fn test_read_reply_write_only() {
        let buffer = [0x21, 0x00, 0x00, 0x07, 0x00, 0xF0, 0, 0];

        assert_eq!(
            InputReport::parse(&buffer),
            Err(ProtocolError::WriteOnlyRegister(0x00F0))
        );
    }

    #[test]
    fn test_read_reply_nonexistent() {
        let buffer = [0x21, 0x00, 0x00, 0x58, 0x12, 0x34, 0, 0];

        assert_eq!(
            InputReport::parse(&buffer),
            Err(ProtocolError::NonexistentRegister(0x1234))
        );
    }

    #[test]
    fn test_read_reply_other_error() {
        let buffer = [0x21, 0x00, 0x00, 0x03, 0x00, 0xFA, 0, 0];

        assert_eq!(
            InputReport::parse(&buffer),
            Err(ProtocolError::ReadFailed {
                offset: 0x00FA,
                code: 3
            })
        );
    }

    #[test]
    fn test_read_reply_truncated_payload() {
        let buffer = [0x21, 0x00, 0x00, 0x50, 0x00, 0xFA, 0x00, 0x00];

        assert!(matches!(
            InputReport::parse(&buffer),
            Err(ProtocolError::InvalidLength { report: 0x21, expected: 12, actual: 8 })
        ));
    }

    #[test]
    fn test_acknowledge() {
        let buffer = [0x22, 0x00, 0x00, 0x16, 0x00];

        assert_eq!(
            InputReport::parse(&buffer).unwrap(),
            InputReport::Acknowledge(Acknowledge {
                buttons: CoreButtons::default(),
                command: 0x16,
                error: 0,
            })
        );
    }

    #[test]
    fn test_unknown_report() {
        assert_eq!(
            InputReport::parse(&[0x3E, 0, 0]),
            Err(ProtocolError::UnknownReport(0x3E))
        );
        assert_eq!(InputReport::parse(&[]), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_short_report() {
        assert!(matches!(
            InputReport::parse(&[0x32, 0x00, 0x00, 1, 2]),
            Err(ProtocolError::InvalidLength { report: 0x32, .. })
        ));
        assert!(matches!(
            InputReport::parse(&[0x20, 0x00]),
            Err(ProtocolError::InvalidLength { report: 0x20, .. })
        ));
    }

    #[test]
    fn test_nunchuck_decode() {
        let mut nunchuck = NunchuckState::default();
        decode_nunchuck(&[255, 0, 0, 0, 0, 0b0000_0010], &mut nunchuck);

        assert_eq!(nunchuck.stick_x, 1023);
        assert_eq!(nunchuck.stick_y, 0);
        assert!(nunchuck.z);
        assert!(!nunchuck.c);
    }

    #[test]
    fn test_classic_controller_decode() {
        let mut classic = ClassicControllerState {
            data_format: 1,
            ..Default::default()
        };
        let ext = [0xFF, 0x20, 0x9F, 0xE0, 0b0111_1111, 0b1110_1111];

        decode_classic_controller(&ext, &mut classic).unwrap();

        assert_eq!(classic.left_x, 1023);
        assert_eq!(classic.left_y, 519);
        assert_eq!(classic.right_x, 825);
        assert_eq!(classic.right_y, 1023);
        assert_eq!(classic.left_trigger, 57);
        assert_eq!(classic.right_trigger, 0);
        assert!(classic.dpad_right);
        assert!(classic.a);
        assert!(!classic.b);
        assert!(!classic.x);
        assert!(!classic.home);
        assert!(!classic.zl);
    }

    #[test]
    fn test_classic_controller_all_released() {
        let mut classic = ClassicControllerState {
            data_format: 1,
            ..Default::default()
        };

        decode_classic_controller(&[0, 0, 0, 0, 0xFF, 0xFF], &mut classic).unwrap();

        assert!(!classic.a && !classic.b && !classic.x && !classic.y);
        assert!(!classic.dpad_up && !classic.dpad_down);
        assert!(!classic.dpad_left && !classic.dpad_right);
        assert!(!classic.lt_click && !classic.rt_click && !classic.zl && !classic.zr);
        assert!(!classic.plus && !classic.minus && !classic.home);
    }

    #[test]
    fn test_classic_controller_unsupported_format() {
        for format in [0u8, 2, 3] {
            let mut classic = ClassicControllerState {
                data_format: format,
                ..Default::default()
            };
            let before = classic;

            assert_eq!(
                decode_classic_controller(&[0, 0, 0, 0, 0, 0], &mut classic),
                Err(ProtocolError::UnsupportedDataFormat(format))
            );
            assert_eq!(classic, before);
        }
    }

    #[test]
    fn test_decode_extension_ignored_while_pending() {
        let mut state = WiimoteState::new();
        for phase in [
            ExtensionPhase::None,
            ExtensionPhase::AwaitingDecrypt1,
            ExtensionPhase::AwaitingDecrypt2,
            ExtensionPhase::Decrypted,
            ExtensionPhase::Unknown,
        ] {
            state.extension = phase;
            decode_extension(&[1, 2, 3, 4, 5, 0], &mut state).unwrap();
            assert_eq!(state.nunchuck, NunchuckState::default());
            assert_eq!(state.classic, ClassicControllerState::default());
        }
    }

    #[test]
    fn test_core_state_applied_only_for_extension_errors() {
        assert!(ProtocolError::UnsupportedDataFormat(0).core_state_applied());

        assert!(!ProtocolError::Empty.core_state_applied());
        assert!(!ProtocolError::UnknownReport(0x99).core_state_applied());
        assert!(!ProtocolError::WriteOnlyRegister(0x00FA).core_state_applied());
        assert!(!ProtocolError::NonexistentRegister(0x00FA).core_state_applied());
        assert!(!ProtocolError::ReadFailed { offset: 0, code: 1 }.core_state_applied());
        assert!(!ProtocolError::InvalidLength {
            report: 0x32,
            expected: 9,
            actual: 4,
        }
        .core_state_applied());
    }

    #[test]
    fn test_status_flag_bits() {
        let flags = StatusFlags::new(0xFD);

        assert!(flags.battery_low());
        assert!(!flags.extension_connected());
        assert!(flags.speaker_enabled());
        assert!(flags.ir_enabled());
        assert_eq!(flags.leds(), 0x0F);
    }

    #[test]
    fn test_pending_phases() {
        assert!(ExtensionPhase::AwaitingDecrypt1.is_pending());
        assert!(ExtensionPhase::AwaitingDecrypt2.is_pending());
        assert!(ExtensionPhase::Decrypted.is_pending());
        assert!(!ExtensionPhase::None.is_pending());
        assert!(!ExtensionPhase::Unknown.is_pending());
        assert!(!ExtensionPhase::Nunchuck.is_pending());
        assert!(!ExtensionPhase::ClassicController.is_pending());
    }
