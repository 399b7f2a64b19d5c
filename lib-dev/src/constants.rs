// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

/// Nintendo vendor id
pub const WIIMOTE_VENDOR_ID: u16 = 0x057E;

/// RVL-CNT-01
pub const WIIMOTE_PRODUCT_ID: u16 = 0x0306;

/// RVL-CNT-01-TR (Wii Remote Plus)
pub const WIIMOTE_PLUS_PRODUCT_ID: u16 = 0x0330;

/// Maximum size of a single outbound command frame
pub const MAX_FRAME_SIZE: usize = 32;

/// Number of frames an outbound queue can hold
pub const QUEUE_CAPACITY: usize = 16;

/// Size of the buffer used for a single hidraw read
pub const READ_BUFFER_SIZE: usize = 64;

/// Upper bound of the rescaled stick range
pub const ANALOG_MAX: u16 = 1023;

/// Upper bound of the rescaled trigger range
pub const TRIGGER_MAX: u16 = 255;

/// Centre of the rescaled stick range
pub const ANALOG_CENTER: u16 = ANALOG_MAX / 2;

/// Address space selector for the control registers
pub const ADDRESS_SPACE_REGISTERS: u8 = 0x04;

/// Extension decryption, first write (0x55 to 0xA400F0)
pub const REG_EXT_DECRYPT_1: u32 = 0xA4_00F0;
pub const EXT_DECRYPT_1_VALUE: u8 = 0x55;

/// Extension decryption, second write (0x00 to 0xA400FB)
pub const REG_EXT_DECRYPT_2: u32 = 0xA4_00FB;
pub const EXT_DECRYPT_2_VALUE: u8 = 0x00;

/// Extension identifier, 6 bytes
pub const REG_EXT_SIGNATURE: u32 = 0xA4_00FA;
pub const EXT_SIGNATURE_SIZE: u16 = 6;

/// Classic controller data format selector
pub const REG_EXT_DATA_FORMAT: u32 = 0xA4_00FE;
pub const CLASSIC_DATA_FORMAT: u8 = 0x01;

/// 48-bit extension signatures
pub const NUNCHUCK_SIGNATURE: u64 = 0x0000_A420_0000;
pub const CLASSIC_CONTROLLER_SIGNATURE: u64 = 0x0000_A420_0101;

/// Read reply error: register is write-only
pub const READ_ERROR_WRITE_ONLY: u8 = 7;

/// Read reply error: register does not exist
pub const READ_ERROR_NONEXISTENT: u8 = 8;

/// Data reporting mode that carries core buttons and 8 extension bytes
pub const DEFAULT_REPORT_MODE: u8 = 0x32;
