// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use wiimote_bridge::{Config, ReactorSettings};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.device_ids(), vec![(0x057E, 0x0306), (0x057E, 0x0330)]);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.reactor.poll_timeout_secs, 30);
        assert_eq!(config.reactor.max_events, 10);
        assert!(!config.reactor.continuous_reporting);
        assert_eq!(config.virtual_device.name, "Wiimote uinput");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
logging:
  level: debug
reactor:
  continuous_reporting: true
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(config.reactor.continuous_reporting);
        assert_eq!(config.reactor.max_events, 10);
        assert_eq!(config.device_identifications.len(), 2);
    }

    #[test]
    fn test_full_file() {
        let file = write_config(
            r#"
device_identifications:
  - vendor_id: 1406
    product_id: 816
logging:
  level: warn
  submodules:
    wiimote_hid: trace
reactor:
  poll_timeout_secs: 5
  max_events: 32
virtual_device:
  name: Player pad
  vendor_id: 4660
  product_id: 22136
"#,
        );

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.device_ids(), vec![(0x057E, 0x0330)]);
        assert_eq!(config.logging.submodules["wiimote_hid"], "trace");
        assert_eq!(config.virtual_device.name, "Player pad");
        assert_eq!(config.virtual_device.vendor_id, 0x1234);
        assert_eq!(config.virtual_device.product_id, 0x5678);

        let settings = ReactorSettings::from(&config);
        assert_eq!(settings.poll_timeout, Duration::from_secs(5));
        assert_eq!(settings.max_events, 32);
        assert_eq!(settings.device_ids, vec![(0x057E, 0x0330)]);
    }

    #[test]
    fn test_invalid_yaml() {
        let file = write_config("reactor: [not, a, map]");

        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(Config::load(Some(&dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn test_missing_named_file_uses_defaults() {
        let config = Config::load_with_name("wiimote-uinput-test-does-not-exist.yaml").unwrap();

        assert_eq!(config, Config::default());
    }
