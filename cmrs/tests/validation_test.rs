//! Tests for input validation.
//!
//! These tests verify that invalid inputs are rejected before any D-Bus
//! call is made.

use cmrs::{ConnectionError, Ipv4Settings, ProxySettings, split_list, validate_tethering};

#[test]
fn tethering_identifier_bounds() {
    assert!(validate_tethering("a", "password").is_ok());
    assert!(validate_tethering(&"a".repeat(32), "password").is_ok());
    assert!(matches!(
        validate_tethering(&"a".repeat(33), "password"),
        Err(ConnectionError::InvalidInput(_))
    ));
    assert!(validate_tethering("", "password").is_err());
}

#[test]
fn tethering_identifier_counts_bytes() {
    // 11 three-byte characters = 33 bytes.
    let ssid = "\u{20ac}".repeat(11);
    assert!(validate_tethering(&ssid, "password").is_err());
}

#[test]
fn tethering_passphrase_bounds() {
    assert!(validate_tethering("ap", "1234567").is_err());
    assert!(validate_tethering("ap", "12345678").is_ok());
    assert!(validate_tethering("ap", &"x".repeat(63)).is_ok());
    assert!(validate_tethering("ap", &"x".repeat(64)).is_err());
}

#[test]
fn server_lists_are_split_on_any_separator() {
    assert_eq!(
        split_list("ntp1.example.com ntp2.example.com,ntp3"),
        vec!["ntp1.example.com", "ntp2.example.com", "ntp3"]
    );
    assert!(split_list("").is_empty());
}

#[test]
fn dhcp_config_drops_static_fields() {
    let cfg = Ipv4Settings {
        method: Some("dhcp".into()),
        address: Some("10.0.0.2".into()),
        netmask: Some("255.0.0.0".into()),
        gateway: Some("10.0.0.1".into()),
    };
    let map = cfg.to_map();
    assert_eq!(map.str("Method"), Some("dhcp"));
    assert!(!map.contains("Address"));
}

#[test]
fn manual_proxy_keeps_servers() {
    let cfg = ProxySettings {
        method: Some("manual".into()),
        url: None,
        servers: vec!["proxy:3128".into()],
        excludes: vec!["localhost".into()],
    };
    let map = cfg.to_map();
    assert_eq!(map.str("Method"), Some("manual"));
    assert_eq!(map.str_list("Servers"), vec!["proxy:3128"]);
    assert_eq!(map.str_list("Excludes"), vec!["localhost"]);
}
