//! Integration tests for configuration validation

#![allow(clippy::expect_used)]

use relay_core::config::{RelayConfig, MAX_FRAME_SIZE};
use std::time::Duration;

#[test]
fn test_default_config_validates() {
    let config = RelayConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_invalid_listener_address() {
    let mut config = RelayConfig::default();
    config.listener.address = "not_an_address".to_string();

    let errors = config.validate();
    assert!(!errors.is_empty(), "Should have validation errors");
    assert!(errors.iter().any(|e| e.contains("Invalid listener address")));
}

#[test]
fn test_empty_listener_address() {
    let mut config = RelayConfig::default();
    config.listener.address = String::new();

    let errors = config.validate();
    assert!(!errors.is_empty());
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_empty_remote_host() {
    let mut config = RelayConfig::default();
    config.remote.host = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Remote host cannot be empty")));
}

#[test]
fn test_zero_remote_port() {
    let mut config = RelayConfig::default();
    config.remote.port = 0;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Remote port cannot be 0")));
}

#[test]
fn test_connect_timeout_bounds() {
    let mut config = RelayConfig::default();
    config.remote.connect_timeout = Duration::from_millis(10);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Connect timeout too short")));

    config.remote.connect_timeout = Duration::from_secs(600);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Connect timeout too long")));
}

#[test]
fn test_tiny_max_frame_size_rejected() {
    let mut config = RelayConfig::default();
    config.relay.max_frame_size = 16;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Max frame size too small")));
}

#[test]
fn test_zero_event_buffer_rejected() {
    let mut config = RelayConfig::default();
    config.relay.event_buffer = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Event buffer capacity must be greater than 0")));
}

#[test]
fn test_empty_chat_kind_rejected() {
    let mut config = RelayConfig::default();
    config.relay.chat_kinds.push(String::new());

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Chat kinds cannot contain empty strings")));
}

#[test]
fn test_validate_strict_formats_all_errors() {
    let mut config = RelayConfig::default();
    config.listener.address = String::new();
    config.remote.port = 0;

    let result = config.validate_strict();
    assert!(result.is_err());
    let message = result.expect_err("should fail").to_string();
    assert!(message.contains("cannot be empty"));
    assert!(message.contains("Remote port"));
}

#[test]
fn test_example_config_roundtrips_through_toml() {
    let example = RelayConfig::example_config();
    let parsed = RelayConfig::from_toml(&example).expect("example config should parse");

    assert!(parsed.validate().is_empty());
    assert_eq!(parsed.relay.max_frame_size, MAX_FRAME_SIZE);
    assert_eq!(parsed.listener.address, "127.0.0.1:9339");
}

#[test]
fn test_partial_toml_uses_section_defaults() {
    let parsed = RelayConfig::from_toml(
        r#"
        [remote]
        host = "game.example.net"
        port = 9933
        connect_timeout = 5000
        "#,
    )
    .expect("partial config should parse");

    assert_eq!(parsed.remote.host, "game.example.net");
    assert_eq!(parsed.remote.port, 9933);
    assert_eq!(parsed.remote.connect_timeout, Duration::from_secs(5));
    assert_eq!(parsed.listener.address, "127.0.0.1:9339");
    assert!(!parsed.relay.chat_kinds.is_empty());
}

#[test]
fn test_default_with_overrides() {
    let config = RelayConfig::default_with_overrides(|c| {
        c.remote.port = 12345;
    });

    assert_eq!(config.remote.port, 12345);
    assert!(config.validate().is_empty());
}

#[test]
fn test_malformed_toml_is_an_error() {
    assert!(RelayConfig::from_toml("remote = {").is_err());
}

#[test]
fn test_remote_endpoint_formatting() {
    let config = RelayConfig::default_with_overrides(|c| {
        c.remote.host = "10.0.0.7".to_string();
        c.remote.port = 9933;
    });
    assert_eq!(config.remote.endpoint(), "10.0.0.7:9933");
}
