#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use dubhe_client::config::{self, ClientConfig};
use dubhe_core::error::DubheError;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
client:
  adress: "10.0.0.9:20880" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, DubheError::Config(_)));
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.client.address, "127.0.0.1:20880");
    assert_eq!(cfg.client.connect_timeout_ms, 3000);
    assert_eq!(cfg.client.request_timeout_ms, 5000);
    assert_eq!(cfg.client.max_payload_bytes, 8 * 1024 * 1024);
    assert_eq!(cfg.client.dubbo_version, "2.6.2");
    assert!(cfg.services.is_empty());
}

#[test]
fn full_config_round_trips() {
    let yaml = r#"
version: 1
client:
  address: "provider.internal:20880"
  connect_timeout_ms: 1500
  request_timeout_ms: 12000
  max_payload_bytes: 1048576
  dubbo_version: "2.7.8"
services:
  - alias: users
    interface: com.example.UserService
    version: "2.0.0"
  - alias: ping
    interface: com.example.PingService
"#;
    let cfg = config::load_from_str(yaml).expect("must parse");
    assert_eq!(cfg.client.address, "provider.internal:20880");
    assert_eq!(cfg.client.request_timeout_ms, 12000);
    assert_eq!(cfg.client.dubbo_version, "2.7.8");
    assert_eq!(cfg.services.len(), 2);
    assert_eq!(cfg.services[0].alias, "users");
    assert_eq!(cfg.services[0].version, "2.0.0");
    // Version falls back when an alias leaves it out.
    assert_eq!(cfg.services[1].version, "1.0.0");
}

#[test]
fn version_other_than_one_is_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(matches!(err, DubheError::Config(_)));
}

#[test]
fn missing_version_is_rejected() {
    let err = config::load_from_str("client: {}\n").expect_err("must fail");
    assert!(matches!(err, DubheError::Config(_)));
}

#[test]
fn out_of_range_timeout_is_rejected() {
    let bad = r#"
version: 1
client:
  request_timeout_ms: 5
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    match err {
        DubheError::Config(msg) => assert!(msg.contains("request_timeout_ms")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn tiny_payload_cap_is_rejected() {
    let bad = r#"
version: 1
client:
  max_payload_bytes: 16
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, DubheError::Config(_)));
}

#[test]
fn duplicate_aliases_are_rejected() {
    let bad = r#"
version: 1
services:
  - alias: users
    interface: com.example.UserService
  - alias: users
    interface: com.example.OtherService
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    match err {
        DubheError::Config(msg) => assert!(msg.contains("unique")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn defaults_match_the_empty_file_case() {
    let cfg = ClientConfig::default();
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.client.address, "127.0.0.1:20880");
}
