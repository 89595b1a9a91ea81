//! Controller config loading tests.
//!
//! Tests for `ControllerConfig::load()`: full file round-trip through the
//! `ConfigLoader` trait, defaults for omitted sections, validation of the
//! store geometry and timing, and rejection of unknown keys.

use gate_common::config::{ConfigError, ConfigLoader, LogLevel};
use gate_common::credential::Identifier;
use gate_common::hal::config::{ControllerConfig, SimulationEvent, WipeScope};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write a complete controller.toml in the given directory.
fn write_controller_toml(dir: &Path) {
    fs::write(
        dir.join("controller.toml"),
        r#"
driver = "simulation"

[shared]
log_level = "debug"
service_name = "front-door"

[store]
capacity = 512

[timing]
cycle_time_ms = 20
blink_ms = 100
grant_hold_ms = 1500
deny_hold_ms = 800
wipe_confirm_ms = 5000
wipe_poll_ms = 250

[wipe]
runtime_scope = "master_only"

[simulation]
image_path = "eeprom.bin"
reader_version = 145

[[simulation.events]]
kind = "scan"
at_ms = 100
id = "11:22:33:44"

[[simulation.events]]
kind = "wipe_hold"
at_ms = 4000
hold_ms = 6000
"#,
    )
    .unwrap();
}

// ─── Tests ──────────────────────────────────────────────────────────

/// Test: every section is read from disk.
#[test]
fn load_full_controller_config() {
    let tmp = TempDir::new().unwrap();
    write_controller_toml(tmp.path());

    let config = ControllerConfig::load(&tmp.path().join("controller.toml"))
        .expect("should load successfully");
    config.validate().expect("should validate");

    assert_eq!(config.driver, "simulation");
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.shared.service_name, "front-door");
    assert_eq!(config.store.capacity, 512);
    assert_eq!(config.timing.cycle_time_ms, 20);
    assert_eq!(config.timing.grant_hold_ms, 1500);
    assert_eq!(config.timing.wipe_poll().as_millis(), 250);
    assert_eq!(config.wipe.runtime_scope, WipeScope::MasterOnly);
    assert_eq!(config.simulation.reader_version, 0x91);
    assert_eq!(
        config.simulation.image_path.as_deref(),
        Some(Path::new("eeprom.bin"))
    );
    assert_eq!(config.simulation.events.len(), 2);
    assert_eq!(
        config.simulation.events[0],
        SimulationEvent::Scan {
            at_ms: 100,
            id: Identifier::new([0x11, 0x22, 0x33, 0x44]),
        }
    );
}

/// Test: missing file maps to FileNotFound.
#[test]
fn missing_file() {
    let tmp = TempDir::new().unwrap();
    let result = ControllerConfig::load(&tmp.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

/// Test: a malformed identifier in the event script is a parse error.
#[test]
fn bad_identifier_in_script() {
    let result = ControllerConfig::parse(
        r#"
[[simulation.events]]
kind = "scan"
at_ms = 0
id = "ZZ:22:33:44"
"#,
    );
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

/// Test: unknown event kinds are rejected.
#[test]
fn unknown_event_kind() {
    let result = ControllerConfig::parse(
        r#"
[[simulation.events]]
kind = "door_forced"
at_ms = 0
"#,
    );
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

/// Test: loaded configuration still goes through validation.
#[test]
fn validation_after_load() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("controller.toml"),
        "[store]\ncapacity = 4\n",
    )
    .unwrap();

    let config = ControllerConfig::load(&tmp.path().join("controller.toml")).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(_))
    ));
}

/// Test: the sample config shipped with the workspace loads and validates.
#[test]
fn test_sample_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/controller.toml");
    let config = ControllerConfig::load(&path).expect("sample config should parse");
    config.validate().expect("sample config should validate");

    assert_eq!(config.driver, "simulation");
    assert_eq!(config.simulation.reader_version, 0x92);
    assert_eq!(config.simulation.events.len(), 6);
    assert_eq!(config.wipe.runtime_scope, WipeScope::Full);
}
