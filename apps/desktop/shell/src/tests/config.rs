// Unit tests for environment-driven configuration
// Environment variables are process-global, so every test is serial

use crate::config::{
    APP_DIR_NAME, BRIDGE_PORT_VAR, CONFIG_DIR_VAR, LOG_DIR_VAR, ShellConfig, TICK_INTERVAL_VAR,
};
use crate::error::ShellError;

use bridge_core::DEFAULT_BRIDGE_PORT;

use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;

const ALL_VARS: [&str; 4] = [BRIDGE_PORT_VAR, CONFIG_DIR_VAR, LOG_DIR_VAR, TICK_INTERVAL_VAR];

/// Run `test` with exactly `vars` set, restoring nothing else.
fn with_env(vars: &[(&str, &str)], test: impl FnOnce()) {
    // SAFETY: tests touching the environment are `#[serial]`.
    unsafe {
        for name in ALL_VARS {
            std::env::remove_var(name);
        }
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
    }

    test();

    unsafe {
        for name in ALL_VARS {
            std::env::remove_var(name);
        }
    }
}

/// **VALUE**: Verifies defaults when nothing is configured.
///
/// **WHY THIS MATTERS**: A plain launch must bind the well-known port and tick
/// once per second.
///
/// **BUG THIS CATCHES**: Would catch a default port drift away from what
/// views connect to.
#[test]
#[serial]
fn given_no_env_when_loaded_then_defaults_used() {
    with_env(&[], || {
        // WHEN: Reading the environment
        let config = ShellConfig::from_env().expect("Defaults should load");

        // THEN: Defaults
        assert_eq!(config.bridge_port, DEFAULT_BRIDGE_PORT);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        if let Some(platform_dir) = dirs::config_dir() {
            assert_eq!(config.config_dir, platform_dir.join(APP_DIR_NAME));
        }
    });
}

/// **VALUE**: Verifies every variable is honored.
///
/// **WHY THIS MATTERS**: Tests and packaged builds point the shell at their own
/// directories and an ephemeral port.
///
/// **BUG THIS CATCHES**: Would catch a variable name typo silently falling
/// back to the default.
#[test]
#[serial]
fn given_all_vars_set_when_loaded_then_values_used() {
    with_env(
        &[
            (BRIDGE_PORT_VAR, "0"),
            (CONFIG_DIR_VAR, "/tmp/desk-config"),
            (LOG_DIR_VAR, "/tmp/desk-logs"),
            (TICK_INTERVAL_VAR, "25"),
        ],
        || {
            let config = ShellConfig::from_env().expect("Should load");

            assert_eq!(config.bridge_port, 0);
            assert_eq!(config.config_dir, PathBuf::from("/tmp/desk-config"));
            assert_eq!(config.log_dir, PathBuf::from("/tmp/desk-logs"));
            assert_eq!(config.tick_interval, Duration::from_millis(25));
        },
    );
}

/// **VALUE**: Verifies that empty values are treated as unset.
///
/// **WHY THIS MATTERS**: `.env` templates often ship `SHELL_BRIDGE_PORT=`.
///
/// **BUG THIS CATCHES**: Would catch an empty string being parsed as a port
/// and failing startup.
#[test]
#[serial]
fn given_empty_port_when_loaded_then_default_port() {
    with_env(&[(BRIDGE_PORT_VAR, "  ")], || {
        let config = ShellConfig::from_env().expect("Should load");

        assert_eq!(config.bridge_port, DEFAULT_BRIDGE_PORT);
    });
}

/// **VALUE**: Verifies malformed values are rejected with the variable named.
///
/// **WHY THIS MATTERS**: A silently ignored typo would bind the wrong port.
///
/// **BUG THIS CATCHES**: Would catch parse failures falling back to defaults.
#[test]
#[serial]
fn given_invalid_values_when_loaded_then_config_error_names_variable() {
    for (name, value) in [
        (BRIDGE_PORT_VAR, "70000"),
        (BRIDGE_PORT_VAR, "http"),
        (TICK_INTERVAL_VAR, "soon"),
        (TICK_INTERVAL_VAR, "0"),
    ] {
        with_env(&[(name, value)], || {
            let result = ShellConfig::from_env();

            match result {
                Err(ShellError::Config { message, .. }) => {
                    assert!(
                        message.contains(name),
                        "Message should name {name}, got: {message}"
                    );
                }
                other => panic!("Expected config error for {name}={value}, got {other:?}"),
            }
        });
    }
}
