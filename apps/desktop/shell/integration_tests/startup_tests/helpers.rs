use desk_shell::config::ShellConfig;

use std::time::Duration;

use tempfile::TempDir;

pub const TEST_TICK_INTERVAL: Duration = Duration::from_millis(20);
pub const WAIT_LIMIT: Duration = Duration::from_secs(3);

/// A configuration rooted in a fresh temp directory on an ephemeral port.
pub fn temp_config() -> (ShellConfig, TempDir) {
    let root = TempDir::new().expect("Should create temp dir");
    let config = ShellConfig {
        bridge_port: 0,
        config_dir: root.path().join("config"),
        log_dir: root.path().join("logs"),
        tick_interval: TEST_TICK_INTERVAL,
    };
    (config, root)
}

/// Poll `condition` until it holds or [`WAIT_LIMIT`] passes.
pub async fn wait_until(description: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("Timed out waiting for: {description}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
