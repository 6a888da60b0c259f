use desk_shell::config::ShellConfig;
use desk_shell::error::ShellError;
use desk_shell::logger::initialize as LoggerInitialize;
use desk_shell::startup;

use bridge_core::preferences::FixedSystemTheme;

use log::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ShellError> {
    let config = ShellConfig::load()?;

    // Initialize logger FIRST
    LoggerInitialize(&config.log_dir)?;

    info!("Desk shell starting");
    info!("Log directory: {}", config.log_dir.display());

    // No platform theme integration; the OS is assumed to be in light mode.
    let shell = startup::start(&config, &FixedSystemTheme::default())
        .await
        .inspect_err(|e| error!("Startup failed: {e}"))?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }

    info!("Shutdown requested");
    shell.shutdown();

    Ok(())
}
