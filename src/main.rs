//! Entry point: paths, config, logging and the terminal session.

use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod config;
mod events;
mod exec;
mod history;
mod input;
mod jobs;
mod layout;
mod menu;
mod screens;
mod session;
mod shortcuts;
mod ui;
mod views;

use config::{AppPaths, Config};
use shortcuts::Shortcuts;

/// Log to a file so the TUI owns stdout. `RUST_LOG` overrides the configured level.
fn init_logging(log_file: &Path, level: &str) -> Result<WorkerGuard> {
    // Split the configured path into directory and file name.
    let dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    let name = log_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sysh.log".into());
    // Write to the file directly so the terminal stays clean.
    let file_appender = tracing_appender::rolling::never(dir, name);
    // Background writer; the guard flushes it on drop.
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG first, then the configured level.
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    // Note where the log goes.
    tracing::info!("logging to {}", log_file.display());
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Settings directory and config.
    let paths = AppPaths::resolve()?;
    let cfg = Config::load_or_default(&paths.config)?;
    // Keep the guard alive so buffered lines are written.
    let _log_guard = init_logging(&paths.log, &cfg.log_level)?;
    tracing::info!("sysh {} starting", env!("CARGO_PKG_VERSION"));

    // Key bindings.
    let shortcuts = Shortcuts::load_or_default(&paths.shortcuts)?;

    // Raw mode and alternate screen.
    let mut terminal = ui::init_terminal()?;
    // Run until the user quits.
    let res = app::run_app(&mut terminal, cfg, paths, shortcuts).await;
    // Always give the terminal back.
    ui::restore_terminal()?;

    // Log a failure before returning it.
    if let Err(ref e) = res {
        tracing::error!("app error: {e:#}");
    }
    tracing::info!("sysh exiting");
    res
}
