use airscout_common::observability::{LogConfig, init_logging};
use airscout_config::{AirscoutConfig, AirscoutConfigLoader};
use airscout_runtime::AirscoutRuntime;
use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use std::path::Path;
use std::time::Duration;

mod cli;
mod commands;
mod wiring;

const DEFAULT_CONFIG_FILE: &str = "airscout.yaml";

fn load_config(explicit: Option<&Path>) -> Result<AirscoutConfig> {
    let loader = AirscoutConfigLoader::new();
    let loader = match explicit {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("loading configuration")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config (file, then env overrides and ${VAR} expansion)
    let cfg = load_config(cli.config.as_deref())?;

    // 2) Logging from the `logging` section
    let log_file = init_logging(LogConfig {
        app_name: "airscout",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(target: "app", log_file = %log_file.display(), "app.start");

    // 3) Runtime with Ctrl-C wired to the shared cancellation token
    let runtime = AirscoutRuntime::build("airscout", None)?;
    let _ctrl_c = runtime.cancel_on_ctrl_c();
    let cancel = runtime.cancellation();

    let result = runtime.block_on(commands::run(cli.command, &cfg, &cancel));
    if cancel.is_cancelled() {
        tracing::warn!(target: "app", "app.interrupted");
    }
    runtime.shutdown(Duration::from_secs(2));
    result
}
