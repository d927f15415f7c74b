//! Backend server command: `macc serve`.

use std::path::Path;

use anyhow::{Context, Result};
use macc::config::{AppConfig, CliOverrides, Secrets};

pub async fn cmd_serve(
    config_path: Option<&Path>,
    overrides: CliOverrides,
    verbose: bool,
) -> Result<()> {
    let config = AppConfig::resolve(config_path, overrides)?;
    let _guard = macc::logging::init(verbose, config.log_file.as_deref())?;
    let secrets = Secrets::from_env().context("Cannot start backend")?;

    tracing::debug!(?config, ?secrets, "Resolved configuration");
    macc::factory::server::start_server(config, secrets).await
}
