//! `pagecraft serve`: run the HTTP service.

use anyhow::{Context, Result};

use pagecraft::config::Config;
use pagecraft::server::{ServerConfig, start_server};

pub async fn cmd_serve(host: String, port: u16, dev: bool) -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    start_server(
        ServerConfig {
            host,
            port,
            dev_mode: dev,
        },
        config,
    )
    .await
}
