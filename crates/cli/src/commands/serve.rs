//! `coinsage serve` — start the HTTP gateway.

use anyhow::Context;
use coinsage_config::AppConfig;
use std::path::Path;
use tracing::info;

pub async fn run(config_path: Option<&Path>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load(config_path).context("loading configuration")?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    info!(
        host = %config.gateway.host,
        port = config.gateway.port,
        auth = config.gateway.shared_secret.is_some(),
        "Starting coinsage gateway"
    );

    let agent = super::build_agent(&config);
    coinsage_gateway::serve(&config, agent)
        .await
        .context("gateway server failed")
}
