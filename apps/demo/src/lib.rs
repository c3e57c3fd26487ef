//! Sample functions served with fnserve, and the command line that serves
//! them.

use anyhow::Result;
use clap::Parser;
use fnserve::{GatewayConfig, Registry};
use std::{net::SocketAddr, path::PathBuf};

pub mod functions;

/// Serve the sample functions.
#[derive(Parser, Debug)]
#[command(name = "fnserve-demo", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bind address (host:port), overriding `[server] bind`.
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

impl Cli {
    /// Resolve the configuration from the file and flags.
    pub fn config(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config = GatewayConfig::load(path)?;
                tracing::info!("loaded configuration from {}", path.display());
                config
            }
            None => GatewayConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.server.bind = bind.to_string();
        }
        Ok(config)
    }

    /// Serve until ctrl-c.
    pub async fn run(self) -> Result<()> {
        let config = self.config()?;
        let handle = fnserve::serve(registry(), &config).await?;

        tokio::signal::ctrl_c().await?;
        tracing::info!("received ctrl-c, shutting down");
        handle.shutdown().await?;
        tracing::info!("fnserve shut down");
        Ok(())
    }
}

/// Registry holding every sample function.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(functions::greet::serving());
    registry.register(functions::whoami::serving());
    registry.register(functions::count::serving());
    registry.register(functions::interview::serving());
    registry.register(functions::spell::serving());
    registry
}
