//! Gateway configuration loaded from TOML.

use anyhow::{Context, Result};
use fcore::EnvScope;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Address the gateway binds when none is configured.
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Capacity of the token channel of externally-streaming calls.
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Top-level gateway configuration.
///
/// ```toml
/// [server]
/// bind = "0.0.0.0:8080"
///
/// [invoke]
/// env_scope = "context"
/// human_timeout_secs = 300
/// stream_buffer = 64
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration.
    pub server: ServerConfig,
    /// Invocation configuration.
    pub invoke: InvokeConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
        }
    }
}

/// How functions are invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokeConfig {
    /// Where request `envs` are applied.
    pub env_scope: EnvScope,
    /// Upper bound on waiting for a human answer; `None` waits forever.
    ///
    /// On expiry the call fails with a "prompt withdrawn" error; a late
    /// answer is then treated as the next request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_timeout_secs: Option<u64>,
    /// Capacity of the token channel of externally-streaming calls.
    pub stream_buffer: usize,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            env_scope: EnvScope::default(),
            human_timeout_secs: None,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl InvokeConfig {
    /// The human-answer timeout, if any.
    pub fn human_timeout(&self) -> Option<Duration> {
        self.human_timeout_secs.map(Duration::from_secs)
    }

    /// Token channel capacity, at least one.
    pub fn stream_buffer(&self) -> usize {
        self.stream_buffer.max(1)
    }
}

impl GatewayConfig {
    /// Parse a TOML string, expanding `${VAR}` references first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = crate::utils::expand_env_vars(toml_str);
        toml::from_str(&expanded).context("invalid gateway configuration")
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("failed to load {}", path.display()))
    }
}
