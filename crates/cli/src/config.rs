//! Connection settings: config file, environment and flags.
//!
//! Flags win over environment variables (handled by clap), which win over
//! the config file.

use anyhow::Context;
use clap::Args;
use nanodesk::{ClientConfig, DEFAULT_PORT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of a `nanodesk.toml` file.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub stream_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub ready_timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}

#[derive(Debug, Default, Clone, Args)]
pub struct ConnectionArgs {
    /// Path to a TOML config file
    #[arg(long, short, global = true, env = "NANODESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend endpoint as host:port
    #[arg(long, global = true, env = "NANODESK_ENDPOINT")]
    pub endpoint: Option<String>,

    /// API key for the backend
    #[arg(long, global = true, env = "NANODESK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of stream viewer links
    #[arg(long, global = true, env = "NANODESK_STREAM_BASE_URL")]
    pub stream_base_url: Option<String>,

    /// Timeout for a single remote call, in seconds
    #[arg(long, global = true, value_parser = parse_secs)]
    pub request_timeout: Option<u64>,

    /// Timeout for sandbox creation, in seconds
    #[arg(long, global = true, value_parser = parse_secs)]
    pub ready_timeout: Option<u64>,
}

impl ConnectionArgs {
    /// Builds the client config from flags and the optional config file.
    pub fn resolve(&self) -> anyhow::Result<ClientConfig> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Ok(self.merge(file))
    }

    fn merge(&self, file: ConfigFile) -> ClientConfig {
        let endpoint = self
            .endpoint
            .clone()
            .or(file.endpoint)
            .unwrap_or_else(|| format!("localhost:{}", DEFAULT_PORT));

        let mut config = ClientConfig::new(endpoint);
        if let Some(api_key) = self.api_key.clone().or(file.api_key) {
            config = config.with_api_key(api_key);
        }
        if let Some(url) = self.stream_base_url.clone().or(file.stream_base_url) {
            config = config.with_stream_base_url(url);
        }
        if let Some(secs) = self.request_timeout.or(file.request_timeout_secs) {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.ready_timeout.or(file.ready_timeout_secs) {
            config = config.with_ready_timeout(Duration::from_secs(secs));
        }
        config
    }
}

fn parse_secs(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of seconds"))?;
    if secs == 0 {
        return Err("timeout must be at least 1 second".to_string());
    }
    Ok(secs)
}
