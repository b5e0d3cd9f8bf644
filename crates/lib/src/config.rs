//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.smsgate/config.json`) and environment.
//! Channels are listed inline; handler sections tune provider adapters.

use crate::channels::globe::{self, GlobeSettings};
use crate::msg::Channel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channels served by this gateway.
    #[serde(default)]
    pub channels: Vec<Channel>,

    /// Per-provider handler settings.
    #[serde(default)]
    pub handlers: HandlersConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 15252).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15252
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlersConfig {
    #[serde(default)]
    pub globe: GlobeHandlerConfig,
}

/// Globe Labs handler config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobeHandlerConfig {
    /// Send URL template with an `{address}` placeholder. Overridden by GLOBE_SEND_URL env.
    pub send_url: Option<String>,
    /// Max characters per SMS segment (default 160).
    #[serde(default = "default_globe_max_msg_length")]
    pub max_msg_length: usize,
    /// When true, a 2xx reply with an `error` member counts as a failed segment. Default false.
    #[serde(default)]
    pub strict_response: bool,
    /// HTTP timeout per request, in seconds (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_globe_max_msg_length() -> usize {
    globe::DEFAULT_MAX_MSG_LENGTH
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GlobeHandlerConfig {
    fn default() -> Self {
        Self {
            send_url: None,
            max_msg_length: default_globe_max_msg_length(),
            strict_response: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Resolve the Globe send URL: env GLOBE_SEND_URL overrides config, then the default.
pub fn resolve_globe_send_url(config: &Config) -> String {
    std::env::var("GLOBE_SEND_URL")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .handlers
                .globe
                .send_url
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| globe::DEFAULT_SEND_URL.to_string())
}

/// Globe handler settings from config (and env).
pub fn resolve_globe_settings(config: &Config) -> GlobeSettings {
    let g = &config.handlers.globe;
    GlobeSettings {
        send_url: resolve_globe_send_url(config),
        max_msg_length: g.max_msg_length.max(1),
        strict_response: g.strict_response,
    }
}

/// Request timeout for outbound HTTP calls.
pub fn resolve_http_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.handlers.globe.timeout_secs.max(1))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SMSGATE_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".smsgate").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or SMSGATE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
