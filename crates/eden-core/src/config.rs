use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::DeviceCatalog;
use crate::types::DeviceRecord;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_CONFIG_FILE: &str = "eden.toml";
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 2_000; // per recipient, per alert
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64; // frames buffered per viewer
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024; // inbound viewer frames

/// Top-level config (eden.toml + EDEN_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdenConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Static device catalog. Empty means "use the sample seed".
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Fan-out limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Viewers beyond this are refused at subscribe time.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Upper bound on one delivery attempt to one viewer.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl BroadcastConfig {
    pub fn send_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.send_timeout_ms)
    }
}

/// Optional static dashboard passthrough.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Directory holding `index.html` and its assets. Unset disables `/` and `/static`.
    pub static_dir: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}
fn default_send_timeout_ms() -> u64 {
    DEFAULT_SEND_TIMEOUT_MS
}
fn default_outbound_queue() -> usize {
    DEFAULT_OUTBOUND_QUEUE
}
fn default_heartbeat_secs() -> u64 {
    DEFAULT_HEARTBEAT_SECS
}
fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

impl EdenConfig {
    /// Load config from a TOML file with EDEN_* env var overrides.
    ///
    /// Path: explicit argument, else `./eden.toml`. A missing `./eden.toml`
    /// means all defaults; a missing explicit path is an error, as is any
    /// file or env value that fails to parse or validate. Nested keys use
    /// `__` in env names, e.g. `EDEN_BROADCAST__SEND_TIMEOUT_MS=500`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        if let Some(path) = config_path {
            if !Path::new(path).is_file() {
                return Err(crate::error::EdenError::Config(format!(
                    "config file not found: {path}"
                )));
            }
        }
        let path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);

        Self::extract(
            Figment::new()
                .merge(Toml::file(path))
                .merge(Env::prefixed("EDEN_").split("__")),
        )
    }

    /// Parse config from an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> crate::error::Result<Self> {
        Self::extract(Figment::new().merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> crate::error::Result<Self> {
        let config: EdenConfig = figment
            .extract()
            .map_err(|e| crate::error::EdenError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> crate::error::Result<()> {
        let b = &self.broadcast;
        if b.max_connections == 0 {
            return Err(crate::error::EdenError::Config(
                "broadcast.max_connections must be at least 1".to_string(),
            ));
        }
        if b.outbound_queue == 0 {
            return Err(crate::error::EdenError::Config(
                "broadcast.outbound_queue must be at least 1".to_string(),
            ));
        }
        if b.send_timeout_ms == 0 || b.heartbeat_secs == 0 {
            return Err(crate::error::EdenError::Config(
                "broadcast timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Device catalog described by this config, or the sample seed if none.
    pub fn catalog(&self) -> crate::error::Result<DeviceCatalog> {
        if self.devices.is_empty() {
            Ok(DeviceCatalog::sample())
        } else {
            DeviceCatalog::new(self.devices.clone())
        }
    }
}
