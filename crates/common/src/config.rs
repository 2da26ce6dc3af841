use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub trait FromEnv: Sized {
    fn from_env() -> anyhow::Result<Self>;
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Host to bind to.
    pub bind_host: String,
    /// Port to bind to. 0 lets the OS pick one.
    pub bind_port: u16,
    /// Path prefix in front of the versioned endpoints, e.g. `logs/main`.
    #[serde(default)]
    pub url_prefix: String,
}

impl FromEnv for HttpConfig {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind_host: std::env::var("HTTP_BIND_HOST")?,
            bind_port: std::env::var("HTTP_BIND_PORT")?.parse()?,
            url_prefix: std::env::var("HTTP_URL_PREFIX").unwrap_or_default(),
        })
    }
}

/// Log operator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogConfig {
    /// Hex encoded Ed25519 secret key of the log
    pub private_key: String,
    /// How long a tree head stays open for witness cosignatures
    #[serde(default = "default_cosign_interval_ms")]
    pub cosign_interval_ms: u64,
    /// Upper bound on every call made to the backend
    #[serde(default = "default_backend_deadline_ms")]
    pub backend_deadline_ms: u64,
    /// Max number of leaves returned by a single get-leaves request
    #[serde(default = "default_max_range")]
    pub max_range: u64,
}

impl LogConfig {
    pub fn cosign_interval(&self) -> Duration {
        Duration::from_millis(self.cosign_interval_ms)
    }

    pub fn backend_deadline(&self) -> Duration {
        Duration::from_millis(self.backend_deadline_ms)
    }
}

impl FromEnv for LogConfig {
    fn from_env() -> anyhow::Result<Self> {
        let mut toml_string = "".to_string();
        toml_string.push_str(&format!(
            "private_key = \"{}\"\n",
            std::env::var("LOG_PRIVATE_KEY")?
        ));
        if let Ok(val) = std::env::var("LOG_COSIGN_INTERVAL_MS") {
            toml_string.push_str(&format!("cosign_interval_ms = {}\n", val));
        }
        if let Ok(val) = std::env::var("LOG_BACKEND_DEADLINE_MS") {
            toml_string.push_str(&format!("backend_deadline_ms = {}\n", val));
        }
        if let Ok(val) = std::env::var("LOG_MAX_RANGE") {
            toml_string.push_str(&format!("max_range = {}\n", val));
        }
        Ok(toml::from_str(&toml_string)?)
    }
}

#[inline]
const fn default_cosign_interval_ms() -> u64 {
    30_000
}

#[inline]
const fn default_backend_deadline_ms() -> u64 {
    10_000
}

#[inline]
const fn default_max_range() -> u64 {
    10
}

/// Where the Merkle tree lives.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-process tree, lost on restart. For development and tests.
    Memory,
    /// Remote backend reachable over JSON-RPC.
    Rpc { url: String },
}

impl FromEnv for BackendConfig {
    fn from_env() -> anyhow::Result<Self> {
        match std::env::var("BACKEND_RPC_URL") {
            Ok(url) => Ok(Self::Rpc { url }),
            Err(_) => Ok(Self::Memory),
        }
    }
}

/// A witness allowed to cosign tree heads.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WitnessConfig {
    /// Human readable label, only used in logs
    #[serde(default)]
    pub name: Option<String>,
    /// Hex encoded Ed25519 verification key
    pub public_key: String,
}

/// Log node configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogNodeConfig {
    pub http: HttpConfig,
    pub log: LogConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub witnesses: Vec<WitnessConfig>,
}

impl FromEnv for LogNodeConfig {
    fn from_env() -> anyhow::Result<Self> {
        // comma separated verification keys
        let witnesses = std::env::var("WITNESSES")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| WitnessConfig {
                name: None,
                public_key: key.to_string(),
            })
            .collect();
        Ok(Self {
            http: HttpConfig::from_env()?,
            log: LogConfig::from_env()?,
            backend: BackendConfig::from_env()?,
            witnesses,
        })
    }
}

/// Reads toml file as a specific type.
pub fn from_toml_path<P: AsRef<Path>, R: DeserializeOwned>(path: P) -> anyhow::Result<R> {
    let mut contents = String::new();
    {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    }
    tracing::debug!("Config file size: {} bytes", contents.len());

    let result: R = toml::from_str(&contents)?;

    Ok(result)
}
