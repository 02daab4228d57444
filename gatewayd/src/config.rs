use adapter_tuya::TuyaCredentials;
use anyhow::{self, Result};
use constant_time_eq::constant_time_eq;
use device_service::ResponseMode;
use dotenv::dotenv;
use gateway_core::storage::DEFAULT_CACHE_TTL;
use std::{
    fmt::{self, Display, Formatter},
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://openapi.tuyacn.com";
pub const DEFAULT_DB_PATH: &str = "./data/gateway.db";

#[derive(Clone, Debug, PartialEq)]
pub enum StorageKind {
    InMem,
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inmem" => Ok(StorageKind::InMem),
            "sqlite" => Ok(StorageKind::Sqlite),
            _ => Err(()),
        }
    }
}

impl StorageKind {
    fn as_str(&self) -> &'static str {
        match self {
            StorageKind::InMem => "inmem",
            StorageKind::Sqlite => "sqlite",
        }
    }
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { kind: StorageKind::Sqlite, path: PathBuf::from(DEFAULT_DB_PATH) }
    }
}

#[derive(Clone, Debug)]
pub struct TuyaConfig {
    pub credentials: TuyaCredentials,
    pub base_url: Url,
}

/// Credentials the gateway itself checks, plus the account devices are
/// listed for.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub user_id: Option<String>,
}

impl AuthConfig {
    pub fn api_key_matches(&self, candidate: &str) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| constant_time_eq(key.as_bytes(), candidate.as_bytes()))
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind: SocketAddr,
    pub tuya: TuyaConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub cache_ttl: Duration,
    pub response_mode: ResponseMode,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(client_id) = var("TUYA_CLIENT_ID") else {
            anyhow::bail!("TUYA_CLIENT_ID is required");
        };
        let Some(client_secret) = var("TUYA_ACCESS_SECRET") else {
            anyhow::bail!("TUYA_ACCESS_SECRET is required");
        };
        let base_url = Url::parse(&var("TUYA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()))?;

        let mut c = Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            tuya: TuyaConfig { credentials: TuyaCredentials { client_id, client_secret }, base_url },
            auth: AuthConfig { api_key: var("API_KEY"), user_id: var("TUYA_USER_ID") },
            storage: StorageConfig::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            response_mode: ResponseMode::default(),
            log_level: "info".to_string(),
        };
        if let Some(s) = var("GATEWAY_BIND") {
            c.bind = s.parse()?;
        }
        if let Some(s) = var("GATEWAY_STORAGE") {
            c.storage.kind = StorageKind::from_str(&s)
                .map_err(|_| anyhow::anyhow!("unsupported storage kind: {s}"))?;
        }
        if let Some(s) = var("GATEWAY_DB_PATH") {
            c.storage.path = PathBuf::from(s);
        }
        if let Some(s) = var("CACHE_TTL") {
            c.cache_ttl = humantime::parse_duration(&s).unwrap_or(DEFAULT_CACHE_TTL);
        }
        if let Some(s) = var("DEVICE_RESPONSE_MODE") {
            c.response_mode = ResponseMode::from_str(&s).unwrap_or_default();
        }
        if let Some(s) = var("GATEWAY_LOG_LEVEL") {
            c.log_level = s;
        }
        Ok(c)
    }
}
