use std::sync::Arc;

use adapter_tuya::TuyaClient;
use anyhow::Result;
use gateway_core::{
    cloud::CloudApi,
    storage::{InMemoryKvStore, KvStore, SqliteKvStore},
};

use crate::{
    config::{Config, StorageKind},
    state::AppState,
};

pub async fn build_state(cfg: &Config) -> Result<AppState> {
    let kv: Arc<dyn KvStore> = match cfg.storage.kind {
        StorageKind::InMem => Arc::new(InMemoryKvStore::new(cfg.cache_ttl)),
        StorageKind::Sqlite => {
            if let Some(dir) = cfg.storage.path.parent()
                && !dir.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(dir).await?;
            }
            Arc::new(SqliteKvStore::open(&cfg.storage.path, cfg.cache_ttl).await?)
        }
    };

    let cloud: Arc<dyn CloudApi> =
        Arc::new(TuyaClient::new(cfg.tuya.base_url.clone(), cfg.tuya.credentials.clone())?);

    tracing::info!(
        storage = %cfg.storage.kind,
        mode = %cfg.response_mode,
        cache_ttl = %humantime::format_duration(cfg.cache_ttl),
        upstream = %cfg.tuya.base_url,
        "gateway state ready"
    );
    Ok(AppState::new(cloud, kv, cfg.response_mode, cfg.auth.clone()))
}
