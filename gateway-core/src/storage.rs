use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{
    collections::HashMap,
    path::Path,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Keys under this prefix are TTL-bounded and dropped by a cache flush.
pub const CACHE_PREFIX: &str = "cache:";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Byte-oriented key-value store with a TTL-bounded cache namespace and
/// persistent entries that survive [`KvStore::flush_cache_namespace`].
///
/// A missing key is `Ok(None)`; `Err` is reserved for storage faults.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
    async fn set_persistent(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
    /// Deletes every key starting with `prefix`, returning how many live
    /// entries were removed. Expired entries are purged, not counted.
    async fn drop_prefix(&self, prefix: &str) -> Result<u64>;

    fn default_ttl(&self) -> Duration;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let ttl = self.default_ttl();
        self.set_with_ttl(key, value, ttl).await
    }

    async fn flush_cache_namespace(&self) -> Result<u64> {
        self.drop_prefix(CACHE_PREFIX).await
    }
}

/// Reads and decodes a JSON value. Undecodable payloads are reported as errors.
pub async fn get_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    let Some(bytes) = store.get(key).await? else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&bytes).with_context(|| format!("decode {key}"))?;
    Ok(Some(value))
}

/// Writes a JSON value with the store's default TTL.
pub async fn set_json<T: Serialize + Sync>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_vec(value)?).await
}

pub async fn set_json_persistent<T: Serialize + Sync>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<()> {
    store.set_persistent(key, serde_json::to_vec(value)?).await
}

#[derive(Clone)]
pub struct InMemoryKvStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    default_ttl: Duration,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl InMemoryKvStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), default_ttl }
    }

    /// Entries held in memory, including expired ones not yet purged.
    pub async fn entry_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let g = self.inner.read().await;
        let now = Instant::now();
        Ok(g.get(key).filter(|e| e.is_live(now)).map(|e| e.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut g = self.inner.write().await;
        let now = Instant::now();
        g.retain(|_, e| e.is_live(now));
        g.insert(key.to_string(), Entry { value, expires_at: Some(now + ttl) });
        Ok(())
    }

    async fn set_persistent(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut g = self.inner.write().await;
        g.insert(key.to_string(), Entry { value, expires_at: None });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let g = self.inner.read().await;
        let now = Instant::now();
        let mut keys: Vec<String> = g
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn drop_prefix(&self, prefix: &str) -> Result<u64> {
        let mut g = self.inner.write().await;
        let now = Instant::now();
        g.retain(|_, e| e.is_live(now));
        let before = g.len();
        g.retain(|k, _| !k.starts_with(prefix));
        Ok((before - g.len()) as u64)
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Durable store backed by a single SQLite table. Expiry is kept as unix
/// milliseconds; `NULL` marks a persistent entry.
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
    default_ttl: Duration,
}

impl SqliteKvStore {
    pub async fn open(path: &Path, default_ttl: Duration) -> Result<Self> {
        let opts = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        Self::connect_with(opts, default_ttl).await
    }

    pub async fn connect(database_url: &str, default_ttl: Duration) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        Self::connect_with(opts, default_ttl).await
    }

    async fn connect_with(opts: SqliteConnectOptions, default_ttl: Duration) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(opts).await?;

        sqlx::migrate!().run(&pool).await?;

        let store = Self { pool, default_ttl };
        let purged = store.purge_expired().await?;
        if purged > 0 {
            tracing::debug!(purged, "removed expired kv entries");
        }
        Ok(store)
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let res = sqlx::query("DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1")
            .bind(now_millis())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn upsert(&self, key: &str, value: Vec<u8>, expires_at: Option<i64>) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_millis(ttl: Duration) -> i64 {
    let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl)
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT value FROM kv_entries WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
        )
        .bind(key)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.upsert(key, value, Some(expiry_millis(ttl))).await
    }

    async fn set_persistent(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.upsert(key, value, None).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?1").bind(key).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM kv_entries
            WHERE substr(key, 1, length(?1)) = ?1 AND (expires_at IS NULL OR expires_at > ?2)
            ORDER BY key",
        )
        .bind(prefix)
        .bind(now_millis())
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    async fn drop_prefix(&self, prefix: &str) -> Result<u64> {
        self.purge_expired().await?;
        let res = sqlx::query("DELETE FROM kv_entries WHERE substr(key, 1, length(?1)) = ?1")
            .bind(prefix)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
