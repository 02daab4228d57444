use gateway_core::storage::{KvStore, get_json, set_json};
use serde::{Serialize, de::DeserializeOwned};

pub fn devices_key(uid: &str) -> String {
    format!("cache:devices:{uid}")
}

pub fn device_key(device_id: &str) -> String {
    format!("cache:tuya_device:{device_id}")
}

/// Inspects the result of a side effect only to log it. Callers never branch
/// on the outcome beyond using the value when it is there.
pub fn best_effort<T>(op: &str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{op} failed: {e:#}");
            None
        }
    }
}

/// Cache read that treats faults and undecodable entries as misses.
pub async fn read<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Option<T> {
    let hit = best_effort("cache read", get_json(kv, key).await).flatten();
    tracing::debug!(key, hit = hit.is_some(), "cache lookup");
    hit
}

pub async fn write<T: Serialize + Sync>(kv: &dyn KvStore, key: &str, value: &T) {
    if best_effort("cache write", set_json(kv, key, value).await).is_some() {
        tracing::debug!(key, "cache stored");
    }
}

pub async fn invalidate(kv: &dyn KvStore, key: &str) {
    if best_effort("cache invalidation", kv.delete(key).await).is_some() {
        tracing::debug!(key, "cache invalidated");
    }
}
