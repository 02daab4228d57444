use crate::{
    model::{Command, DeviceState},
    storage::{KvStore, get_json, set_json_persistent},
};
use anyhow::Result;
use chrono::Utc;
use dashmap::DashMap;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use tokio::sync::Mutex;

pub const DEVICE_STATE_PREFIX: &str = "device_state:";

pub fn state_key(device_id: &str) -> String {
    format!("{DEVICE_STATE_PREFIX}{device_id}")
}

/// Persistent last-known command values per device.
///
/// Saves merge into the existing state by code and are serialized per
/// device id, so two concurrent saves for one device never drop a code.
#[derive(Clone)]
pub struct DeviceStateStore {
    kv: Arc<dyn KvStore>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl DeviceStateStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv, locks: Arc::new(DashMap::new()) }
    }

    fn lock_for(&self, device_id: &str) -> Arc<Mutex<()>> {
        self.locks.entry(device_id.to_string()).or_default().clone()
    }

    pub async fn save_state(&self, device_id: &str, commands: &[Command]) -> Result<()> {
        let lock = self.lock_for(device_id);
        let _guard = lock.lock().await;

        let existing = match self.get_state(device_id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(device_id, "unreadable device state, starting fresh: {e:#}");
                None
            }
        };

        let mut merged: BTreeMap<String, Command> = existing
            .map(|s| s.last_commands.into_iter().map(|c| (c.code.clone(), c)).collect())
            .unwrap_or_default();
        for cmd in commands {
            merged.insert(cmd.code.clone(), cmd.clone());
        }

        let state = DeviceState {
            device_id: device_id.to_string(),
            last_commands: merged.into_values().collect(),
            updated_at: Utc::now().timestamp(),
        };
        set_json_persistent(self.kv.as_ref(), &state_key(device_id), &state).await?;
        tracing::debug!(device_id, codes = state.last_commands.len(), "device state saved");
        Ok(())
    }

    pub async fn get_state(&self, device_id: &str) -> Result<Option<DeviceState>> {
        get_json(self.kv.as_ref(), &state_key(device_id)).await
    }

    /// Removes persisted states whose device id is not in `valid_ids`.
    /// Individual delete failures are logged and skipped.
    pub async fn cleanup_orphaned_states(&self, valid_ids: &HashSet<String>) -> Result<usize> {
        let keys = self.kv.list_keys_with_prefix(DEVICE_STATE_PREFIX).await?;
        let mut removed = 0;
        for key in keys {
            let Some(device_id) = key.strip_prefix(DEVICE_STATE_PREFIX) else {
                continue;
            };
            if valid_ids.contains(device_id) {
                continue;
            }
            let lock = self.lock_for(device_id);
            let _guard = lock.lock().await;
            match self.kv.delete(&key).await {
                Ok(()) => {
                    // Keep the mutex while a queued save still holds a handle to it.
                    self.locks.remove_if(device_id, |_, l| Arc::strong_count(l) == 2);
                    removed += 1;
                }
                Err(e) => tracing::warn!(device_id, "failed to delete orphaned state: {e:#}"),
            }
        }
        if removed > 0 {
            tracing::info!(removed, "cleaned up orphaned device states");
        }
        Ok(removed)
    }
}
