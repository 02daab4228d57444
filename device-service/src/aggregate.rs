use crate::{
    cache::{self, best_effort},
    error::{Result, ServiceError},
    transform::{ResponseMode, filter_by_category, known_ids, normalize, paginate, sort_by_name},
};
use gateway_core::{
    cloud::CloudApi,
    device_state::DeviceStateStore,
    model::{Device, overlay_state},
    storage::KvStore,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicePage {
    pub devices: Vec<Device>,
    pub total_devices: usize,
    pub current_page_count: usize,
}

/// Builds the client-facing device list: fetch, enrich, reshape, cache,
/// then filter, sort and paginate per request.
#[derive(Clone)]
pub struct DeviceAggregator {
    cloud: Arc<dyn CloudApi>,
    kv: Arc<dyn KvStore>,
    states: DeviceStateStore,
    mode: ResponseMode,
}

impl DeviceAggregator {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        kv: Arc<dyn KvStore>,
        states: DeviceStateStore,
        mode: ResponseMode,
    ) -> Self {
        Self { cloud, kv, states, mode }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub async fn get_all_devices(
        &self,
        access_token: &str,
        uid: &str,
        query: &DeviceQuery,
    ) -> Result<DevicePage> {
        let key = cache::devices_key(uid);
        let devices = match cache::read::<Vec<Device>>(self.kv.as_ref(), &key).await {
            Some(cached) => self.mode.apply(cached),
            None => {
                let fresh = self.mode.apply(self.fetch_devices(access_token, uid).await?);
                cache::write(self.kv.as_ref(), &key, &fresh).await;
                best_effort(
                    "device state cleanup",
                    self.states.cleanup_orphaned_states(&known_ids(&fresh)).await,
                );
                fresh
            }
        };

        let mut devices = filter_by_category(devices, query.category.as_deref());
        sort_by_name(&mut devices);
        let total_devices = devices.len();
        let mut page = paginate(devices, query.page, query.limit);
        self.overlay_states(&mut page).await;

        Ok(DevicePage { current_page_count: page.len(), total_devices, devices: page })
    }

    /// Device list from the cloud, normalized and with real-time online flags.
    async fn fetch_devices(&self, access_token: &str, uid: &str) -> Result<Vec<Device>> {
        let env = self.cloud.list_user_devices(access_token, uid).await?;
        if !env.success {
            return Err(ServiceError::upstream("tuya API failed to fetch devices", &env));
        }
        let raw = env.result.unwrap_or_default();
        tracing::debug!(uid, count = raw.len(), "fetched device list");

        for device in &raw {
            self.log_specification(access_token, &device.id).await;
        }

        let ids: Vec<String> = raw.iter().map(|d| d.id.clone()).collect();
        let online = self.online_flags(access_token, &ids).await;

        Ok(raw
            .into_iter()
            .map(|d| {
                let is_online = online.get(&d.id).copied().unwrap_or(d.online);
                normalize(d, is_online)
            })
            .collect())
    }

    async fn log_specification(&self, access_token: &str, device_id: &str) {
        match self.cloud.get_specification(access_token, device_id).await {
            Ok(env) if env.success => {
                let spec = env.result.unwrap_or_default();
                let codes: Vec<&str> = spec.functions.iter().map(|f| f.code.as_str()).collect();
                tracing::debug!(device_id, category = %spec.category, functions = ?codes, "device specification");
            }
            Ok(env) => {
                tracing::warn!(device_id, code = env.code, msg = %env.msg, "specification unavailable")
            }
            Err(e) => tracing::warn!(device_id, "specification fetch failed: {e}"),
        }
    }

    /// Batch online lookup. Failures yield an empty map so list flags stand.
    async fn online_flags(&self, access_token: &str, ids: &[String]) -> HashMap<String, bool> {
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.cloud.batch_status(access_token, ids).await {
            Ok(env) if env.success => env
                .result
                .unwrap_or_default()
                .into_iter()
                .map(|s| (s.id, s.is_online))
                .collect(),
            Ok(env) => {
                tracing::warn!(code = env.code, msg = %env.msg, "batch status unsuccessful");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!("batch status failed: {e}");
                HashMap::new()
            }
        }
    }

    async fn overlay_states(&self, devices: &mut [Device]) {
        for device in devices.iter_mut() {
            self.overlay_one(device).await;
            for child in device.collections.iter_mut() {
                self.overlay_one(child).await;
            }
        }
    }

    async fn overlay_one(&self, device: &mut Device) {
        let Some(key) = device.ir_state_key().map(str::to_string) else {
            return;
        };
        if let Some(state) = best_effort("device state read", self.states.get_state(&key).await).flatten() {
            overlay_state(&mut device.status, &state);
        }
    }
}
