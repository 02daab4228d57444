use crate::{
    cache::{self, best_effort},
    error::{Result, ServiceError},
    transform::normalize,
};
use gateway_core::{
    cloud::CloudApi,
    device_state::DeviceStateStore,
    model::{Device, overlay_state},
    storage::KvStore,
};
use std::sync::Arc;

const FETCH_FAILED: &str = "tuya API failed to fetch device";

/// Single-device lookup with AC defaults, persisted state overlay and caching.
#[derive(Clone)]
pub struct DeviceResolver {
    cloud: Arc<dyn CloudApi>,
    kv: Arc<dyn KvStore>,
    states: DeviceStateStore,
}

impl DeviceResolver {
    pub fn new(cloud: Arc<dyn CloudApi>, kv: Arc<dyn KvStore>, states: DeviceStateStore) -> Self {
        Self { cloud, kv, states }
    }

    pub async fn get_device_by_id(&self, access_token: &str, device_id: &str) -> Result<Device> {
        let key = cache::device_key(device_id);
        if let Some(device) = cache::read::<Device>(self.kv.as_ref(), &key).await {
            return Ok(device);
        }

        let env = self.cloud.get_device(access_token, device_id).await?;
        if !env.success {
            return Err(ServiceError::upstream(FETCH_FAILED, &env));
        }
        let Some(raw) = env.result else {
            return Err(ServiceError::Upstream {
                context: FETCH_FAILED,
                message: "empty result".to_string(),
                code: env.code,
            });
        };

        let online = raw.online;
        let mut device = normalize(raw, online);

        let state = best_effort("device state read", self.states.get_state(device_id).await).flatten();
        if let Some(state) = state {
            tracing::debug!(device_id, "merging saved state into status");
            overlay_state(&mut device.status, &state);
        }

        cache::write(self.kv.as_ref(), &key, &device).await;
        Ok(device)
    }
}
