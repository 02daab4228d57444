use std::sync::Arc;

use crate::config::AuthConfig;
use device_service::{
    CommandDispatcher, DeviceAggregator, DeviceResolver, ResponseMode, SensorReader, TokenService,
};
use gateway_core::{cloud::CloudApi, device_state::DeviceStateStore, storage::KvStore};

#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KvStore>,
    pub states: DeviceStateStore,
    pub tokens: TokenService,
    pub devices: DeviceAggregator,
    pub resolver: DeviceResolver,
    pub sensors: SensorReader,
    pub commands: CommandDispatcher,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        kv: Arc<dyn KvStore>,
        mode: ResponseMode,
        auth: AuthConfig,
    ) -> Self {
        let states = DeviceStateStore::new(kv.clone());
        let resolver = DeviceResolver::new(cloud.clone(), kv.clone(), states.clone());
        Self {
            tokens: TokenService::new(cloud.clone(), auth.user_id.clone()),
            devices: DeviceAggregator::new(cloud.clone(), kv.clone(), states.clone(), mode),
            sensors: SensorReader::new(resolver.clone()),
            commands: CommandDispatcher::new(cloud, kv.clone(), states.clone()),
            resolver,
            states,
            kv,
            auth,
        }
    }
}
