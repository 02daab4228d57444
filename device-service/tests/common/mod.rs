#![allow(dead_code)]

use async_trait::async_trait;
use gateway_core::{
    cloud::{CloudApi, CloudDevice, CommandEndpoint, Envelope, Function, OnlineStatus, Specification, TokenResult},
    device_state::DeviceStateStore,
    error::CloudError,
    model::{CATEGORY_IR_AC, CATEGORY_IR_HUB, Command, DeviceStatus},
    storage::InMemoryKvStore,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Token,
    List(String),
    Device(String),
    IotDevice(String),
    Spec(String),
    Batch(Vec<String>),
    Command { device_id: String, endpoint: CommandEndpoint, commands: Vec<Command> },
    IrAc { infrared_id: String, remote_id: String, code: String, value: i64 },
}

#[derive(Default)]
struct Inner {
    token: Option<Envelope<TokenResult>>,
    list: Option<Envelope<Vec<CloudDevice>>>,
    details: HashMap<String, Envelope<CloudDevice>>,
    iot_details: HashMap<String, Envelope<CloudDevice>>,
    batch: Option<Envelope<Vec<OnlineStatus>>>,
    command_replies: VecDeque<Envelope<bool>>,
    ir_replies: VecDeque<Envelope<bool>>,
    calls: Vec<Call>,
}

/// Scripted cloud that records every call it receives.
#[derive(Clone, Default)]
pub struct FakeCloud {
    inner: Arc<Mutex<Inner>>,
}

impl FakeCloud {
    pub fn with_devices(devices: Vec<CloudDevice>) -> Self {
        let cloud = Self::default();
        cloud.inner.lock().unwrap().list = Some(Envelope::ok(devices));
        cloud
    }

    pub fn set_list(&self, env: Envelope<Vec<CloudDevice>>) {
        self.inner.lock().unwrap().list = Some(env);
    }

    pub fn set_token(&self, env: Envelope<TokenResult>) {
        self.inner.lock().unwrap().token = Some(env);
    }

    pub fn set_detail(&self, device: CloudDevice) {
        self.inner.lock().unwrap().details.insert(device.id.clone(), Envelope::ok(device));
    }

    pub fn set_detail_envelope(&self, id: &str, env: Envelope<CloudDevice>) {
        self.inner.lock().unwrap().details.insert(id.to_string(), env);
    }

    pub fn set_iot_detail(&self, device: CloudDevice) {
        self.inner.lock().unwrap().iot_details.insert(device.id.clone(), Envelope::ok(device));
    }

    pub fn set_batch(&self, env: Envelope<Vec<OnlineStatus>>) {
        self.inner.lock().unwrap().batch = Some(env);
    }

    pub fn reply_command(&self, env: Envelope<bool>) {
        self.inner.lock().unwrap().command_replies.push_back(env);
    }

    pub fn reply_ir(&self, env: Envelope<bool>) {
        self.inner.lock().unwrap().ir_replies.push_back(env);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn command_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Command { .. } | Call::IrAc { .. }))
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

fn network(what: &str) -> CloudError {
    CloudError::Network(format!("{what} not scripted"))
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn get_token(&self) -> Result<Envelope<TokenResult>, CloudError> {
        self.record(Call::Token);
        self.inner.lock().unwrap().token.clone().ok_or_else(|| network("token"))
    }

    async fn list_user_devices(
        &self,
        _access_token: &str,
        uid: &str,
    ) -> Result<Envelope<Vec<CloudDevice>>, CloudError> {
        self.record(Call::List(uid.to_string()));
        self.inner.lock().unwrap().list.clone().ok_or_else(|| network("list"))
    }

    async fn get_device(
        &self,
        _access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<CloudDevice>, CloudError> {
        self.record(Call::Device(device_id.to_string()));
        self.inner.lock().unwrap().details.get(device_id).cloned().ok_or_else(|| network("device"))
    }

    async fn get_iot_device(
        &self,
        _access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<CloudDevice>, CloudError> {
        self.record(Call::IotDevice(device_id.to_string()));
        self.inner.lock().unwrap().iot_details.get(device_id).cloned().ok_or_else(|| network("iot device"))
    }

    async fn get_specification(
        &self,
        _access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<Specification>, CloudError> {
        self.record(Call::Spec(device_id.to_string()));
        if device_id.starts_with("nospec") {
            return Err(network("specification"));
        }
        Ok(Envelope::ok(Specification { category: "cz".into(), ..Default::default() }))
    }

    async fn batch_status(
        &self,
        _access_token: &str,
        device_ids: &[String],
    ) -> Result<Envelope<Vec<OnlineStatus>>, CloudError> {
        self.record(Call::Batch(device_ids.to_vec()));
        self.inner.lock().unwrap().batch.clone().ok_or_else(|| network("batch status"))
    }

    async fn send_command(
        &self,
        _access_token: &str,
        device_id: &str,
        endpoint: CommandEndpoint,
        commands: &[Command],
    ) -> Result<Envelope<bool>, CloudError> {
        self.record(Call::Command {
            device_id: device_id.to_string(),
            endpoint,
            commands: commands.to_vec(),
        });
        Ok(self.inner.lock().unwrap().command_replies.pop_front().unwrap_or_else(|| Envelope::ok(true)))
    }

    async fn send_ir_ac_command(
        &self,
        _access_token: &str,
        infrared_id: &str,
        remote_id: &str,
        code: &str,
        value: i64,
    ) -> Result<Envelope<bool>, CloudError> {
        self.record(Call::IrAc {
            infrared_id: infrared_id.to_string(),
            remote_id: remote_id.to_string(),
            code: code.to_string(),
            value,
        });
        Ok(self.inner.lock().unwrap().ir_replies.pop_front().unwrap_or_else(|| Envelope::ok(true)))
    }
}

pub struct Harness {
    pub cloud: FakeCloud,
    pub kv: Arc<InMemoryKvStore>,
    pub states: DeviceStateStore,
}

impl Harness {
    pub fn new(cloud: FakeCloud) -> Self {
        let kv = Arc::new(InMemoryKvStore::default());
        let states = DeviceStateStore::new(kv.clone());
        Self { cloud, kv, states }
    }
}

pub fn cloud_device(id: &str, name: &str, category: &str) -> CloudDevice {
    CloudDevice { id: id.into(), name: name.into(), category: category.into(), ..Default::default() }
}

pub fn hub(id: &str, name: &str, local_key: &str) -> CloudDevice {
    CloudDevice { local_key: local_key.into(), online: true, ..cloud_device(id, name, CATEGORY_IR_HUB) }
}

pub fn remote(id: &str, name: &str, gateway_id: &str) -> CloudDevice {
    CloudDevice { gateway_id: gateway_id.into(), ..cloud_device(id, name, CATEGORY_IR_AC) }
}

pub fn plug(id: &str, name: &str) -> CloudDevice {
    CloudDevice {
        status: vec![DeviceStatus::new("switch_1", true)],
        online: true,
        ..cloud_device(id, name, "cz")
    }
}

pub fn function(code: &str) -> Function {
    Function { code: code.into(), kind: "Enum".into(), values: serde_json::Value::Null }
}
