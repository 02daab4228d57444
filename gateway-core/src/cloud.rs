use crate::{
    error::CloudError,
    model::{Command, DeviceStatus},
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit `null` as the field's default, the way missing keys are.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response envelope shared by every cloud endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub t: i64,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub tid: String,
}

impl<T> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self { success: true, result: Some(result), code: 0, msg: String::new(), t: 0, tid: String::new() }
    }

    pub fn failure(code: i64, msg: impl Into<String>) -> Self {
        Self { success: false, result: None, code, msg: msg.into(), t: 0, tid: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenResult {
    #[serde(deserialize_with = "null_as_default")]
    pub access_token: String,
    #[serde(deserialize_with = "null_as_default")]
    pub expire_time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub refresh_token: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Function {
    #[serde(deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    pub values: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudDevice {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub remote_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub local_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub product_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub product_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sub: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub uuid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub online: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub active_time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub icon: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ip: String,
    #[serde(deserialize_with = "null_as_default")]
    pub time_zone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub create_time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub update_time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: Vec<DeviceStatus>,
    #[serde(deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(deserialize_with = "null_as_default")]
    pub custom_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub gateway_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Specification {
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub functions: Vec<Function>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlineStatus {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_online: bool,
}

/// The two command surfaces that accept `{"commands": [...]}` bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEndpoint {
    /// `/v1.0/iot-03/devices/{id}/commands`
    Standard,
    /// `/v1.0/devices/{id}/commands`
    Legacy,
}

impl CommandEndpoint {
    pub fn path(&self, device_id: &str) -> String {
        match self {
            CommandEndpoint::Standard => format!("/v1.0/iot-03/devices/{device_id}/commands"),
            CommandEndpoint::Legacy => format!("/v1.0/devices/{device_id}/commands"),
        }
    }
}

/// Typed access to the IoT cloud. Every call signs its own request.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn get_token(&self) -> Result<Envelope<TokenResult>, CloudError>;

    async fn list_user_devices(
        &self,
        access_token: &str,
        uid: &str,
    ) -> Result<Envelope<Vec<CloudDevice>>, CloudError>;

    async fn get_device(
        &self,
        access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<CloudDevice>, CloudError>;

    /// Device record from the IoT core API, which carries the function
    /// catalog and the paired gateway of IR remotes.
    async fn get_iot_device(
        &self,
        access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<CloudDevice>, CloudError>;

    async fn get_specification(
        &self,
        access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<Specification>, CloudError>;

    async fn batch_status(
        &self,
        access_token: &str,
        device_ids: &[String],
    ) -> Result<Envelope<Vec<OnlineStatus>>, CloudError>;

    async fn send_command(
        &self,
        access_token: &str,
        device_id: &str,
        endpoint: CommandEndpoint,
        commands: &[Command],
    ) -> Result<Envelope<bool>, CloudError>;

    async fn send_ir_ac_command(
        &self,
        access_token: &str,
        infrared_id: &str,
        remote_id: &str,
        code: &str,
        value: i64,
    ) -> Result<Envelope<bool>, CloudError>;
}
