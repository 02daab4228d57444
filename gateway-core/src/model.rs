use serde::{Deserialize, Serialize};
use std::fmt;

pub const CATEGORY_IR_HUB: &str = "wnykq";
pub const CATEGORY_IR_AC: &str = "infrared_ac";

/// A dynamically typed data point value as reported by the cloud.
///
/// Variant order matters for untagged decoding: integers are tried before
/// floats so that `24` stays an integer and `24.5` becomes a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl StatusValue {
    /// Numeric view; accepts integer and floating point encodings alike.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatusValue::Int(i) => Some(*i as f64),
            StatusValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view; floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatusValue::Int(i) => Some(*i),
            StatusValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StatusValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StatusValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusValue::Bool(b) => write!(f, "{b}"),
            StatusValue::Int(i) => write!(f, "{i}"),
            StatusValue::Float(v) => write!(f, "{v}"),
            StatusValue::Text(s) => f.write_str(s),
            StatusValue::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for StatusValue {
    fn from(v: bool) -> Self {
        StatusValue::Bool(v)
    }
}

impl From<i64> for StatusValue {
    fn from(v: i64) -> Self {
        StatusValue::Int(v)
    }
}

impl From<i32> for StatusValue {
    fn from(v: i32) -> Self {
        StatusValue::Int(v.into())
    }
}

impl From<f64> for StatusValue {
    fn from(v: f64) -> Self {
        StatusValue::Float(v)
    }
}

impl From<&str> for StatusValue {
    fn from(v: &str) -> Self {
        StatusValue::Text(v.to_string())
    }
}

impl From<String> for StatusValue {
    fn from(v: String) -> Self {
        StatusValue::Text(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub code: String,
    pub value: StatusValue,
}

impl DeviceStatus {
    pub fn new(code: impl Into<String>, value: impl Into<StatusValue>) -> Self {
        Self { code: code.into(), value: value.into() }
    }
}

/// One `{code, value}` instruction, both on the wire and in persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub code: String,
    pub value: StatusValue,
}

impl Command {
    pub fn new(code: impl Into<String>, value: impl Into<StatusValue>) -> Self {
        Self { code: code.into(), value: value.into() }
    }
}

/// Normalized device as served to API consumers.
///
/// `collections` (nested mode) and `remote_id` (merged mode) are never both
/// populated on the same device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_category: Option<String>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_product_name: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub status: Vec<DeviceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default)]
    pub local_key: String,
    #[serde(default)]
    pub gateway_id: String,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub update_time: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<Device>,
}

impl Device {
    pub fn is_hub(&self) -> bool {
        self.category == CATEGORY_IR_HUB
    }

    pub fn is_ir_remote(&self) -> bool {
        self.category == CATEGORY_IR_AC
    }

    /// Id under which persisted control state for an AC remote is kept,
    /// or `None` when the device is not an AC remote at all.
    pub fn ir_state_key(&self) -> Option<&str> {
        if self.remote_category.as_deref() == Some(CATEGORY_IR_AC) {
            return self.remote_id.as_deref();
        }
        self.is_ir_remote().then_some(self.id.as_str())
    }
}

/// Last known control values for a device, unique by code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: String,
    pub last_commands: Vec<Command>,
    pub updated_at: i64,
}

/// Defaults for AC remotes that never report live data points.
pub fn ir_ac_default_status() -> Vec<DeviceStatus> {
    vec![
        DeviceStatus::new("power", 0),
        DeviceStatus::new("temp", 24),
        DeviceStatus::new("mode", 0),
        DeviceStatus::new("wind", 0),
    ]
}

/// Overwrites values of status codes present in `state`; never adds or removes codes.
pub fn overlay_state(status: &mut [DeviceStatus], state: &DeviceState) {
    if state.last_commands.is_empty() {
        return;
    }
    for entry in status.iter_mut() {
        if let Some(cmd) = state.last_commands.iter().rev().find(|c| c.code == entry.code) {
            entry.value = cmd.value.clone();
        }
    }
}
