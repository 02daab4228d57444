use gateway_core::{
    cloud::CloudDevice,
    model::{Device, ir_ac_default_status},
};
use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// Shape of the device list handed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// AC remotes nested under their hub's `collections`.
    #[default]
    Nested,
    /// Devices exactly as normalized.
    Flat,
    /// Each hub/remote pair collapsed into one device carrying `remote_id`.
    Merged,
}

impl FromStr for ResponseMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0" | "nested" => Ok(ResponseMode::Nested),
            "1" | "flat" => Ok(ResponseMode::Flat),
            "2" | "merged" => Ok(ResponseMode::Merged),
            _ => Err(()),
        }
    }
}

impl ResponseMode {
    fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Nested => "nested",
            ResponseMode::Flat => "flat",
            ResponseMode::Merged => "merged",
        }
    }

    pub fn apply(&self, devices: Vec<Device>) -> Vec<Device> {
        match self {
            ResponseMode::Nested => nest_remotes(devices),
            ResponseMode::Flat => devices,
            ResponseMode::Merged => merge_remotes(devices),
        }
    }
}

impl Display for ResponseMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a cloud record into the client-facing shape.
pub fn normalize(device: CloudDevice, online: bool) -> Device {
    let name = if device.remote_name.is_empty() { device.name } else { device.remote_name };
    let mut out = Device {
        id: device.id,
        name,
        category: device.category,
        product_name: device.product_name,
        online,
        icon: device.icon,
        status: device.status,
        custom_name: non_empty(device.custom_name),
        model: non_empty(device.model),
        ip: non_empty(device.ip),
        local_key: device.local_key,
        gateway_id: device.gateway_id,
        create_time: device.create_time,
        update_time: device.update_time,
        ..Default::default()
    };
    if out.is_ir_remote() && out.status.is_empty() {
        out.status = ir_ac_default_status();
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Index of the hub owning `remote`: gateway id first, then a shared
/// non-empty local key.
fn find_hub(devices: &[Device], remote: &Device) -> Option<usize> {
    if !remote.gateway_id.is_empty()
        && let Some(i) = devices.iter().position(|d| d.is_hub() && d.id == remote.gateway_id)
    {
        return Some(i);
    }
    if !remote.local_key.is_empty() {
        return devices.iter().position(|d| d.is_hub() && d.local_key == remote.local_key);
    }
    None
}

fn split_remotes(devices: Vec<Device>) -> (Vec<Device>, Vec<Device>) {
    devices.into_iter().partition(|d| d.is_ir_remote())
}

fn nest_remotes(devices: Vec<Device>) -> Vec<Device> {
    let (remotes, mut others) = split_remotes(devices);
    if remotes.is_empty() || !others.iter().any(Device::is_hub) {
        others.extend(remotes);
        return others;
    }

    let mut orphans = Vec::new();
    for remote in remotes {
        match find_hub(&others, &remote) {
            Some(i) => others[i].collections.push(remote),
            None => orphans.push(remote),
        }
    }
    others.extend(orphans);
    others
}

fn merge_remotes(devices: Vec<Device>) -> Vec<Device> {
    let (remotes, others) = split_remotes(devices);

    let mut consumed = HashSet::new();
    let mut merged = Vec::new();
    let mut unmatched = Vec::new();
    for remote in remotes {
        let Some(i) = find_hub(&others, &remote) else {
            unmatched.push(remote);
            continue;
        };
        consumed.insert(i);
        let hub = &others[i];
        merged.push(Device {
            remote_id: Some(remote.id),
            name: remote.name,
            remote_category: Some(remote.category),
            remote_product_name: Some(remote.product_name),
            icon: remote.icon,
            create_time: remote.create_time,
            update_time: remote.update_time,
            collections: Vec::new(),
            ..hub.clone()
        });
    }

    let mut out: Vec<Device> = others
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !consumed.contains(i))
        .map(|(_, d)| d)
        .collect();
    out.extend(merged);
    out.extend(unmatched);
    out
}

/// Every id a persisted state may legitimately be keyed by.
pub fn known_ids(devices: &[Device]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for d in devices {
        ids.insert(d.id.clone());
        if let Some(remote_id) = &d.remote_id {
            ids.insert(remote_id.clone());
        }
        ids.extend(known_ids(&d.collections));
    }
    ids
}

/// Keeps devices whose category or remote category equals `category`.
pub fn filter_by_category(devices: Vec<Device>, category: Option<&str>) -> Vec<Device> {
    match category.filter(|c| !c.is_empty()) {
        Some(c) => devices
            .into_iter()
            .filter(|d| d.category == c || d.remote_category.as_deref() == Some(c))
            .collect(),
        None => devices,
    }
}

pub fn sort_by_name(devices: &mut [Device]) {
    devices.sort_by(|a, b| a.name.cmp(&b.name));
}

/// One page of `devices`; `limit <= 0` disables pagination.
pub fn paginate(devices: Vec<Device>, page: i64, limit: i64) -> Vec<Device> {
    if limit <= 0 {
        return devices;
    }
    let start = page.saturating_sub(1).saturating_mul(limit).max(0);
    let Ok(start) = usize::try_from(start) else {
        return Vec::new();
    };
    if start >= devices.len() {
        return Vec::new();
    }
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    devices.into_iter().skip(start).take(limit).collect()
}
