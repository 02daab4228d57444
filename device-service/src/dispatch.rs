use crate::{
    cache::{self, best_effort},
    error::{CODE_COMMAND_NOT_SUPPORTED, CODE_IR_NOT_SUPPORTED, CODE_PARAM_ILLEGAL, Result, ServiceError},
};
use gateway_core::{
    cloud::{CloudApi, CommandEndpoint, Envelope},
    device_state::DeviceStateStore,
    model::{Command, StatusValue},
    storage::KvStore,
};
use std::sync::Arc;

/// Sends control commands, absorbing the cloud's incompatible command
/// surfaces behind one contract. Successful commands are remembered in the
/// device state store and evict the device's cached detail.
#[derive(Clone)]
pub struct CommandDispatcher {
    cloud: Arc<dyn CloudApi>,
    kv: Arc<dyn KvStore>,
    states: DeviceStateStore,
}

impl CommandDispatcher {
    pub fn new(cloud: Arc<dyn CloudApi>, kv: Arc<dyn KvStore>, states: DeviceStateStore) -> Self {
        Self { cloud, kv, states }
    }

    pub async fn send_command(
        &self,
        access_token: &str,
        device_id: &str,
        commands: &[Command],
    ) -> Result<bool> {
        tracing::debug!(device_id, ?commands, "sending command");
        let env = self
            .cloud
            .send_command(access_token, device_id, CommandEndpoint::Standard, commands)
            .await?;

        let result = if env.success {
            outcome(&env)
        } else {
            tracing::error!(device_id, code = env.code, msg = %env.msg, "command rejected");
            match env.code {
                CODE_PARAM_ILLEGAL => return Err(ServiceError::BadRequest { code: env.code }),
                CODE_COMMAND_NOT_SUPPORTED => match self.retry_legacy(access_token, device_id, commands).await {
                    Some(result) => result,
                    None => return Err(ServiceError::upstream("tuya API failed", &env)),
                },
                _ => return Err(ServiceError::upstream("tuya API failed", &env)),
            }
        };

        self.remember(device_id, commands).await;
        Ok(result)
    }

    /// Resends `switch_N` codes as `switchN` to the legacy endpoint.
    /// `None` when nothing was rewritten or the retry did not succeed.
    async fn retry_legacy(
        &self,
        access_token: &str,
        device_id: &str,
        commands: &[Command],
    ) -> Option<bool> {
        let retry = legacy_switch_codes(commands)?;
        tracing::debug!(device_id, ?retry, "retrying with legacy switch codes");
        match self.cloud.send_command(access_token, device_id, CommandEndpoint::Legacy, &retry).await {
            Ok(env) if env.success => {
                tracing::info!(device_id, "legacy retry succeeded");
                Some(outcome(&env))
            }
            Ok(env) => {
                tracing::error!(device_id, code = env.code, msg = %env.msg, "legacy retry rejected");
                None
            }
            Err(e) => {
                tracing::error!(device_id, "legacy retry failed: {e}");
                None
            }
        }
    }

    pub async fn send_ir_ac_command(
        &self,
        access_token: &str,
        infrared_id: &str,
        remote_id: &str,
        code: &str,
        value: i64,
    ) -> Result<bool> {
        let mut infrared_id = infrared_id.to_string();
        let mut force_legacy = false;

        match self.cloud.get_iot_device(access_token, remote_id).await {
            Ok(env) if env.success => {
                if let Some(remote) = env.result {
                    if !remote.gateway_id.is_empty() {
                        tracing::debug!(remote_id, gateway_id = %remote.gateway_id, "using remote's gateway as infrared id");
                        infrared_id = remote.gateway_id;
                    }
                    force_legacy =
                        remote.functions.iter().any(|f| f.code == "PowerOn" || f.code == "PowerOff");
                }
            }
            Ok(env) => {
                tracing::debug!(remote_id, code = env.code, "remote lookup unsuccessful, keeping infrared id")
            }
            Err(e) => tracing::warn!(remote_id, "remote lookup failed, keeping infrared id: {e}"),
        }

        if force_legacy {
            tracing::debug!(remote_id, "custom instruction set detected, using standard control");
            return self.send_ir_legacy(access_token, remote_id, code, value).await;
        }

        tracing::debug!(%infrared_id, remote_id, code, value, "sending IR AC command");
        let env = self
            .cloud
            .send_ir_ac_command(access_token, &infrared_id, remote_id, code, value)
            .await?;
        if !env.success {
            tracing::error!(remote_id, code = env.code, msg = %env.msg, "IR command rejected");
            if env.code == CODE_IR_NOT_SUPPORTED || env.code == CODE_PARAM_ILLEGAL {
                tracing::warn!(remote_id, "falling back to standard control");
                return self.send_ir_legacy(access_token, remote_id, code, value).await;
            }
            return Err(ServiceError::upstream("tuya IR API failed", &env));
        }

        self.remember(remote_id, &[Command::new(code, value)]).await;
        Ok(outcome(&env))
    }

    async fn send_ir_legacy(
        &self,
        access_token: &str,
        remote_id: &str,
        code: &str,
        value: i64,
    ) -> Result<bool> {
        let command = ir_legacy_command(code, value);
        tracing::debug!(remote_id, from = code, to = %command.code, "legacy IR mapping");
        let env = self
            .cloud
            .send_command(access_token, remote_id, CommandEndpoint::Legacy, &[command])
            .await?;
        if !env.success {
            tracing::error!(remote_id, code = env.code, msg = %env.msg, "legacy IR command rejected");
            if env.code == CODE_PARAM_ILLEGAL {
                return Err(ServiceError::BadRequest { code: env.code });
            }
            return Err(ServiceError::upstream("tuya Legacy API failed", &env));
        }
        Ok(outcome(&env))
    }

    async fn remember(&self, device_id: &str, commands: &[Command]) {
        best_effort("device state save", self.states.save_state(device_id, commands).await);
        cache::invalidate(self.kv.as_ref(), &cache::device_key(device_id)).await;
    }
}

fn outcome(env: &Envelope<bool>) -> bool {
    env.result.unwrap_or(env.success)
}

/// `switch_1` becomes `switch1`; other codes pass through. `None` when no
/// code changed.
pub fn legacy_switch_codes(commands: &[Command]) -> Option<Vec<Command>> {
    let mut changed = false;
    let rewritten = commands
        .iter()
        .map(|c| {
            if c.code.starts_with("switch_") {
                changed = true;
                Command { code: c.code.replacen('_', "", 1), value: c.value.clone() }
            } else {
                c.clone()
            }
        })
        .collect();
    changed.then_some(rewritten)
}

/// Maps a generic AC code onto the vendor's standard data points.
pub fn ir_legacy_command(code: &str, value: i64) -> Command {
    match code {
        "temp" => Command::new("T", value),
        "power" => {
            let target = if value == 1 { "PowerOn" } else { "PowerOff" };
            Command::new(target, StatusValue::from(target))
        }
        "mode" => Command::new("M", value),
        "wind" => Command::new("F", value),
        other => Command::new(other, value),
    }
}
