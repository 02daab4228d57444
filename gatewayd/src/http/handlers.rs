use crate::{
    http::{
        auth::{AccessToken, CallerUid},
        response::{failure, ok, ok_empty, service_error},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Extension, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use device_service::{DeviceQuery, ServiceError};
use gateway_core::model::{Command, Device};
use serde::{Deserialize, Serialize};

const INVALID_BODY: &str = "Invalid request body";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn authenticate(State(app): State<AppState>) -> Response {
    match app.tokens.authenticate().await {
        Ok(token) => ok("Authentication successful", token),
        Err(e) => {
            tracing::error!("authentication failed: {e}");
            service_error(&e)
        }
    }
}

/// Raw list parameters; anything that is not a number means "no pagination".
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    category: Option<String>,
}

impl ListParams {
    fn into_query(self) -> DeviceQuery {
        let number = |v: Option<String>| v.and_then(|s| s.trim().parse().ok()).unwrap_or(0);
        DeviceQuery {
            page: number(self.page),
            limit: number(self.limit),
            category: self.category.filter(|c| !c.is_empty()),
        }
    }
}

pub async fn list_devices(
    State(app): State<AppState>,
    Extension(AccessToken(token)): Extension<AccessToken>,
    caller: Option<Extension<CallerUid>>,
    Query(params): Query<ListParams>,
) -> Response {
    let uid = app.auth.user_id.clone().or_else(|| caller.map(|Extension(CallerUid(uid))| uid));
    let Some(uid) = uid else {
        let err = ServiceError::Config("Server configuration error: TUYA_USER_ID missing".into());
        tracing::error!("{err}");
        return service_error(&err);
    };

    match app.devices.get_all_devices(&token, &uid, &params.into_query()).await {
        Ok(page) => ok("Devices fetched successfully", page),
        Err(e) => {
            tracing::error!(uid = %uid, "device list failed: {e}");
            service_error(&e)
        }
    }
}

#[derive(Serialize)]
struct DeviceBody {
    device: Device,
}

pub async fn get_device(
    State(app): State<AppState>,
    Extension(AccessToken(token)): Extension<AccessToken>,
    Path(id): Path<String>,
) -> Response {
    match app.resolver.get_device_by_id(&token, &id).await {
        Ok(device) => ok("Device fetched successfully", DeviceBody { device }),
        Err(e) => {
            tracing::error!(device_id = %id, "device lookup failed: {e}");
            service_error(&e)
        }
    }
}

pub async fn get_sensor(
    State(app): State<AppState>,
    Extension(AccessToken(token)): Extension<AccessToken>,
    Path(id): Path<String>,
) -> Response {
    match app.sensors.read(&token, &id).await {
        Ok(data) => ok("Sensor data fetched successfully", data),
        Err(e) => {
            tracing::error!(device_id = %id, "sensor read failed: {e}");
            service_error(&e)
        }
    }
}

#[derive(Serialize)]
struct CommandOutcome {
    success: bool,
}

pub async fn send_switch_command(
    State(app): State<AppState>,
    Extension(AccessToken(token)): Extension<AccessToken>,
    Path(id): Path<String>,
    body: Result<Json<Command>, JsonRejection>,
) -> Response {
    let Ok(Json(command)) = body else {
        return failure(StatusCode::BAD_REQUEST, INVALID_BODY);
    };
    match app.commands.send_command(&token, &id, &[command]).await {
        Ok(success) => ok("Command sent successfully", CommandOutcome { success }),
        Err(e) => {
            tracing::error!(device_id = %id, "command failed: {e}");
            service_error(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IrAcBody {
    remote_id: String,
    code: String,
    #[serde(default)]
    value: i64,
}

/// `id` is the infrared hub the remote is paired with.
pub async fn send_ir_command(
    State(app): State<AppState>,
    Extension(AccessToken(token)): Extension<AccessToken>,
    Path(id): Path<String>,
    body: Result<Json<IrAcBody>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return failure(StatusCode::BAD_REQUEST, INVALID_BODY);
    };
    if body.remote_id.is_empty() || body.code.is_empty() {
        return failure(StatusCode::BAD_REQUEST, INVALID_BODY);
    }
    match app.commands.send_ir_ac_command(&token, &id, &body.remote_id, &body.code, body.value).await {
        Ok(success) => ok("IR AC Command sent successfully", CommandOutcome { success }),
        Err(e) => {
            tracing::error!(infrared_id = %id, remote_id = %body.remote_id, "IR command failed: {e}");
            service_error(&e)
        }
    }
}

pub async fn flush_cache(State(app): State<AppState>) -> Response {
    match app.kv.flush_cache_namespace().await {
        Ok(dropped) => {
            tracing::info!(dropped, "cache flushed");
            ok_empty("Cache flushed successfully")
        }
        Err(e) => {
            tracing::error!("cache flush failed: {e:#}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to flush cache")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveStateBody {
    commands: Vec<Command>,
}

pub async fn save_state(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SaveStateBody>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return failure(StatusCode::BAD_REQUEST, INVALID_BODY);
    };
    tracing::debug!(device_id = %id, commands = body.commands.len(), "saving device state");
    match app.states.save_state(&id, &body.commands).await {
        Ok(()) => ok_empty("Device state saved successfully"),
        Err(e) => {
            tracing::error!(device_id = %id, "state save failed: {e:#}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save device state")
        }
    }
}

pub async fn get_state(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    match app.states.get_state(&id).await {
        Ok(Some(state)) => ok("Device state retrieved successfully", state),
        Ok(None) => ok_empty("No state found for device"),
        Err(e) => {
            tracing::error!(device_id = %id, "state read failed: {e:#}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve device state")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_paging_means_unpaged() {
        let params = ListParams {
            page: Some("two".into()),
            limit: Some("".into()),
            category: Some(String::new()),
        };
        assert_eq!(params.into_query(), DeviceQuery { page: 0, limit: 0, category: None });

        let params = ListParams {
            page: Some("2".into()),
            limit: Some(" 6 ".into()),
            category: Some("cz".into()),
        };
        assert_eq!(
            params.into_query(),
            DeviceQuery { page: 2, limit: 6, category: Some("cz".into()) }
        );
    }
}
