use crate::{
    http::{
        auth::{require_access_token, require_api_key},
        handlers as h,
        token_expiry::detect_token_expiry,
    },
    state::AppState,
};
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};

pub fn build(state: AppState) -> Router {
    let keyed = Router::new()
        .route("/api/tuya/auth", get(h::authenticate))
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    let protected = Router::new()
        .route("/api/tuya/devices", get(h::list_devices))
        .route("/api/tuya/devices/{id}", get(h::get_device))
        .route("/api/tuya/devices/{id}/sensor", get(h::get_sensor))
        .route("/api/tuya/devices/{id}/commands/switch", post(h::send_switch_command))
        .route("/api/tuya/devices/{id}/commands/ir", post(h::send_ir_command))
        .route("/api/cache/flush", delete(h::flush_cache))
        .route("/api/devices/{id}/state", get(h::get_state).post(h::save_state))
        .route_layer(from_fn(require_access_token));

    Router::new()
        .route("/healthz", get(h::healthz))
        .merge(keyed)
        .merge(protected)
        .layer(from_fn(detect_token_expiry))
        .with_state(state)
}
