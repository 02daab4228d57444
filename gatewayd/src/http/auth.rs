use crate::{http::response::failure, state::AppState};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const UID_HEADER: &str = "x-tuya-uid";

/// Upstream access token presented by the caller.
#[derive(Clone, Debug)]
pub struct AccessToken(pub String);

/// Account id the caller asked for, if any.
#[derive(Clone, Debug)]
pub struct CallerUid(pub String);

pub async fn require_api_key(State(app): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if app.auth.api_key.is_none() {
        tracing::error!("API_KEY is not configured");
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Server misconfiguration: API_KEY not set");
    }

    let presented = req.headers().get(API_KEY_HEADER).and_then(|h| h.to_str().ok()).unwrap_or_default();
    if !app.auth.api_key_matches(presented) {
        tracing::warn!("rejected request with invalid api key");
        return failure(StatusCode::UNAUTHORIZED, "Invalid API Key");
    }

    next.run(req).await
}

pub async fn require_access_token(mut req: Request<Body>, next: Next) -> Response {
    let Some(value) = req.headers().get(header::AUTHORIZATION).and_then(|h| h.to_str().ok()) else {
        return failure(StatusCode::UNAUTHORIZED, "Authorization header is required");
    };
    let Some(token) = parse_authorization(value) else {
        return failure(
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format. Expected 'Bearer <token>'",
        );
    };
    let token = token.to_string();

    let uid = req
        .headers()
        .get(UID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| CallerUid(v.to_string()));

    req.extensions_mut().insert(AccessToken(token));
    if let Some(uid) = uid {
        req.extensions_mut().insert(uid);
    }
    next.run(req).await
}

/// Accepts `Bearer <token>` or a bare token.
fn parse_authorization(value: &str) -> Option<&str> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        ["Bearer", token] => Some(*token),
        [token] if *token != "Bearer" => Some(*token),
        _ => None,
    }
}
