use crate::http::response::failure;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Marker the upstream "token invalid" code leaves in error messages.
const TOKEN_EXPIRED_MARKER: &[u8] = b"code: 1010";

/// Rewrites any response that reports an expired upstream token into a 401.
pub async fn detect_token_expiry(req: Request<Body>, next: Next) -> Response {
    let resp = next.run(req).await;
    let (parts, body) = resp.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("failed to buffer response body: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "").into_response();
        }
    };

    if bytes.windows(TOKEN_EXPIRED_MARKER.len()).any(|w| w == TOKEN_EXPIRED_MARKER) {
        tracing::warn!("upstream reported an expired token");
        return failure(StatusCode::UNAUTHORIZED, "Token expired. Please login or refresh the token");
    }

    Response::from_parts(parts, Body::from(bytes))
}
