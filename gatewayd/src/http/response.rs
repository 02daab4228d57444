use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use device_service::ServiceError;
use serde::{Deserialize, Serialize};

/// Envelope every gateway endpoint answers with. `data` is left out when
/// there is nothing to return.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(message: &str, data: T) -> Response {
    let body = ApiResponse { status: true, message: message.to_string(), data: Some(data) };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn ok_empty(message: &str) -> Response {
    let body = ApiResponse::<()> { status: true, message: message.to_string(), data: None };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ApiResponse::<()> { status: false, message: message.into(), data: None };
    (status, Json(body)).into_response()
}

pub fn service_error(err: &ServiceError) -> Response {
    let status = if err.is_bad_request() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    failure(status, err.to_string())
}
