use thiserror::Error;

/// Failures talking to the cloud before a response envelope could be read.
///
/// A decoded envelope with `success = false` is not an error at this layer;
/// callers inspect `success` and `code` themselves.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("failed to decode upstream response: {message}")]
    Decode { message: String, body: String },

    #[error("failed to encode request body: {0}")]
    Encode(String),

    #[error("failed to sign request: {0}")]
    Signing(String),
}
