use gateway_core::{cloud::Envelope, error::CloudError};
use thiserror::Error;

pub const CODE_TOKEN_INVALID: i64 = 1010;
pub const CODE_PARAM_ILLEGAL: i64 = 1106;
pub const CODE_COMMAND_NOT_SUPPORTED: i64 = 2008;
pub const CODE_IR_NOT_SUPPORTED: i64 = 30100;

/// Errors surfaced by the device pipeline.
///
/// Display strings keep the `(code: N)` suffix; the HTTP layer relies on it
/// to spot expired tokens in any response body.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("{context}: {message} (code: {code})")]
    Upstream { context: &'static str, message: String, code: i64 },

    #[error(
        "bad request: invalid input parameters. Please verify your request body matches the device's expected command format (code: {code})"
    )]
    BadRequest { code: i64 },

    #[error("{0}")]
    Config(String),
}

impl ServiceError {
    pub fn upstream<T>(context: &'static str, envelope: &Envelope<T>) -> Self {
        ServiceError::Upstream { context, message: envelope.msg.clone(), code: envelope.code }
    }

    /// Upstream code carried by the error, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            ServiceError::Upstream { code, .. } | ServiceError::BadRequest { code } => Some(*code),
            _ => None,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, ServiceError::BadRequest { .. })
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_upstream_code() {
        let env: Envelope<bool> = Envelope::failure(1010, "token invalid");
        let err = ServiceError::upstream("tuya API failed to fetch device", &env);
        assert_eq!(err.to_string(), "tuya API failed to fetch device: token invalid (code: 1010)");
        assert_eq!(err.code(), Some(1010));

        let bad = ServiceError::BadRequest { code: 1106 };
        assert!(bad.to_string().ends_with("(code: 1106)"));
        assert!(bad.is_bad_request());
    }
}
