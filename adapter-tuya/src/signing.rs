use gateway_core::error::CloudError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const SIGN_METHOD: &str = "HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex SHA-256 of the request body. GET requests hash the empty body.
pub fn content_hash(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// `METHOD\n<content hash>\n<headers>\n<path>` with an always-empty headers segment.
pub fn string_to_sign(method: &str, body: &[u8], url_path: &str) -> String {
    format!("{method}\n{}\n\n{url_path}", content_hash(body))
}

/// Signature headers for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub sign: String,
    pub t: String,
}

/// Computes the uppercase hex HMAC over `client_id + access_token + t + string_to_sign`.
/// `access_token` is empty for the token request itself.
pub fn sign(
    client_id: &str,
    client_secret: &str,
    access_token: &str,
    t: &str,
    string_to_sign: &str,
) -> Result<String, CloudError> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| CloudError::Signing(e.to_string()))?;
    mac.update(client_id.as_bytes());
    mac.update(access_token.as_bytes());
    mac.update(t.as_bytes());
    mac.update(string_to_sign.as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

/// Signs `method url_path` with the given body at timestamp `t` (unix millis).
pub fn sign_request(
    client_id: &str,
    client_secret: &str,
    access_token: &str,
    t: i64,
    method: &str,
    body: &[u8],
    url_path: &str,
) -> Result<Signature, CloudError> {
    let t = t.to_string();
    let sts = string_to_sign(method, body, url_path);
    let sign = sign(client_id, client_secret, access_token, &t, &sts)?;
    Ok(Signature { sign, t })
}
