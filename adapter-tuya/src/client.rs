use crate::signing::{SIGN_METHOD, sign_request};
use async_trait::async_trait;
use chrono::Utc;
use gateway_core::{
    cloud::{CloudApi, CloudDevice, CommandEndpoint, Envelope, OnlineStatus, Specification, TokenResult},
    error::CloudError,
    model::Command,
};
use reqwest::{Method, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, time::Duration};
use url::Url;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct TuyaCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for TuyaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TuyaCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Signed HTTP client for the Tuya OpenAPI.
///
/// Every call is signed with a fresh millisecond timestamp. Non-200 replies
/// and undecodable bodies become [`CloudError`]; decoded envelopes are
/// returned as-is, `success = false` included.
#[derive(Clone, Debug)]
pub struct TuyaClient {
    http: reqwest::Client,
    base_url: Url,
    creds: TuyaCredentials,
}

#[derive(Serialize)]
struct CommandsBody<'a> {
    commands: &'a [Command],
}

#[derive(Serialize)]
struct IrAcBody<'a> {
    code: &'a str,
    value: i64,
}

impl TuyaClient {
    pub fn new(base_url: Url, creds: TuyaCredentials) -> Result<Self, CloudError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))?;
        Ok(Self::with_client(http, base_url, creds))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url, creds: TuyaCredentials) -> Self {
        Self { http, base_url, creds }
    }

    fn url(&self, request_path: &str) -> String {
        format!("{}{request_path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// `sign_path` is what goes into the signature; `request_path` may add a
    /// query string the signature does not cover.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        sign_path: &str,
        request_path: &str,
        access_token: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<Envelope<T>, CloudError> {
        let payload = body.as_deref().unwrap_or_default();
        let signature = sign_request(
            &self.creds.client_id,
            &self.creds.client_secret,
            access_token.unwrap_or_default(),
            Utc::now().timestamp_millis(),
            method.as_str(),
            payload,
            sign_path,
        )?;

        let mut req = self
            .http
            .request(method.clone(), self.url(request_path))
            .header("client_id", &self.creds.client_id)
            .header("sign", &signature.sign)
            .header("t", &signature.t)
            .header("sign_method", SIGN_METHOD);
        if let Some(token) = access_token {
            req = req.header("access_token", token);
        }
        if let Some(body) = body {
            req = req.header(header::CONTENT_TYPE, "application/json").body(body);
        }

        tracing::debug!(%method, path = request_path, "tuya request");
        let resp = req.send().await.map_err(|e| CloudError::Network(e.to_string()))?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| CloudError::Network(e.to_string()))?;

        if status != StatusCode::OK {
            return Err(CloudError::UpstreamStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let envelope: Envelope<T> = serde_json::from_slice(&bytes).map_err(|e| CloudError::Decode {
            message: e.to_string(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })?;
        if !envelope.success {
            tracing::debug!(path = request_path, code = envelope.code, msg = %envelope.msg, "tuya call unsuccessful");
        }
        Ok(envelope)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<Envelope<T>, CloudError> {
        self.execute(Method::GET, path, path, Some(access_token), None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        access_token: &str,
        body: &B,
    ) -> Result<Envelope<T>, CloudError> {
        let body = serde_json::to_vec(body).map_err(|e| CloudError::Encode(e.to_string()))?;
        self.execute(Method::POST, path, path, Some(access_token), Some(body)).await
    }
}

#[async_trait]
impl CloudApi for TuyaClient {
    async fn get_token(&self) -> Result<Envelope<TokenResult>, CloudError> {
        let path = "/v1.0/token?grant_type=1";
        self.execute(Method::GET, path, path, None, None).await
    }

    async fn list_user_devices(
        &self,
        access_token: &str,
        uid: &str,
    ) -> Result<Envelope<Vec<CloudDevice>>, CloudError> {
        self.get(&format!("/v1.0/users/{uid}/devices"), access_token).await
    }

    async fn get_device(
        &self,
        access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<CloudDevice>, CloudError> {
        self.get(&format!("/v1.0/devices/{device_id}"), access_token).await
    }

    async fn get_iot_device(
        &self,
        access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<CloudDevice>, CloudError> {
        self.get(&format!("/v1.0/iot-03/devices/{device_id}"), access_token).await
    }

    async fn get_specification(
        &self,
        access_token: &str,
        device_id: &str,
    ) -> Result<Envelope<Specification>, CloudError> {
        self.get(&format!("/v1.0/iot-03/devices/{device_id}/specification"), access_token).await
    }

    async fn batch_status(
        &self,
        access_token: &str,
        device_ids: &[String],
    ) -> Result<Envelope<Vec<OnlineStatus>>, CloudError> {
        let sign_path = "/v1.0/iot-03/devices/status";
        let request_path = format!("{sign_path}?device_ids={}", device_ids.join(","));
        self.execute(Method::GET, sign_path, &request_path, Some(access_token), None).await
    }

    async fn send_command(
        &self,
        access_token: &str,
        device_id: &str,
        endpoint: CommandEndpoint,
        commands: &[Command],
    ) -> Result<Envelope<bool>, CloudError> {
        self.post(&endpoint.path(device_id), access_token, &CommandsBody { commands }).await
    }

    async fn send_ir_ac_command(
        &self,
        access_token: &str,
        infrared_id: &str,
        remote_id: &str,
        code: &str,
        value: i64,
    ) -> Result<Envelope<bool>, CloudError> {
        let path = format!("/v2.0/infrareds/{infrared_id}/air-conditioners/{remote_id}/command");
        self.post(&path, access_token, &IrAcBody { code, value }).await
    }
}
