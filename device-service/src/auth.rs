use crate::error::{Result, ServiceError};
use gateway_core::cloud::CloudApi;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub expire_time: i64,
    pub refresh_token: String,
    pub uid: String,
}

/// Obtains cloud access tokens. A configured user id replaces the uid the
/// cloud reports, so device listing and tokens agree on one account.
#[derive(Clone)]
pub struct TokenService {
    cloud: Arc<dyn CloudApi>,
    user_id: Option<String>,
}

impl TokenService {
    pub fn new(cloud: Arc<dyn CloudApi>, user_id: Option<String>) -> Self {
        Self { cloud, user_id: user_id.filter(|u| !u.is_empty()) }
    }

    pub async fn authenticate(&self) -> Result<AuthToken> {
        let env = self.cloud.get_token().await?;
        if !env.success {
            return Err(ServiceError::upstream("tuya API authentication failed", &env));
        }
        let token = env.result.unwrap_or_default();
        let uid = self.user_id.clone().unwrap_or(token.uid);
        tracing::info!(uid = %uid, expire_time = token.expire_time, "obtained access token");
        Ok(AuthToken {
            access_token: token.access_token,
            expire_time: token.expire_time,
            refresh_token: token.refresh_token,
            uid,
        })
    }
}
