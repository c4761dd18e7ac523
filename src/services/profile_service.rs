use crate::config::WechatConfig;
use crate::domain::profile::UserProfile;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Joins a correlation open id back to subscriber profile data. Behind a
/// trait so tests can substitute a stub for the platform API.
#[async_trait]
pub trait ProfileFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch_profile(&self, open_id: &str) -> Result<UserProfile>;
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    subscribe: Option<i64>,
    openid: Option<String>,
    nickname: Option<String>,
    language: Option<String>,
    city: Option<String>,
    province: Option<String>,
    country: Option<String>,
    headimgurl: Option<String>,
    unionid: Option<String>,
    remark: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

/// WeChat platform API client. Obtains a client-credential access token and
/// fetches the subscriber profile for an open id.
///
/// Platform errors arrive as `errcode`/`errmsg` inside an otherwise-200 JSON
/// body, so every response is checked for them before its payload is used.
#[derive(Clone, Debug)]
pub struct WechatProfileClient {
    http: reqwest::Client,
    config: WechatConfig,
}

impl WechatProfileClient {
    #[must_use]
    pub fn new(config: WechatConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    async fn access_token(&self) -> Result<String> {
        let url = format!("{}/cgi-bin/token", self.config.api_base);
        let response: AccessTokenResponse = self
            .http
            .get(&url)
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", self.config.app_id.as_str()),
                ("secret", self.config.app_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Platform(format!("access token request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Platform(format!("access token response malformed: {e}")))?;

        if let Some(code) = response.errcode.filter(|&c| c != 0) {
            return Err(AppError::Platform(format!(
                "access token rejected: {code} - {}",
                response.errmsg.unwrap_or_default()
            )));
        }

        response.access_token.ok_or_else(|| AppError::Platform("access token missing from response".to_string()))
    }
}

#[async_trait]
impl ProfileFetcher for WechatProfileClient {
    /// # Errors
    /// Returns `AppError::Platform` if the platform API is unreachable or
    /// reports an error code.
    #[tracing::instrument(err(level = "warn"), skip_all)]
    async fn fetch_profile(&self, open_id: &str) -> Result<UserProfile> {
        let token = self.access_token().await?;

        let url = format!("{}/cgi-bin/user/info", self.config.api_base);
        let response: UserInfoResponse = self
            .http
            .get(&url)
            .query(&[("access_token", token.as_str()), ("openid", open_id), ("lang", "zh_CN")])
            .send()
            .await
            .map_err(|e| AppError::Platform(format!("user info request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Platform(format!("user info response malformed: {e}")))?;

        if let Some(code) = response.errcode.filter(|&c| c != 0) {
            return Err(AppError::Platform(format!(
                "user info rejected: {code} - {}",
                response.errmsg.unwrap_or_default()
            )));
        }

        Ok(UserProfile {
            open_id: response.openid.unwrap_or_else(|| open_id.to_string()),
            nickname: response.nickname.unwrap_or_default(),
            avatar_url: response.headimgurl.unwrap_or_default(),
            language: response.language.unwrap_or_default(),
            country: response.country.unwrap_or_default(),
            province: response.province.unwrap_or_default(),
            city: response.city.unwrap_or_default(),
            subscribed: response.subscribe.unwrap_or(0) == 1,
            union_id: response.unionid,
            remark: response.remark.filter(|r| !r.is_empty()),
        })
    }
}
