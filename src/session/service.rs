use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::errors::{Error, RefreshError};
use crate::token::AccessToken;

pub const REFRESH_PATH: &str = "api/session/refresh";
pub const LOGIN_PATH: &str = "api/session/login";
pub const GUEST_LOGIN_PATH: &str = "api/session/guest-login";
pub const SIGNUP_PATH: &str = "api/users";

/// Backend endpoint that trades a still-valid token for a new one.
#[async_trait]
pub trait RemoteSessionService: Send + Sync {
    async fn refresh(&self, current: &AccessToken) -> Result<AccessToken, RefreshError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize)]
struct GrantResponse {
    #[serde(default)]
    token: Option<AccessToken>,
    #[serde(default)]
    user: Option<Value>,
}

/// Token plus whatever user payload the backend returns with it.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionGrant {
    pub token: AccessToken,
    #[serde(default)]
    pub user: Option<Value>,
}

#[derive(Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Talks to `/api/session/*` with a plain reqwest client, outside the
/// authenticated request stages.
#[derive(Clone)]
pub struct HttpSessionService {
    http: Client,
    base_url: Url,
}

impl HttpSessionService {
    pub fn new(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionGrant, Error> {
        let body = serde_json::to_value(Credentials { email, password })?;
        self.exchange(LOGIN_PATH, &body).await
    }

    pub async fn guest_login(&self) -> Result<SessionGrant, Error> {
        self.exchange(GUEST_LOGIN_PATH, &Value::Object(Default::default()))
            .await
    }

    /// Creates an account. The payload shape belongs to the backend.
    pub async fn signup(&self, user: &Value) -> Result<SessionGrant, Error> {
        self.exchange(SIGNUP_PATH, user).await
    }

    async fn exchange(&self, path: &str, body: &Value) -> Result<SessionGrant, Error> {
        let url = self.base_url.join(path)?;
        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(serde_json::to_vec(body)?)
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        let grant: GrantResponse = serde_json::from_slice(&bytes)?;
        match grant.token {
            Some(token) if !token.is_empty() => {
                info!(path, "session.granted");
                Ok(SessionGrant {
                    token,
                    user: grant.user,
                })
            }
            _ => Err(Error::Session(format!("{path} response carried no token"))),
        }
    }
}

#[async_trait]
impl RemoteSessionService for HttpSessionService {
    async fn refresh(&self, current: &AccessToken) -> Result<AccessToken, RefreshError> {
        let url = self
            .base_url
            .join(REFRESH_PATH)
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, current.bearer())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            error!(status = status.as_u16(), "session refresh rejected");
            return Err(RefreshError::Rejected(status));
        }

        let bytes = resp.bytes().await?;
        let parsed: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;
        match parsed.token {
            Some(token) if !token.is_empty() => {
                info!("session refresh ok (len={})", token.len());
                Ok(AccessToken::new(token))
            }
            _ => Err(RefreshError::MissingToken),
        }
    }
}
