use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::client::AuthenticatedHttpClient;
use crate::errors::Error;
use crate::request::ApiRequest;
use crate::token::{TokenRecord, TokenStore};

use super::{HttpSessionService, SessionGrant};

pub const LOGOUT_PATH: &str = "api/session/logout";
pub const VERIFY_PATH: &str = "api/session/verify";
pub const CURRENT_PATH: &str = "api/session";

/// Login, logout and session lookups, keeping the token store in step.
#[derive(Clone)]
pub struct SessionApi {
    client: AuthenticatedHttpClient,
    service: HttpSessionService,
    store: Arc<dyn TokenStore>,
}

impl SessionApi {
    pub fn new(client: AuthenticatedHttpClient, service: HttpSessionService) -> Self {
        let store = client.store();
        Self {
            client,
            service,
            store,
        }
    }

    /// Uses the client's own HTTP pool and base URL for credential exchanges.
    pub fn from_client(client: AuthenticatedHttpClient) -> Self {
        let service = HttpSessionService::new(client.http().clone(), client.base_url().clone());
        Self::new(client, service)
    }

    pub fn client(&self) -> &AuthenticatedHttpClient {
        &self.client
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionGrant, Error> {
        let grant = self.service.login(email, password).await?;
        self.persist(&grant).await?;
        Ok(grant)
    }

    pub async fn guest_login(&self) -> Result<SessionGrant, Error> {
        let grant = self.service.guest_login().await?;
        self.persist(&grant).await?;
        Ok(grant)
    }

    pub async fn signup(&self, user: &Value) -> Result<SessionGrant, Error> {
        let grant = self.service.signup(user).await?;
        self.persist(&grant).await?;
        Ok(grant)
    }

    /// Ends the session on the server, then clears the local token.
    ///
    /// The local token is cleared even when the server call fails.
    pub async fn logout(&self) -> Result<(), Error> {
        match self.client.send(ApiRequest::delete(LOGOUT_PATH)).await {
            Ok(resp) if resp.status().is_success() => info!("session.logout"),
            Ok(resp) => warn!(status = resp.status().as_u16(), "server rejected logout"),
            Err(err) => warn!(error = %err, "logout request failed"),
        }
        self.store.remove_token().await
    }

    /// True when the server accepts the current token.
    pub async fn verify(&self) -> Result<bool, Error> {
        let resp = self.client.send(ApiRequest::get(VERIFY_PATH)).await?;
        Ok(resp.status().is_success())
    }

    pub async fn current(&self) -> Result<Value, Error> {
        self.client.get_json(CURRENT_PATH).await
    }

    async fn persist(&self, grant: &SessionGrant) -> Result<TokenRecord, Error> {
        self.store
            .set_token_with_timestamp(grant.token.clone())
            .await
    }
}
