use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, DEFAULT_TIMEOUT};
use crate::errors::Error;
use crate::session::{HttpSessionService, RemoteSessionService};
use crate::token::{
    DEFAULT_REFRESH_INTERVAL, FileTokenStore, MemoryTokenStore, RefreshCoordinator, RefreshPolicy,
    TokenStore,
};

use super::AuthenticatedHttpClient;

/// Assembles an [`AuthenticatedHttpClient`] and its collaborators.
///
/// Anything left unset falls back to: system clock, in-memory store, and an
/// [`HttpSessionService`] pointed at the same base URL.
pub struct ClientBuilder {
    base_url: String,
    refresh_interval: Duration,
    timeout: Duration,
    user_agent: Option<String>,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn TokenStore>>,
    session: Option<Arc<dyn RemoteSessionService>>,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            clock: None,
            store: None,
            session: None,
        }
    }

    /// Seeds every option from `config`, including a file store when
    /// `token_path` is set.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mut builder = Self::new(config.base_url.clone())
            .refresh_interval(config.refresh_interval()?)
            .timeout(config.timeout())
            .user_agent(config.user_agent());
        if let Some(path) = config.token_path.as_deref() {
            builder = builder.store(Arc::new(FileTokenStore::new(path)));
        }
        Ok(builder)
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn session(mut self, session: Arc<dyn RemoteSessionService>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> Result<AuthenticatedHttpClient, Error> {
        let base_url = Config::from_values(self.base_url, None, None, None, None).base_url()?;
        let policy = RefreshPolicy::new(self.refresh_interval)?;
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("assemblie-client/{}", env!("CARGO_PKG_VERSION")));
        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(user_agent)
            .build()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::with_clock(Arc::clone(&clock))));
        let session = self
            .session
            .unwrap_or_else(|| default_session(http.clone(), base_url.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::clone(&store), session));

        Ok(AuthenticatedHttpClient {
            http,
            base_url,
            policy,
            clock,
            store,
            coordinator,
        })
    }
}

fn default_session(http: Client, base_url: Url) -> Arc<dyn RemoteSessionService> {
    Arc::new(HttpSessionService::new(http, base_url))
}
