//! read configuration from a file or the environment

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::errors::Error;
use crate::token::DEFAULT_REFRESH_INTERVAL;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub enum ConfigLocation {
    File(String),
    Env,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default)]
    pub refresh_interval_ms: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Where the token record is persisted. Kept in memory when unset.
    #[serde(default)]
    pub token_path: Option<String>,
}

pub fn read_config(loc: ConfigLocation) -> Result<Config, Error> {
    match loc {
        ConfigLocation::File(path) => Config::from_file(path),
        ConfigLocation::Env => Config::from_env(),
    }
}

impl Config {
    pub fn from_values(
        base_url: impl Into<String>,
        refresh_interval_ms: Option<u64>,
        timeout_secs: Option<u64>,
        user_agent: Option<String>,
        token_path: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_interval_ms,
            timeout_secs,
            user_agent,
            token_path,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Reads `ASSEMBLIE_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("ASSEMBLIE_BASE_URL")
            .ok_or_else(|| Error::Config("Missing ASSEMBLIE_BASE_URL env var".to_string()))?;
        Ok(Self {
            base_url,
            refresh_interval_ms: parse_number(&lookup, "ASSEMBLIE_REFRESH_INTERVAL_MS")?,
            timeout_secs: parse_number(&lookup, "ASSEMBLIE_TIMEOUT_SECS")?,
            user_agent: lookup("ASSEMBLIE_USER_AGENT"),
            token_path: lookup("ASSEMBLIE_TOKEN_PATH"),
        })
    }

    /// Base URL with a scheme and a trailing slash, ready for `Url::join`.
    pub fn base_url(&self) -> Result<Url, Error> {
        let raw = self.base_url.trim();
        if raw.is_empty() {
            return Err(Error::Config("Base URL is empty".into()));
        }
        let with_scheme = if raw.starts_with("http") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };
        let normalized = if with_scheme.ends_with('/') {
            with_scheme
        } else {
            format!("{}/", with_scheme)
        };
        Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", normalized, e)))
    }

    pub fn refresh_interval(&self) -> Result<Duration, Error> {
        match self.refresh_interval_ms {
            None => Ok(DEFAULT_REFRESH_INTERVAL),
            Some(0) => Err(Error::Config("refresh_interval_ms must be > 0".into())),
            Some(ms) => Ok(Duration::from_millis(ms)),
        }
    }

    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_TIMEOUT,
        }
    }

    pub fn user_agent(&self) -> String {
        match self.user_agent.as_deref() {
            Some(agent) if !agent.is_empty() => agent.to_string(),
            _ => format!("assemblie-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn parse_number<F>(lookup: &F, key: &str) -> Result<Option<u64>, Error>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", key, raw, e)))
        })
        .transpose()
}
