use reqwest::{Method, StatusCode};
use tracing::{Level, event};

/// Result of re-sending a request after a 401.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub method: Method,
    pub path: String,
    pub refreshed: bool,
    pub status: Option<StatusCode>,
}

impl ReplayOutcome {
    pub fn log(&self) {
        let status = self.status.map(|s| s.as_u16());
        event!(
            Level::INFO,
            method = %self.method,
            path = %self.path,
            refreshed = self.refreshed,
            status = ?status,
            "replay.outcome"
        );
    }
}
