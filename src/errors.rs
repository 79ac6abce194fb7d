use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// No response was received, or reqwest rejected the request before sending.
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("token store error: {0}")]
    Store(String),
    /// A credential exchange succeeded at the HTTP level but granted no session.
    #[error("session error: {0}")]
    Session(String),
    #[error("token refresh failed: {0}")]
    Refresh(#[from] RefreshError),
}

/// Outcome of a failed refresh.
///
/// Cloneable because every caller waiting on the same in-flight refresh
/// receives its own copy of the result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no stored token to refresh")]
    NoToken,
    #[error("refresh rejected with status {0}")]
    Rejected(StatusCode),
    #[error("refresh response carried no token")]
    MissingToken,
    #[error("malformed refresh response: {0}")]
    Malformed(String),
    #[error("refresh transport error: {0}")]
    Transport(String),
    #[error("could not persist refreshed token: {0}")]
    Store(String),
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        RefreshError::Transport(err.to_string())
    }
}
