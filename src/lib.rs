//! Authenticated HTTP access to the Assemblie service.
//!
//! Every request passes through [`AuthenticatedHttpClient`], which attaches
//! the stored bearer token, refreshes it once it is older than the configured
//! interval, and on a 401 refreshes (at most one refresh in flight) and
//! replays the request once.

pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod request;
pub mod session;
pub mod telemetry;
pub mod token;

pub use client::{AuthenticatedHttpClient, ClientBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigLocation, read_config};
pub use errors::{Error, RefreshError};
pub use request::{ApiRequest, MultipartPayload, RequestBody};
pub use session::{HttpSessionService, RemoteSessionService, SessionApi, SessionGrant};
pub use token::{
    AccessToken, FileTokenStore, MemoryTokenStore, RefreshCoordinator, RefreshPolicy, TokenRecord,
    TokenStore,
};

#[cfg(test)]
mod tests;
