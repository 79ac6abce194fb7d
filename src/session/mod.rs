mod api;
mod service;

pub use api::SessionApi;
pub use service::{Credentials, HttpSessionService, RemoteSessionService, SessionGrant};
