use std::sync::Arc;

use reqwest::{Client, Url};

use crate::clock::Clock;
use crate::token::{RefreshCoordinator, RefreshPolicy, TokenStore};

mod builder;
mod impls;

pub use builder::ClientBuilder;

/// HTTP client that keeps a bearer token attached and fresh.
///
/// Clones share the token store and the refresh coordinator, so concurrent
/// requests from any clone never start more than one refresh.
#[derive(Clone)]
pub struct AuthenticatedHttpClient {
    http: Client,
    base_url: Url,
    policy: RefreshPolicy,
    clock: Arc<dyn Clock>,
    store: Arc<dyn TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
}
