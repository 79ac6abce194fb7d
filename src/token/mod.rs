mod coordinator;
mod policy;
mod record;
mod store;

pub use coordinator::{RefreshCoordinator, RefreshResult};
pub use policy::{DEFAULT_REFRESH_INTERVAL, RefreshPolicy};
pub use record::{AccessToken, TokenRecord};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
