#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use assemblie_client::{AuthenticatedHttpClient, MemoryTokenStore, TokenStore};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub async fn seeded_store(token: &str) -> Arc<MemoryTokenStore> {
    let store = Arc::new(MemoryTokenStore::new());
    store
        .set_token_with_timestamp(token.into())
        .await
        .expect("seed store");
    store
}

pub fn client(server: &MockServer, store: Arc<dyn TokenStore>) -> AuthenticatedHttpClient {
    AuthenticatedHttpClient::builder(server.uri())
        .store(store)
        .build()
        .expect("client builds")
}

pub async fn mount_refresh(server: &MockServer, from: &str, to: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/session/refresh"))
        .and(header("Authorization", format!("Bearer {}", from).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": to })))
        .expect(times)
        .mount(server)
        .await;
}

/// Unique path under the system temp dir; the file is not created.
pub fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("assemblie-{}-{}.json", label, uuid::Uuid::new_v4()))
}
