mod common;

use assemblie_client::{
    AccessToken, ApiRequest, ClientBuilder, Config, ConfigLocation, FileTokenStore, SessionApi,
    TokenStore, read_config,
};
use reqwest::StatusCode;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(server: &MockServer, token_path: &std::path::Path) -> std::path::PathBuf {
    let cfg = serde_json::json!({
        "base_url": server.uri(),
        "refresh_interval_ms": 60_000,
        "token_path": token_path.display().to_string(),
    });
    let cfg_path = common::temp_path("config");
    std::fs::write(&cfg_path, serde_json::to_string(&cfg).unwrap()).unwrap();
    cfg_path
}

#[tokio::test]
async fn token_from_login_is_visible_to_a_second_client() {
    let server = MockServer::start().await;
    let token_path = common::temp_path("token");
    let cfg_path = write_config(&server, &token_path);

    Mock::given(method("POST"))
        .and(path("/api/session/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "disk"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(header("Authorization", "Bearer disk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = read_config(ConfigLocation::File(cfg_path.display().to_string())).unwrap();
    let first = ClientBuilder::from_config(&config).unwrap().build().unwrap();
    SessionApi::from_client(first)
        .login("ruth@example.org", "pw")
        .await
        .unwrap();

    let second = ClientBuilder::from_config(&Config::from_file(&cfg_path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let resp = second.send(ApiRequest::get("api/events")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let on_disk = FileTokenStore::new(&token_path);
    assert_eq!(
        on_disk.get_token().await.unwrap(),
        Some(AccessToken::new("disk"))
    );

    SessionApi::from_client(second).logout().await.unwrap();
    assert!(!token_path.exists());
    std::fs::remove_file(&cfg_path).ok();
}

#[tokio::test]
async fn reactive_refresh_rewrites_the_file() {
    let server = MockServer::start().await;
    let token_path = common::temp_path("token-refresh");
    let store = FileTokenStore::new(&token_path);
    store.set_token_with_timestamp("old".into()).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/api/teams"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/teams"))
        .and(header("Authorization", "Bearer rotated"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_refresh(&server, "old", "rotated", 1).await;

    let client = common::client(&server, std::sync::Arc::new(store));
    let resp = client.send(ApiRequest::get("api/teams")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let reopened = FileTokenStore::new(&token_path);
    assert_eq!(
        reopened.get_token().await.unwrap(),
        Some(AccessToken::new("rotated"))
    );
    reopened.remove_token().await.unwrap();
}
