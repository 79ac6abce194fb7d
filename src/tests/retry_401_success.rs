use std::sync::Arc;
use std::time::Duration;

use jiff::SignedDuration;
use reqwest::StatusCode;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::clock::{Clock, ManualClock};
use crate::request::ApiRequest;
use crate::tests::test_support::{capture_logs, client, drain_logs, mount_refresh, store_with};
use crate::token::{AccessToken, TokenStore};

async fn mount_events(server: &MockServer, bearer: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(header("Authorization", format!("Bearer {}", bearer).as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!([])))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn retries_once_after_401_then_succeeds() {
    let server = MockServer::start().await;
    let clock = Arc::new(ManualClock::default());
    let store = store_with("old", &clock, SignedDuration::from_mins(1));

    mount_events(&server, "old", 401, 1).await;
    mount_events(&server, "new", 200, 1).await;
    mount_refresh(&server, "old", "new", Duration::ZERO, 1).await;

    let client = client(&server.uri(), store.clone(), clock.clone());
    let (lines, guard) = capture_logs();
    let resp = client
        .send(ApiRequest::get("/api/events"))
        .await
        .expect("request completes");
    drop(guard);

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(store.get_token().await.unwrap(), Some(AccessToken::new("new")));
    assert_eq!(store.get_issued_at().await.unwrap(), Some(clock.now()));

    let logs = drain_logs(lines);
    assert!(
        logs.iter()
            .any(|line| line.contains("WARN") && line.contains("401")),
        "expected warning log mentioning 401, got: {:?}",
        logs
    );
    assert!(
        logs.iter().any(|line| line.contains("replay.outcome")),
        "expected replay outcome log, got: {:?}",
        logs
    );
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    let clock = Arc::new(ManualClock::default());
    let store = store_with("old", &clock, SignedDuration::from_mins(1));

    mount_events(&server, "old", 401, 3).await;
    mount_events(&server, "new", 200, 3).await;
    // slow refresh so every 401 lands while it is still pending
    mount_refresh(&server, "old", "new", Duration::from_millis(300), 1).await;

    let client = client(&server.uri(), store.clone(), clock);
    let (a, b, c) = tokio::join!(
        client.send(ApiRequest::get("/api/events")),
        client.send(ApiRequest::get("/api/events")),
        client.send(ApiRequest::get("/api/events")),
    );

    for resp in [a, b, c] {
        assert_eq!(resp.expect("request completes").status(), StatusCode::OK);
    }
    assert_eq!(client.coordinator().refreshes_started(), 1);
    assert!(!client.coordinator().is_refreshing());
    assert_eq!(store.get_token().await.unwrap(), Some(AccessToken::new("new")));
}

#[tokio::test]
async fn replay_keeps_method_query_and_body() {
    let server = MockServer::start().await;
    let clock = Arc::new(ManualClock::default());
    let store = store_with("old", &clock, SignedDuration::from_mins(1));

    Mock::given(method("POST"))
        .and(path("/api/teams/7/schedules"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/teams/7/schedules"))
        .and(header("Authorization", "Bearer new"))
        .and(wiremock::matchers::query_param("week", "12"))
        .and(wiremock::matchers::body_json(serde_json::json!({"slot": "am"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "old", "new", Duration::ZERO, 1).await;

    let client = client(&server.uri(), store, clock);
    let request = ApiRequest::post("api/teams/7/schedules")
        .query("week", "12")
        .json(&serde_json::json!({"slot": "am"}))
        .unwrap();
    let resp = client.send(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn late_401_for_rotated_token_replays_without_second_refresh() {
    let server = MockServer::start().await;
    let clock = Arc::new(ManualClock::default());
    let store = store_with("old", &clock, SignedDuration::from_mins(1));

    mount_events(&server, "old", 401, 1).await;
    mount_events(&server, "new", 200, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/reports"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/reports"))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "old", "new", Duration::ZERO, 1).await;
    mount_refresh(&server, "new", "newer", Duration::ZERO, 0).await;

    let client = client(&server.uri(), store.clone(), clock);
    let (events, reports) = tokio::join!(
        client.send(ApiRequest::get("/api/events")),
        client.send(ApiRequest::get("/api/reports")),
    );
    assert_eq!(events.unwrap().status(), StatusCode::OK);
    assert_eq!(reports.unwrap().status(), StatusCode::OK);

    // the token issued to the first replay is still the live one
    let again = client.send(ApiRequest::get("/api/events")).await.unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(client.coordinator().refreshes_started(), 1);
    assert_eq!(store.get_token().await.unwrap(), Some(AccessToken::new("new")));
}
