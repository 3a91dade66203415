// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration tests for the API gateway
//!
//! These tests verify the full per-call sequence against mocked HTTP
//! responses: auth header application, local quota enforcement, the
//! single 401 refresh-and-retry, upstream throttling passthrough and
//! the bounded retry budget for transient failures.

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

use strava_mcp_server::clock::ManualClock;
use strava_mcp_server::errors::StravaError;
use strava_mcp_server::gateway::StravaGateway;
use strava_mcp_server::rate_limit::{RateLimiter, RateWindow};
use strava_mcp_server::token::{Credential, MemoryCredentialStore, TokenManager};

struct Harness {
    gateway: StravaGateway,
    clock: Arc<ManualClock>,
}

/// Gateway wired to a mock server with a credential valid for 6 hours
fn harness(server: &mockito::Server) -> Harness {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(now));

    let store = Arc::new(MemoryCredentialStore::new(Credential {
        access_token: "valid_token".to_string(),
        refresh_token: "refresh_token".to_string(),
        expires_at: now + Duration::hours(6),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
    }));

    let tokens = Arc::new(TokenManager::with_token_url(
        store,
        clock.clone(),
        format!("{}/oauth/token", server.url()),
    ));
    let limiter = Arc::new(RateLimiter::new(clock.clone()));
    let gateway = StravaGateway::with_base_url(tokens, limiter, server.url());

    Harness { gateway, clock }
}

fn mock_activity(id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Morning Run",
        "type": "Run",
        "start_date": "2024-01-15T08:00:00Z",
        "moving_time": 1800,
        "distance": 5000.0,
        "average_heartrate": 135.0
    })
}

#[tokio::test]
async fn test_fetch_applies_bearer_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/activities/42")
        .match_header("authorization", "Bearer valid_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_activity(42).to_string())
        .create_async()
        .await;

    let harness = harness(&server);
    let activity = harness.gateway.get_activity(42).await.unwrap();

    assert_eq!(activity.id, 42);
    assert_eq!(activity.distance_meters, Some(5000.0));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_list_activities_passes_per_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/athlete/activities")
        .match_query(mockito::Matcher::UrlEncoded(
            "per_page".to_string(),
            "2".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([mock_activity(1), mock_activity(2)]).to_string())
        .create_async()
        .await;

    let harness = harness(&server);
    let activities = harness.gateway.list_activities(Some(2)).await.unwrap();

    assert_eq!(activities.len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_single_401_refreshes_and_retries_once() {
    let mut server = mockito::Server::new_async().await;

    // The stale token is rejected; the rotated one succeeds. Matching
    // on the auth header proves the retry used the refreshed token.
    let stale = server
        .mock("GET", "/activities/42")
        .match_header("authorization", "Bearer valid_token")
        .with_status(401)
        .with_body(json!({"message": "Authorization Error"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let rotated = server
        .mock("GET", "/activities/42")
        .match_header("authorization", "Bearer rotated_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_activity(42).to_string())
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/oauth/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "rotated_token",
                "refresh_token": "rotated_refresh",
                "expires_in": 21600
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let harness = harness(&server);
    let activity = harness.gateway.get_activity(42).await.unwrap();

    assert_eq!(activity.id, 42);
    stale.assert_async().await;
    rotated.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_second_401_fails_with_auth_error() {
    let mut server = mockito::Server::new_async().await;
    let unauthorized = server
        .mock("GET", "/activities/42")
        .with_status(401)
        .with_body(json!({"message": "Authorization Error"}).to_string())
        .expect(2)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/oauth/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "still_rejected",
                "refresh_token": "rotated_refresh",
                "expires_in": 21600
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let harness = harness(&server);
    let err = harness.gateway.get_activity(42).await.unwrap_err();

    assert!(matches!(err, StravaError::Auth(_)));
    unauthorized.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_upstream_429_surfaces_retry_after() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/athlete/activities")
        .with_status(429)
        .with_header("Retry-After", "900")
        .expect(1)
        .create_async()
        .await;

    let harness = harness(&server);
    let err = harness.gateway.list_activities(None).await.unwrap_err();

    match err {
        StravaError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(std::time::Duration::from_secs(900)));
        }
        other => panic!("unexpected error: {other}"),
    }
    // Provider-side throttling is never auto-retried
    mock.assert_async().await;
}

#[tokio::test]
async fn test_5xx_exhausts_retry_budget() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/athlete/activities")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let harness = harness(&server);
    let err = harness.gateway.list_activities(None).await.unwrap_err();

    match err {
        StravaError::UpstreamUnavailable { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unexpected_4xx_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/activities/9999")
        .with_status(404)
        .with_body("Record Not Found")
        .expect(1)
        .create_async()
        .await;

    let harness = harness(&server);
    let err = harness.gateway.get_activity(9999).await.unwrap_err();

    match err {
        StravaError::Api { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Record Not Found");
        }
        other => panic!("unexpected error: {other}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_local_rate_limit_blocks_before_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/athlete/activities")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(now));
    let store = Arc::new(MemoryCredentialStore::new(Credential {
        access_token: "valid_token".to_string(),
        refresh_token: "refresh_token".to_string(),
        expires_at: now + Duration::hours(6),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
    }));
    let tokens = Arc::new(TokenManager::with_token_url(
        store,
        clock.clone(),
        format!("{}/oauth/token", server.url()),
    ));
    // A single-admission short window: the second call must be gated
    // off locally with no HTTP attempt.
    let limiter = Arc::new(RateLimiter::with_windows(
        clock,
        RateWindow::new(Duration::seconds(900), 1),
        RateWindow::new(Duration::seconds(86_400), 1000),
    ));
    let gateway = StravaGateway::with_base_url(tokens, limiter, server.url());

    gateway.list_activities(None).await.unwrap();
    let err = gateway.list_activities(None).await.unwrap_err();

    assert!(matches!(err, StravaError::RateLimited { .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_activity_payload_is_validation_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/athlete/activities")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([{"id": "not-a-number"}]).to_string())
        .create_async()
        .await;

    let harness = harness(&server);
    let err = harness.gateway.list_activities(None).await.unwrap_err();
    assert!(matches!(err, StravaError::Validation(_)));
}

#[tokio::test]
async fn test_expired_credential_refreshed_before_fetch() {
    let mut server = mockito::Server::new_async().await;
    let refresh = server
        .mock("POST", "/oauth/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "fresh_token",
                "refresh_token": "fresh_refresh",
                "expires_in": 21600
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let fetch = server
        .mock("GET", "/activities/42")
        .match_header("authorization", "Bearer fresh_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_activity(42).to_string())
        .expect(1)
        .create_async()
        .await;

    let harness = harness(&server);
    // Push the clock past the credential expiry before fetching
    harness.clock.advance(Duration::hours(12));

    let activity = harness.gateway.get_activity(42).await.unwrap();
    assert_eq!(activity.id, 42);
    refresh.assert_async().await;
    fetch.assert_async().await;
}
