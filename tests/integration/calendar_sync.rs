//! Google Calendar connection and background sync against a mock Google

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use ambidream::models::SleepSession;

use crate::common::{TestContext, TestUser};

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";

async fn mock_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-123",
            "expires_in": 3599,
        })))
        .mount(server)
        .await;
}

async fn connect(ctx: &TestContext, user: &TestUser) -> String {
    let profile_id = ctx.profile_id(user).await;
    let response = ctx
        .post(&format!("/api/profiles/{}/connect_google_calendar", profile_id), user)
        .json(&json!({ "refresh_token": "refresh-abc" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
    profile_id
}

/// Poll until the session satisfies `done`
async fn wait_for_session<F>(ctx: &TestContext, id: &str, done: F) -> SleepSession
where
    F: Fn(&SleepSession) -> bool,
{
    for _ in 0..100 {
        if let Some(session) = ctx.state.db.get_session_by_id(id).await.unwrap() {
            if done(&session) {
                return session;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session {} never reached the expected state", id);
}

/// Poll until the mock server has seen `count` requests matching the filter
async fn wait_for_requests<F>(server: &MockServer, count: usize, filter: F) -> Vec<Request>
where
    F: Fn(&Request) -> bool,
{
    for _ in 0..100 {
        let matching: Vec<Request> = server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| filter(request))
            .collect();
        if matching.len() >= count {
            return matching;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {} matching requests", count);
}

#[tokio::test]
async fn test_connect_with_refresh_token() {
    let google = MockServer::start().await;
    mock_token_endpoint(&google).await;
    let ctx = TestContext::with_calendar_server(&google.uri()).await;
    let user = ctx.register("synced").await;

    let profile_id = ctx.profile_id(&user).await;
    let response = ctx
        .post(&format!("/api/profiles/{}/connect_google_calendar", profile_id), &user)
        .json(&json!({ "refresh_token": "refresh-abc" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "Google Calendar connected successfully");
    assert_eq!(body["enabled"], true);

    let profile = ctx.state.db.get_profile_by_user(&user.id).await.unwrap().unwrap();
    assert!(profile.google_calendar_enabled);
    assert_eq!(profile.google_refresh_token.as_deref(), Some("refresh-abc"));

    let response = ctx
        .post(&format!("/api/profiles/{}/disconnect_google_calendar", profile_id), &user)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["enabled"], false);

    let profile = ctx.state.db.get_profile_by_user(&user.id).await.unwrap().unwrap();
    assert!(!profile.google_calendar_enabled);
    assert!(profile.google_refresh_token.is_none());
}

#[tokio::test]
async fn test_connect_with_authorization_code() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-123",
            "expires_in": 3599,
            "refresh_token": "refresh-from-code",
        })))
        .expect(1)
        .mount(&google)
        .await;
    mock_token_endpoint(&google).await;

    let ctx = TestContext::with_calendar_server(&google.uri()).await;
    let user = ctx.register("coded").await;
    let profile_id = ctx.profile_id(&user).await;

    let response = ctx
        .post(&format!("/api/profiles/{}/connect_google_calendar", profile_id), &user)
        .json(&json!({ "code": "auth-code", "redirect_uri": "http://localhost/callback" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let profile = ctx.state.db.get_profile_by_user(&user.id).await.unwrap().unwrap();
    assert_eq!(profile.google_refresh_token.as_deref(), Some("refresh-from-code"));
}

#[tokio::test]
async fn test_rejected_token_reports_error() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked.",
        })))
        .mount(&google)
        .await;

    let ctx = TestContext::with_calendar_server(&google.uri()).await;
    let user = ctx.register("revoked").await;
    let profile_id = ctx.profile_id(&user).await;

    let response = ctx
        .post(&format!("/api/profiles/{}/connect_google_calendar", profile_id), &user)
        .json(&json!({ "refresh_token": "stale" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("expired or revoked"));

    let profile = ctx.state.db.get_profile_by_user(&user.id).await.unwrap().unwrap();
    assert!(!profile.google_calendar_enabled);
}

#[tokio::test]
async fn test_session_lifecycle_mirrors_to_calendar() {
    let google = MockServer::start().await;
    mock_token_endpoint(&google).await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer access-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt-1",
            "summary": "Sleep (8.0h)",
        })))
        .expect(1)
        .mount(&google)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/evt-1", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt-1",
            "summary": "Sleep (7.0h)",
        })))
        .mount(&google)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/evt-1", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&google)
        .await;

    let ctx = TestContext::with_calendar_server(&google.uri()).await;
    let user = ctx.register("mirrored").await;
    connect(&ctx, &user).await;

    // Create: event inserted and recorded on the session
    let session = ctx
        .create_session(&user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", Some(4))
        .await;
    let id = session["id"].as_str().unwrap().to_string();
    let stored = wait_for_session(&ctx, &id, |s| s.synced_to_calendar).await;
    assert_eq!(stored.calendar_event_id.as_deref(), Some("evt-1"));

    let inserts = wait_for_requests(&google, 1, |r| r.method.as_str() == "POST" && r.url.path() == EVENTS_PATH).await;
    let event: Value = serde_json::from_slice(&inserts[0].body).unwrap();
    assert_eq!(event["summary"], "Sleep (8.0h)");
    assert_eq!(event["description"], "Sleep Quality: Good\nNotes: ");
    assert_eq!(event["colorId"], "9");

    // Update: existing event replaced
    let path = format!("/api/sleep-sessions/{}", id);
    let response = ctx
        .patch(&path, &user)
        .json(&json!({ "wake_time": "2024-06-11T05:00:00Z" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updates = wait_for_requests(&google, 1, |r| r.method.as_str() == "PUT").await;
    let event: Value = serde_json::from_slice(&updates[0].body).unwrap();
    assert_eq!(event["summary"], "Sleep (7.0h)");

    // Delete: event removed in the background
    assert_eq!(ctx.delete(&path, &user).await.status_code(), StatusCode::NO_CONTENT);
    wait_for_requests(&google, 1, |r| r.method.as_str() == "DELETE").await;
}

#[tokio::test]
async fn test_manual_sync_request() {
    let google = MockServer::start().await;
    mock_token_endpoint(&google).await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt-manual" })))
        .mount(&google)
        .await;

    let ctx = TestContext::with_calendar_server(&google.uri()).await;
    let user = ctx.register("manual").await;

    // Recorded before connecting, so nothing is synced yet
    let session = ctx
        .create_session(&user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", None)
        .await;
    let id = session["id"].as_str().unwrap().to_string();
    connect(&ctx, &user).await;

    let response = ctx
        .post(&format!("/api/sleep-sessions/{}/sync_to_calendar", id), &user)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "Sync initiated");

    let stored = wait_for_session(&ctx, &id, |s| s.synced_to_calendar).await;
    assert_eq!(stored.calendar_event_id.as_deref(), Some("evt-manual"));
}

#[tokio::test]
async fn test_failed_sync_leaves_session_unsynced() {
    let google = MockServer::start().await;
    mock_token_endpoint(&google).await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&google)
        .await;

    let ctx = TestContext::with_calendar_server(&google.uri()).await;
    let user = ctx.register("unlucky").await;
    connect(&ctx, &user).await;

    let session = ctx
        .create_session(&user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", None)
        .await;
    assert_eq!(session["synced_to_calendar"], false);

    wait_for_requests(&google, 1, |r| r.method.as_str() == "POST" && r.url.path() == EVENTS_PATH).await;
    let id = session["id"].as_str().unwrap();
    let stored = ctx.state.db.get_session_by_id(id).await.unwrap().unwrap();
    assert!(!stored.synced_to_calendar);
    assert!(stored.calendar_event_id.is_none());
}

#[tokio::test]
async fn test_upcoming_calendar_events() {
    let google = MockServer::start().await;
    mock_token_endpoint(&google).await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "evt-a", "summary": "Sleep (7.5h)" },
                { "id": "evt-b", "summary": "Dentist" },
            ]
        })))
        .mount(&google)
        .await;

    let ctx = TestContext::with_calendar_server(&google.uri()).await;
    let user = ctx.register("planner").await;
    let profile_id = connect(&ctx, &user).await;

    let response = ctx
        .get(&format!("/api/profiles/{}/calendar_events", profile_id), &user)
        .add_query_param("max_results", 5)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let events: Vec<Value> = response.json();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["id"], "evt-a");
    assert_eq!(events[1]["summary"], "Dentist");

    let requests = wait_for_requests(&google, 1, |r| r.method.as_str() == "GET").await;
    assert!(requests[0]
        .url
        .query_pairs()
        .any(|(key, value)| key == "maxResults" && value == "5"));
}
