//! Profile endpoints

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::TestContext;

#[tokio::test]
async fn test_me_and_list_return_own_profile() {
    let ctx = TestContext::new().await;
    let user = ctx.register("dreamer").await;
    ctx.register("someone_else").await;

    let me: Value = ctx.get("/api/profiles/me", &user).await.json();
    assert_eq!(me["user_id"], user.id.as_str());
    assert_eq!(me["notification_enabled"], true);
    assert_eq!(me["google_calendar_enabled"], false);
    assert!(me.get("google_refresh_token").is_none());

    let list: Value = ctx.get("/api/profiles", &user).await.json();
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["id"], me["id"]);

    let response = ctx.get(&format!("/api/profiles/{}", me["id"].as_str().unwrap()), &user).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile() {
    let ctx = TestContext::new().await;
    let user = ctx.register("dreamer").await;
    let path = format!("/api/profiles/{}", ctx.profile_id(&user).await);

    let response = ctx
        .patch(&path, &user)
        .json(&json!({
            "timezone": "America/New_York",
            "target_sleep_hours": 7.5,
            "notification_time": "21:30:00",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let profile: Value = response.json();
    assert_eq!(profile["timezone"], "America/New_York");
    assert_eq!(profile["target_sleep_hours"], 7.5);
    assert_eq!(profile["notification_time"], "21:30:00");

    // PUT accepts the same partial payload
    let response = ctx
        .put(&path, &user)
        .json(&json!({ "notification_enabled": false }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let stored: Value = ctx.get("/api/profiles/me", &user).await.json();
    assert_eq!(stored["notification_enabled"], false);
    assert_eq!(stored["timezone"], "America/New_York");
}

#[tokio::test]
async fn test_update_profile_validation() {
    let ctx = TestContext::new().await;
    let user = ctx.register("dreamer").await;
    let path = format!("/api/profiles/{}", ctx.profile_id(&user).await);

    let response = ctx
        .patch(&path, &user)
        .json(&json!({ "timezone": "Mars/Olympus_Mons" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["field"], "timezone");

    let response = ctx
        .patch(&path, &user)
        .json(&json!({ "target_sleep_hours": 0.5 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let stored: Value = ctx.get("/api/profiles/me", &user).await.json();
    assert_eq!(stored["timezone"], "UTC");
    assert_eq!(stored["target_sleep_hours"], 8.0);
}

#[tokio::test]
async fn test_other_profiles_are_not_found() {
    let ctx = TestContext::new().await;
    let user = ctx.register("dreamer").await;
    let other = ctx.register("other").await;
    let path = format!("/api/profiles/{}", ctx.profile_id(&other).await);

    assert_eq!(ctx.get(&path, &user).await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        ctx.patch(&path, &user)
            .json(&json!({ "target_sleep_hours": 6.0 }))
            .await
            .status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        ctx.post(&format!("{}/disconnect_google_calendar", path), &user)
            .await
            .status_code(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_connect_requires_code_or_token() {
    let ctx = TestContext::new().await;
    let user = ctx.register("dreamer").await;
    let path = format!(
        "/api/profiles/{}/connect_google_calendar",
        ctx.profile_id(&user).await
    );

    let response = ctx.post(&path, &user).json(&json!({})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_connect_fails_without_client_credentials() {
    let ctx = TestContext::new().await;
    let user = ctx.register("dreamer").await;
    let path = format!(
        "/api/profiles/{}/connect_google_calendar",
        ctx.profile_id(&user).await
    );

    let response = ctx
        .post(&path, &user)
        .json(&json!({ "refresh_token": "refresh-me" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let stored: Value = ctx.get("/api/profiles/me", &user).await.json();
    assert_eq!(stored["google_calendar_enabled"], false);
}

#[tokio::test]
async fn test_calendar_events_require_connection() {
    let ctx = TestContext::new().await;
    let user = ctx.register("dreamer").await;
    let path = format!("/api/profiles/{}/calendar_events", ctx.profile_id(&user).await);

    let response = ctx.get(&path, &user).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, json!({ "error": "Google Calendar not connected" }));
}
