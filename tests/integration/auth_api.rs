//! Registration, login and token handling

use axum::http::{header, HeaderValue, StatusCode};
use serde_json::{json, Value};

use crate::common::{TestContext, PASSWORD};

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sleepy_sam").await;

    let response = ctx.get("/api/auth/me", &user).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let me: Value = response.json();
    assert_eq!(me["id"], user.id.as_str());
    assert_eq!(me["username"], "sleepy_sam");
    assert!(me.get("password_hash").is_none());
    assert!(me.get("salt").is_none());
}

#[tokio::test]
async fn test_register_creates_default_profile() {
    let ctx = TestContext::new().await;
    let user = ctx.register("profiled").await;

    let profile = ctx
        .state
        .db
        .get_profile_by_user(&user.id)
        .await
        .unwrap()
        .expect("profile created on registration");
    assert_eq!(profile.target_sleep_hours, 8.0);
    assert_eq!(profile.timezone, "UTC");
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let ctx = TestContext::new().await;
    ctx.register("twin").await;

    let response = ctx
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": "twin",
            "email": "other@example.com",
            "password": PASSWORD,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/api/auth/register")
        .json(&json!({
            "username": "has spaces",
            "email": "not-an-email",
            "password": "short",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "ValidationError");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["username", "email", "password"]);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let ctx = TestContext::new().await;
    ctx.register("careful").await;

    let response = ctx
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": "careful", "password": "wrong password" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": "nobody", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let ctx = TestContext::new().await;
    let user = ctx.register("bearer").await;

    let response = ctx
        .server
        .get("/api/auth/me")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", user.token)).unwrap(),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_and_tampered_tokens_rejected() {
    let ctx = TestContext::new().await;
    let mut user = ctx.register("tamper").await;

    let response = ctx.server.get("/api/sleep-sessions").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    user.token.push('0');
    let response = ctx.get("/api/sleep-sessions", &user).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_expires() {
    let ctx = TestContext::new().await;
    let user = ctx.register("expiring").await;

    let ttl = ctx.state.config.token_ttl_seconds;
    ctx.clock.advance(chrono::Duration::seconds(ttl + 1));

    let response = ctx.get("/api/auth/me", &user).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await;

    let response = ctx.server.get("/api/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}
