//! Staff listings across users

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::TestContext;

#[tokio::test]
async fn test_admin_requires_staff() {
    let ctx = TestContext::new().await;
    let user = ctx.register("regular").await;

    let response = ctx.get("/api/admin/sleep-sessions", &user).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = ctx.server.get("/api/admin/profiles").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_sees_every_users_sessions() {
    let ctx = TestContext::new().await;
    let staff = ctx.register_staff("staff").await;
    let alice = ctx.register("alice").await;
    let bob = ctx.register("bob").await;

    ctx.create_session(&alice, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", Some(5))
        .await;
    ctx.create_session(&bob, "2024-06-10T23:00:00Z", "2024-06-11T06:00:00Z", Some(2))
        .await;
    ctx.post("/api/sleep-sessions", &bob)
        .json(&json!({
            "sleep_time": "2024-06-11T23:00:00Z",
            "wake_time": "2024-06-12T07:00:00Z",
            "notes": "Noisy neighbours",
        }))
        .await;

    let page: Value = ctx.get("/api/admin/sleep-sessions", &staff).await.json();
    assert_eq!(page["count"], 3);

    let page: Value = ctx
        .get("/api/admin/sleep-sessions", &staff)
        .add_query_param("search", "alice")
        .await
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["username"], "alice");
    assert_eq!(page["results"][0]["quality_label"], "Excellent");

    let page: Value = ctx
        .get("/api/admin/sleep-sessions", &staff)
        .add_query_param("search", "neighbours")
        .await
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["username"], "bob");

    let page: Value = ctx
        .get("/api/admin/sleep-sessions", &staff)
        .add_query_param("quality_rating", 2)
        .await
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["user_id"], bob.id.as_str());
}

#[tokio::test]
async fn test_admin_profile_and_reminder_filters() {
    let ctx = TestContext::new().await;
    let staff = ctx.register_staff("staff").await;
    let quiet = ctx.register("quiet").await;
    ctx.register("chatty").await;

    let profile_id = ctx.profile_id(&quiet).await;
    ctx.patch(&format!("/api/profiles/{}", profile_id), &quiet)
        .json(&json!({ "notification_enabled": false }))
        .await;

    let page: Value = ctx
        .get("/api/admin/profiles", &staff)
        .add_query_param("notification_enabled", false)
        .await
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["username"], "quiet");

    let page: Value = ctx.get("/api/admin/profiles", &staff).await.json();
    assert_eq!(page["count"], 3);

    for (reminder_type, active) in [("bedtime", true), ("wake", false)] {
        ctx.post("/api/reminders", &quiet)
            .json(&json!({
                "reminder_type": reminder_type,
                "reminder_time": "22:00:00",
                "is_active": active,
            }))
            .await;
    }

    let page: Value = ctx
        .get("/api/admin/reminders", &staff)
        .add_query_param("reminder_type", "wake")
        .await
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["is_active"], false);

    let page: Value = ctx
        .get("/api/admin/reminders", &staff)
        .add_query_param("is_active", true)
        .await
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["reminder_type"], "bedtime");
}

#[tokio::test]
async fn test_admin_goals_and_statistics() {
    let ctx = TestContext::new().await;
    let staff = ctx.register_staff("staff").await;
    let user = ctx.register("tracked").await;

    ctx.post("/api/goals", &user)
        .json(&json!({ "target_bedtime": "22:00:00", "target_wake_time": "06:00:00" }))
        .await;
    ctx.create_session(&user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", None)
        .await;
    ctx.post("/api/statistics/recalculate", &user)
        .json(&json!({ "date": "2024-06-10" }))
        .await;

    let goals: Value = ctx.get("/api/admin/goals", &staff).await.json();
    assert_eq!(goals["count"], 1);
    assert_eq!(goals["results"][0]["username"], "tracked");

    let stats: Value = ctx
        .get("/api/admin/statistics", &staff)
        .add_query_param("period_type", "monthly")
        .await
        .json();
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["results"][0]["date"], "2024-06-01");
}
