//! Sleep reminder endpoints

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::TestContext;

#[tokio::test]
async fn test_reminder_lifecycle() {
    let ctx = TestContext::new().await;
    let user = ctx.register("nudged").await;

    let response = ctx
        .post("/api/reminders", &user)
        .json(&json!({
            "reminder_type": "bedtime",
            "reminder_time": "22:00:00",
            "message": "Lights out",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let reminder: Value = response.json();
    assert_eq!(reminder["reminder_type"], "bedtime");
    assert_eq!(reminder["is_active"], true);
    assert!(reminder["last_sent"].is_null());

    let path = format!("/api/reminders/{}", reminder["id"].as_str().unwrap());

    let response = ctx
        .patch(&path, &user)
        .json(&json!({ "reminder_time": "21:45:00", "is_active": false }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let patched: Value = response.json();
    assert_eq!(patched["reminder_time"], "21:45:00");
    assert_eq!(patched["message"], "Lights out");

    let response = ctx
        .put(&path, &user)
        .json(&json!({ "reminder_type": "wake", "reminder_time": "06:30:00" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let replaced: Value = response.json();
    assert_eq!(replaced["reminder_type"], "wake");
    assert_eq!(replaced["message"], "");
    assert_eq!(replaced["is_active"], true);

    let list: Value = ctx.get("/api/reminders", &user).await.json();
    assert_eq!(list["count"], 1);

    assert_eq!(ctx.delete(&path, &user).await.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(ctx.get(&path, &user).await.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_last_sent_is_read_only() {
    let ctx = TestContext::new().await;
    let user = ctx.register("nudged").await;

    let reminder: Value = ctx
        .post("/api/reminders", &user)
        .json(&json!({
            "reminder_type": "log",
            "reminder_time": "09:00:00",
            "last_sent": "2024-06-01T09:00:00Z",
        }))
        .await
        .json();
    assert!(reminder["last_sent"].is_null());
}

#[tokio::test]
async fn test_reminder_validation() {
    let ctx = TestContext::new().await;
    let user = ctx.register("nudged").await;

    let response = ctx
        .post("/api/reminders", &user)
        .json(&json!({
            "reminder_type": "bedtime",
            "reminder_time": "22:00:00",
            "message": "z".repeat(1001),
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = ctx
        .post("/api/reminders", &user)
        .json(&json!({ "reminder_type": "nap", "reminder_time": "14:00:00" }))
        .await;
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_active_reminders_and_ownership() {
    let ctx = TestContext::new().await;
    let user = ctx.register("nudged").await;
    let other = ctx.register("other").await;

    for (reminder_type, active) in [("bedtime", true), ("wake", false), ("log", true)] {
        ctx.post("/api/reminders", &user)
            .json(&json!({
                "reminder_type": reminder_type,
                "reminder_time": "08:00:00",
                "is_active": active,
            }))
            .await;
    }

    let active: Vec<Value> = ctx.get("/api/reminders/active", &user).await.json();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|r| r["is_active"] == true));

    let path = format!("/api/reminders/{}", active[0]["id"].as_str().unwrap());
    assert_eq!(ctx.get(&path, &other).await.status_code(), StatusCode::NOT_FOUND);

    let other_list: Value = ctx.get("/api/reminders", &other).await.json();
    assert_eq!(other_list["count"], 0);
}
