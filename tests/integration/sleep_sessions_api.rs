//! Sleep session CRUD, filters and ownership

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::TestContext;

fn ids(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_derives_duration_and_label() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;

    let session = ctx
        .create_session(&user, "2024-06-10T22:30:00Z", "2024-06-11T06:45:00Z", Some(4))
        .await;

    assert_eq!(session["duration_hours"], 8.25);
    assert_eq!(session["quality_label"], "Good");
    assert_eq!(session["user_id"], user.id.as_str());
    assert_eq!(session["synced_to_calendar"], false);
    assert!(session["calendar_event_id"].is_null());
}

#[tokio::test]
async fn test_create_rejects_invalid_sessions() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;

    let cases = [
        json!({ "sleep_time": "2024-06-11T06:00:00Z", "wake_time": "2024-06-10T22:00:00Z" }),
        json!({ "sleep_time": "2024-06-10T00:00:00Z", "wake_time": "2024-06-11T01:00:00Z" }),
        json!({
            "sleep_time": "2024-06-10T22:00:00Z",
            "wake_time": "2024-06-11T06:00:00Z",
            "quality_rating": 6,
        }),
    ];

    for payload in cases {
        let response = ctx.post("/api/sleep-sessions", &user).json(&payload).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", payload);
    }

    let list: Value = ctx.get("/api/sleep-sessions", &user).await.json();
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_list_is_newest_first_and_filtered_by_date() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;

    let first = ctx
        .create_session(&user, "2024-06-01T22:00:00Z", "2024-06-02T06:00:00Z", None)
        .await;
    let second = ctx
        .create_session(&user, "2024-06-05T23:00:00Z", "2024-06-06T07:00:00Z", None)
        .await;
    let third = ctx
        .create_session(&user, "2024-06-09T21:00:00Z", "2024-06-10T05:00:00Z", None)
        .await;

    let page: Value = ctx.get("/api/sleep-sessions", &user).await.json();
    assert_eq!(page["count"], 3);
    assert_eq!(
        ids(&page),
        vec![
            third["id"].as_str().unwrap(),
            second["id"].as_str().unwrap(),
            first["id"].as_str().unwrap(),
        ]
    );

    // end_date includes sessions started on that day
    let page: Value = ctx
        .get("/api/sleep-sessions", &user)
        .add_query_param("start_date", "2024-06-02")
        .add_query_param("end_date", "2024-06-05")
        .await
        .json();
    assert_eq!(ids(&page), vec![second["id"].as_str().unwrap()]);
}

#[tokio::test]
async fn test_list_is_paginated() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;
    let page_size = ctx.state.page_size() as usize;

    for day in 1..=page_size + 2 {
        ctx.create_session(
            &user,
            &format!("2024-05-{:02}T22:00:00Z", day),
            &format!("2024-05-{:02}T06:00:00Z", day + 1),
            None,
        )
        .await;
    }

    let first: Value = ctx.get("/api/sleep-sessions", &user).await.json();
    assert_eq!(first["count"], page_size + 2);
    assert_eq!(first["results"].as_array().unwrap().len(), page_size);
    assert_eq!(first["next"], 2);
    assert!(first["previous"].is_null());

    let second: Value = ctx
        .get("/api/sleep-sessions", &user)
        .add_query_param("page", 2)
        .await
        .json();
    assert_eq!(second["results"].as_array().unwrap().len(), 2);
    assert!(second["next"].is_null());
    assert_eq!(second["previous"], 1);
}

#[tokio::test]
async fn test_full_and_partial_update_recompute_duration() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;
    let session = ctx
        .create_session(&user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", Some(3))
        .await;
    let path = format!("/api/sleep-sessions/{}", session["id"].as_str().unwrap());

    let response = ctx
        .put(&path, &user)
        .json(&json!({
            "sleep_time": "2024-06-10T23:00:00Z",
            "wake_time": "2024-06-11T06:30:00Z",
            "quality_rating": 5,
            "notes": "Slept well",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["duration_hours"], 7.5);
    assert_eq!(updated["quality_label"], "Excellent");

    let response = ctx
        .patch(&path, &user)
        .json(&json!({ "wake_time": "2024-06-11T07:00:00Z", "quality_rating": null }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let patched: Value = response.json();
    assert_eq!(patched["duration_hours"], 8.0);
    assert!(patched["quality_rating"].is_null());
    assert_eq!(patched["notes"], "Slept well");

    let stored: Value = ctx.get(&path, &user).await.json();
    assert_eq!(stored["duration_hours"], 8.0);
}

#[tokio::test]
async fn test_patch_cannot_break_invariants() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;
    let session = ctx
        .create_session(&user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", None)
        .await;
    let path = format!("/api/sleep-sessions/{}", session["id"].as_str().unwrap());

    let response = ctx
        .patch(&path, &user)
        .json(&json!({ "wake_time": "2024-06-10T21:00:00Z" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let stored: Value = ctx.get(&path, &user).await.json();
    assert_eq!(stored["duration_hours"], 8.0);
}

#[tokio::test]
async fn test_delete_removes_session() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;
    let session = ctx
        .create_session(&user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", None)
        .await;
    let path = format!("/api/sleep-sessions/{}", session["id"].as_str().unwrap());

    let response = ctx.delete(&path, &user).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = ctx.get(&path, &user).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = ctx.delete(&path, &user).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_users_sessions_are_invisible() {
    let ctx = TestContext::new().await;
    let owner = ctx.register("owner").await;
    let intruder = ctx.register("intruder").await;
    let session = ctx
        .create_session(&owner, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", None)
        .await;
    let path = format!("/api/sleep-sessions/{}", session["id"].as_str().unwrap());

    assert_eq!(ctx.get(&path, &intruder).await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        ctx.patch(&path, &intruder)
            .json(&json!({ "notes": "mine now" }))
            .await
            .status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(ctx.delete(&path, &intruder).await.status_code(), StatusCode::NOT_FOUND);

    let list: Value = ctx.get("/api/sleep-sessions", &intruder).await.json();
    assert_eq!(list["count"], 0);

    let stored: Value = ctx.get(&path, &owner).await.json();
    assert_eq!(stored["notes"], "");
}

#[tokio::test]
async fn test_recent_and_today() {
    // Clock is frozen at 2024-06-12 12:00 UTC
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;

    let today = ctx
        .create_session(&user, "2024-06-12T01:00:00Z", "2024-06-12T08:00:00Z", None)
        .await;
    let recent = ctx
        .create_session(&user, "2024-06-08T22:00:00Z", "2024-06-09T06:00:00Z", None)
        .await;
    ctx.create_session(&user, "2024-06-01T22:00:00Z", "2024-06-02T06:00:00Z", None)
        .await;

    let response = ctx.get("/api/sleep-sessions/recent", &user).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let sessions: Vec<Value> = response.json();
    let recent_ids: Vec<&str> = sessions.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(
        recent_ids,
        vec![today["id"].as_str().unwrap(), recent["id"].as_str().unwrap()]
    );

    let sessions: Vec<Value> = ctx.get("/api/sleep-sessions/today", &user).await.json();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], today["id"]);
}

#[tokio::test]
async fn test_sync_to_calendar_requires_connection() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sam").await;
    let session = ctx
        .create_session(&user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", None)
        .await;

    let response = ctx
        .post(
            &format!("/api/sleep-sessions/{}/sync_to_calendar", session["id"].as_str().unwrap()),
            &user,
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Google Calendar not connected");
}
