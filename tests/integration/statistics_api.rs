//! Statistics listing, summary and recalculation

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{TestContext, TestUser};

/// Monday night 8h rated 4, Tuesday night 7h rated 2
async fn two_nights(ctx: &TestContext, user: &TestUser) {
    ctx.create_session(user, "2024-06-10T22:00:00Z", "2024-06-11T06:00:00Z", Some(4))
        .await;
    ctx.create_session(user, "2024-06-11T23:00:00Z", "2024-06-12T06:00:00Z", Some(2))
        .await;
}

fn by_period<'a>(rows: &'a [Value], period: &str) -> &'a Value {
    rows.iter()
        .find(|row| row["period_type"] == period)
        .unwrap_or_else(|| panic!("no {} row", period))
}

#[tokio::test]
async fn test_summary_without_sessions() {
    let ctx = TestContext::new().await;
    let user = ctx.register("fresh").await;

    let response = ctx.get("/api/statistics/summary", &user).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "No sleep data available");
    assert_eq!(body["sessions_count"], 0);
}

#[tokio::test]
async fn test_summary_covers_last_30_days() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sleeper").await;
    two_nights(&ctx, &user).await;
    // Outside the window
    ctx.create_session(&user, "2024-05-01T22:00:00Z", "2024-05-02T08:00:00Z", Some(5))
        .await;

    let body: Value = ctx.get("/api/statistics/summary", &user).await.json();
    assert_eq!(body["period"], "30_days");
    assert_eq!(body["total_sessions"], 2);
    assert_eq!(body["total_sleep_hours"], 15.0);
    assert_eq!(body["average_sleep_hours"], 7.5);
    assert_eq!(body["average_quality"], 3.0);
    assert_eq!(body["start_date"], "2024-05-13");
    assert_eq!(body["end_date"], "2024-06-12");
}

#[tokio::test]
async fn test_recalculate_stores_each_period() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sleeper").await;
    two_nights(&ctx, &user).await;

    let response = ctx
        .post("/api/statistics/recalculate", &user)
        .json(&json!({ "date": "2024-06-11" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let rows: Vec<Value> = response.json();
    assert_eq!(rows.len(), 3);

    let daily = by_period(&rows, "daily");
    assert_eq!(daily["date"], "2024-06-11");
    assert_eq!(daily["sessions_count"], 1);
    assert_eq!(daily["total_sleep_hours"], 7.0);
    assert_eq!(daily["goal_achievement_rate"], 0.0);

    let weekly = by_period(&rows, "weekly");
    assert_eq!(weekly["date"], "2024-06-10");
    assert_eq!(weekly["sessions_count"], 2);
    assert_eq!(weekly["average_sleep_hours"], 7.5);
    assert_eq!(weekly["average_quality"], 3.0);
    assert_eq!(weekly["goal_achievement_rate"], 50.0);

    let monthly = by_period(&rows, "monthly");
    assert_eq!(monthly["date"], "2024-06-01");
    assert_eq!(monthly["sessions_count"], 2);
}

#[tokio::test]
async fn test_recalculate_is_idempotent_and_defaults_to_yesterday() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sleeper").await;
    two_nights(&ctx, &user).await;

    // No body: yesterday relative to the frozen clock, 2024-06-11
    let first: Vec<Value> = ctx.post("/api/statistics/recalculate", &user).await.json();
    let second: Vec<Value> = ctx.post("/api/statistics/recalculate", &user).await.json();
    assert_eq!(first.len(), 3);
    assert_eq!(by_period(&first, "daily")["date"], "2024-06-11");
    assert_eq!(by_period(&first, "weekly")["id"], by_period(&second, "weekly")["id"]);

    let list: Value = ctx.get("/api/statistics", &user).await.json();
    assert_eq!(list["count"], 3);
}

#[tokio::test]
async fn test_list_filter_and_ownership() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sleeper").await;
    let other = ctx.register("other").await;
    two_nights(&ctx, &user).await;
    ctx.post("/api/statistics/recalculate", &user)
        .json(&json!({ "date": "2024-06-11" }))
        .await;

    let weekly: Value = ctx
        .get("/api/statistics", &user)
        .add_query_param("period_type", "weekly")
        .await
        .json();
    assert_eq!(weekly["count"], 1);
    let id = weekly["results"][0]["id"].as_str().unwrap().to_string();

    let response = ctx.get(&format!("/api/statistics/{}", id), &user).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let row: Value = response.json();
    assert_eq!(row["period_type"], "weekly");

    let response = ctx.get(&format!("/api/statistics/{}", id), &other).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let others: Value = ctx.get("/api/statistics", &other).await.json();
    assert_eq!(others["count"], 0);
}

#[tokio::test]
async fn test_goal_drives_achievement_rate() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sleeper").await;
    two_nights(&ctx, &user).await;

    // Tuesday only; Monday falls back to the 8h profile target
    ctx.post("/api/goals", &user)
        .json(&json!({
            "target_bedtime": "23:00:00",
            "target_wake_time": "06:00:00",
            "target_duration_hours": 7.0,
            "days_of_week": [1],
        }))
        .await;

    let rows: Vec<Value> = ctx
        .post("/api/statistics/recalculate", &user)
        .json(&json!({ "date": "2024-06-11" }))
        .await
        .json();
    assert_eq!(by_period(&rows, "weekly")["goal_achievement_rate"], 100.0);
}

#[tokio::test]
async fn test_recalculate_rejects_malformed_body() {
    let ctx = TestContext::new().await;
    let user = ctx.register("sleeper").await;
    two_nights(&ctx, &user).await;

    let response = ctx
        .post("/api/statistics/recalculate", &user)
        .text("{\"date\": ")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = ctx
        .post("/api/statistics/recalculate", &user)
        .json(&json!({ "date": "last tuesday" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let list: Value = ctx.get("/api/statistics", &user).await.json();
    assert_eq!(list["count"], 0);
}
