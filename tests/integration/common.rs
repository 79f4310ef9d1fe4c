//! Shared setup: an app over an in-memory database, a memory mailer and a
//! frozen clock

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use ambidream::config::{Config, GoogleCalendarConfig};
use ambidream::create_app;
use ambidream::database::DatabaseManager;
use ambidream::integrations::{GoogleCalendarClient, MemoryMailer};
use ambidream::services::MockTimeProvider;
use ambidream::AppState;

pub const PASSWORD: &str = "correct horse battery";

/// Wednesday 2024-06-12 12:00 UTC
pub fn frozen_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap()
}

pub fn token_header() -> HeaderName {
    HeaderName::from_static("x-auth-token")
}

/// A registered account and its token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.token).unwrap()
    }
}

pub struct TestContext {
    pub server: TestServer,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
    pub clock: MockTimeProvider,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_google(GoogleCalendarConfig::default()).await
    }

    /// Calendar client talking to `base_url`, e.g. a wiremock server
    pub async fn with_calendar_server(base_url: &str) -> Self {
        Self::with_google(GoogleCalendarConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            api_base: format!("{}/calendar/v3", base_url),
            token_url: format!("{}/token", base_url),
        })
        .await
    }

    async fn with_google(google: GoogleCalendarConfig) -> Self {
        let config = Config {
            google: google.clone(),
            ..Config::for_test()
        };

        let db = DatabaseManager::new_in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let mailer = Arc::new(MemoryMailer::new());
        let clock = MockTimeProvider::new(frozen_now());
        let calendar = Arc::new(GoogleCalendarClient::new(google).unwrap());

        let state = AppState::new(config, db, mailer.clone(), calendar, Arc::new(clock.clone()));
        let server = TestServer::new(create_app(state.clone())).unwrap();

        Self {
            server,
            state,
            mailer,
            clock,
        }
    }

    /// Register `username` and log in
    pub async fn register(&self, username: &str) -> TestUser {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
                "first_name": "",
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED, "{}", response.text());
        let user: Value = response.json();

        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": PASSWORD }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
        let login: Value = response.json();

        TestUser {
            id: user["id"].as_str().unwrap().to_string(),
            username: username.to_string(),
            token: login["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn register_staff(&self, username: &str) -> TestUser {
        let user = self.register(username).await;
        assert!(self.state.db.set_user_staff(&user.id, true).await.unwrap());
        user
    }

    pub fn get(&self, path: &str, user: &TestUser) -> TestRequest {
        self.server.get(path).add_header(token_header(), user.header_value())
    }

    pub fn post(&self, path: &str, user: &TestUser) -> TestRequest {
        self.server.post(path).add_header(token_header(), user.header_value())
    }

    pub fn put(&self, path: &str, user: &TestUser) -> TestRequest {
        self.server.put(path).add_header(token_header(), user.header_value())
    }

    pub fn patch(&self, path: &str, user: &TestUser) -> TestRequest {
        self.server.patch(path).add_header(token_header(), user.header_value())
    }

    pub fn delete(&self, path: &str, user: &TestUser) -> TestRequest {
        self.server.delete(path).add_header(token_header(), user.header_value())
    }

    /// Create a session through the API and return its JSON
    pub async fn create_session(&self, user: &TestUser, sleep: &str, wake: &str, quality: Option<u8>) -> Value {
        let response = self
            .post("/api/sleep-sessions", user)
            .json(&json!({
                "sleep_time": sleep,
                "wake_time": wake,
                "quality_rating": quality,
                "notes": "",
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED, "{}", response.text());
        response.json()
    }

    /// The caller's profile id
    pub async fn profile_id(&self, user: &TestUser) -> String {
        let profile: Value = self.get("/api/profiles/me", user).await.json();
        profile["id"].as_str().unwrap().to_string()
    }
}
