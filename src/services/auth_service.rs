//! Account registration, login and token verification
//!
//! Passwords are stored as `hex(sha256(salt || password))` with a random
//! 16-byte salt. Tokens are `base64url(user_id:expiry).hex(hmac_sha256)`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::error::{AppError, AppResult};
use crate::models::user::LoginRequest;
use crate::models::{NewUser, User};
use crate::services::time_provider::TimeProvider;

type HmacSha256 = Hmac<Sha256>;

/// Successful login payload
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Random salt, hex encoded
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn username_taken(username: &str) -> AppError {
    AppError::Conflict(format!("A user with username '{}' already exists", username))
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<DatabaseManager>,
    secret: String,
    token_ttl: Duration,
    time_provider: Arc<dyn TimeProvider>,
}

impl AuthService {
    pub fn new(
        db: Arc<DatabaseManager>,
        secret: String,
        token_ttl_seconds: i64,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            db,
            secret,
            token_ttl: Duration::seconds(token_ttl_seconds),
            time_provider,
        }
    }

    /// Create an account and its default profile
    pub async fn register(&self, input: NewUser) -> AppResult<User> {
        input.validate()?;

        if self.db.get_user_by_username(&input.username).await?.is_some() {
            return Err(username_taken(&input.username));
        }

        let salt = generate_salt();
        let now = crate::models::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: input.username,
            email: input.email,
            first_name: input.first_name.unwrap_or_default(),
            password_hash: hash_password(&input.password, &salt),
            salt,
            is_staff: false,
            created_at: now,
            updated_at: now,
        };

        // A concurrent registration may still win the insert
        if !self.db.create_user(&user).await? {
            return Err(username_taken(&user.username));
        }
        self.db.get_or_create_profile(&user.id).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let user = self
            .db
            .get_user_by_username(&request.username)
            .await?
            .ok_or_else(invalid)?;

        if hash_password(&request.password, &user.salt) != user.password_hash {
            tracing::debug!(username = %request.username, "Rejected login");
            return Err(invalid());
        }

        let (token, expires_at) = self.issue_token(&user.id)?;
        Ok(LoginResponse {
            token,
            expires_at,
            user,
        })
    }

    /// Sign a token for `user_id` valid for the configured lifetime
    pub fn issue_token(&self, user_id: &str) -> AppResult<(String, DateTime<Utc>)> {
        let expires_at = self.time_provider.now_utc() + self.token_ttl;
        let payload = URL_SAFE_NO_PAD.encode(format!("{}:{}", user_id, expires_at.timestamp()));
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());

        Ok((format!("{}.{}", payload, signature), expires_at))
    }

    /// Check signature and expiry, returning the user id
    pub fn verify_token(&self, token: &str) -> AppResult<String> {
        let invalid = || AppError::Unauthorized("Invalid or expired token".to_string());

        let (payload, signature) = token.trim().split_once('.').ok_or_else(invalid)?;
        let signature = hex::decode(signature).map_err(|_| invalid())?;
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| invalid())?;

        let decoded = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
        let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
        let (user_id, expiry) = decoded.rsplit_once(':').ok_or_else(invalid)?;
        let expiry: i64 = expiry.parse().map_err(|_| invalid())?;

        if expiry <= self.time_provider.now_utc().timestamp() {
            return Err(invalid());
        }
        Ok(user_id.to_string())
    }

    /// Resolve a token to a stored user
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let user_id = self.verify_token(token)?;
        self.db
            .get_user(&user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))
    }

    fn mac(&self, payload: &str) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid token secret: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}
