//! Admin authentication: bcrypt password hashes and HS256 bearer tokens.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{errors::AppError, models::admin::Admin};

/// Token lifetime in seconds.
pub const TOKEN_TTL_SECS: i64 = 3600;

const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    BadCredentials,
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Claims carried by an admin token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminClaims {
    pub email: String,
    #[serde(rename = "adminId")]
    pub admin_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Body of a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub admin_id: Uuid,
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<SqlitePool>,
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(db: Arc<SqlitePool>, secret: &str) -> Self {
        Self {
            db,
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Same service with a different bcrypt work factor.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Create the admin for `email`, or reset its password if it exists.
    pub async fn upsert_admin(&self, email: &str, password: &str) -> AuthResult<Uuid> {
        let hash = hash_password(password, self.hash_cost).await?;
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO admins (id, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET password_hash = excluded.password_hash
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hash)
        .bind(ADMIN_ROLE)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        info!("Admin account ready: {}", email);
        Ok(id)
    }

    /// Check the credentials and issue a token. Unknown email and wrong
    /// password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginResponse> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash, role, created_at FROM admins WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&*self.db)
        .await?;

        let Some(admin) = admin else {
            debug!("login attempt for unknown admin");
            return Err(AuthError::BadCredentials);
        };
        if !verify_password(password, &admin.password_hash).await? {
            debug!("login attempt with wrong password for {}", admin.email);
            return Err(AuthError::BadCredentials);
        }

        let token = self.issue_token(&admin, Utc::now().timestamp())?;
        Ok(LoginResponse {
            token,
            expires_in: TOKEN_TTL_SECS,
            admin_id: admin.id,
        })
    }

    fn issue_token(&self, admin: &Admin, now: i64) -> AuthResult<String> {
        let claims = AdminClaims {
            email: admin.email.clone(),
            admin_id: admin.id,
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Validate signature and expiry.
    pub fn verify_token(&self, token: &str) -> AuthResult<AdminClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<AdminClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

async fn hash_password(password: &str, cost: u32) -> AuthResult<String> {
    let password = password.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

async fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}

/// Rejects the request with 401 unless it carries a valid
/// `Authorization: Bearer <token>` header.
impl<S> FromRequestParts<S> for AdminClaims
where
    AuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthService::from_ref(state);
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        Ok(auth.verify_token(token)?)
    }
}
