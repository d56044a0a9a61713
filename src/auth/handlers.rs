use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::session::{create_session, delete_session, CurrentUser};
use crate::models::{LoginToken, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: Uuid,
}

#[derive(Debug, Serialize)]
struct SessionTokenResponse {
    session_token: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    user_id: Uuid,
    email: String,
    username: Option<String>,
    avatar_url: Option<String>,
}

const LINK_SENT_MESSAGE: &str = "Check your email for a sign-in link";

/// Registers a new account and sends the first sign-in link.
///
/// A bare profile row is created alongside the user so profile reads
/// never have to handle a missing row for a registered account.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email)?;

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation(
            "An account with this email already exists. Sign in instead.".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let user: User = sqlx::query_as("INSERT INTO users (email) VALUES ($1) RETURNING *")
        .bind(&email)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO profiles (user_id, username) VALUES ($1, $2)")
        .bind(user.id)
        .bind(default_username(&email))
        .execute(&mut *tx)
        .await?;

    let token = insert_login_token(&mut tx, user.id, state.config.login_token_ttl_minutes).await?;

    tx.commit().await?;

    state.link_sender.send_login_link(&user.email, token).await?;

    Ok(empty_success(LINK_SENT_MESSAGE))
}

/// Sends a fresh sign-in link to an existing account.
///
/// Responds identically whether or not the email is registered, so the
/// endpoint cannot be used to probe for accounts.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email)?;

    let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;

    if let Some((user_id,)) = user {
        let mut tx = state.pool.begin().await?;
        let token =
            insert_login_token(&mut tx, user_id, state.config.login_token_ttl_minutes).await?;
        tx.commit().await?;

        state.link_sender.send_login_link(&email, token).await?;
    }

    Ok(empty_success(LINK_SENT_MESSAGE))
}

/// Exchanges a sign-in link token for a session.
///
/// The token is consumed with a guarded update so it can be redeemed at
/// most once, even under concurrent requests.
pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let consumed: Option<LoginToken> = sqlx::query_as(
        "UPDATE login_tokens
         SET consumed_at = now()
         WHERE token = $1 AND consumed_at IS NULL AND expires_at > now()
         RETURNING *",
    )
    .bind(payload.token)
    .fetch_optional(&state.pool)
    .await?;

    let token = consumed.ok_or_else(|| {
        AppError::Unauthenticated("Sign-in link is invalid or has expired".to_string())
    })?;

    let session = create_session(&state.pool, token.user_id, state.config.session_ttl_days).await?;

    Ok(success(
        SessionTokenResponse {
            session_token: session.token,
            expires_at: session.expires_at,
        },
        "Signed in successfully",
    ))
}

pub async fn sign_out(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    delete_session(&state.pool, user.session_token).await?;
    Ok(empty_success("Signed out"))
}

/// Snapshot of the caller's account for client-side session checks.
pub async fn session(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let profile: Option<(String, Option<String>)> =
        sqlx::query_as("SELECT username, avatar_url FROM profiles WHERE user_id = $1")
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;

    let (username, avatar_url) = match profile {
        Some((username, avatar_url)) => (Some(username), avatar_url),
        None => (None, None),
    };

    Ok(success(
        SessionResponse {
            user_id: user.user_id,
            email: user.email,
            username,
            avatar_url,
        },
        "Session is active",
    ))
}

async fn insert_login_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    ttl_minutes: i64,
) -> Result<Uuid, AppError> {
    let token = Uuid::new_v4();

    sqlx::query("INSERT INTO login_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id)
        .bind(Utc::now() + Duration::minutes(ttl_minutes))
        .execute(&mut **tx)
        .await?;

    Ok(token)
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();

    let valid = matches!(email.split_once('@'), Some((local, domain))
        if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'));

    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation(
            "A valid email address is required".to_string(),
        ))
    }
}

fn default_username(email: &str) -> String {
    email
        .split_once('@')
        .map(|(local, _)| local.to_string())
        .unwrap_or_else(|| "member".to_string())
}
